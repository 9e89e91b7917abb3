use club_portal::{
    AppConfig, SupabaseIdentity,
    error::IdentityError,
    identity::IdentityService,
    models::Session,
};
use httpmock::prelude::*;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use uuid::Uuid;

const SECRET: &str = "identity-client-test-secret";
const ANON_KEY: &str = "anon-test-key";

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: String,
    exp: i64,
    aud: &'a str,
}

fn config(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.base_url(),
        supabase_anon_key: ANON_KEY.to_string(),
        jwt_secret: SECRET.to_string(),
        ..AppConfig::default()
    }
}

fn token(sub: Uuid, exp_offset: i64, aud: &str, secret: &str) -> String {
    let claims = TestClaims {
        sub: sub.to_string(),
        exp: chrono::Utc::now().timestamp() + exp_offset,
        aud,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn session(access_token: &str) -> Session {
    Session {
        access_token: access_token.to_string(),
        user_id: Uuid::from_u128(7),
        expires_at: chrono::Utc::now().timestamp() + 3600,
    }
}

fn user_json(administrator: Option<bool>) -> String {
    let app_metadata = match administrator {
        Some(flag) => format!(r#","app_metadata":{{"provider":"email","administrator":{flag}}}"#),
        None => String::new(),
    };
    format!(
        r#"{{"id":"00000000-0000-0000-0000-000000000007","email":"handler@club.test"{app_metadata}}}"#
    )
}

// --- Session validation (local, no network) ---

#[tokio::test]
async fn test_valid_token_yields_session() {
    let server = MockServer::start_async().await;
    let identity = SupabaseIdentity::new(&config(&server));
    let user_id = Uuid::new_v4();
    let jwt = token(user_id, 3600, "authenticated", SECRET);

    let session = identity.get_session(Some(&jwt)).await.unwrap().unwrap();

    assert_eq!(session.user_id, user_id);
    assert_eq!(session.access_token, jwt);
}

#[tokio::test]
async fn test_unusable_tokens_yield_no_session() {
    let server = MockServer::start_async().await;
    let identity = SupabaseIdentity::new(&config(&server));
    let user_id = Uuid::new_v4();

    let expired = token(user_id, -3600, "authenticated", SECRET);
    let wrong_audience = token(user_id, 3600, "anon", SECRET);
    let forged = token(user_id, 3600, "authenticated", "someone-else");

    for candidate in [Some(expired.as_str()), Some(wrong_audience.as_str()), Some(forged.as_str()), Some("not-a-jwt"), None] {
        assert!(identity.get_session(candidate).await.unwrap().is_none());
    }
}

// --- User lookup ---

#[tokio::test]
async fn test_get_user_reads_administrator_from_app_metadata() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("apikey", ANON_KEY)
                .header("authorization", "Bearer admin-jwt");
            then.status(200)
                .header("content-type", "application/json")
                .body(user_json(Some(true)));
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    let principal = identity.get_user(&session("admin-jwt")).await.unwrap().unwrap();

    mock.assert_async().await;
    assert_eq!(principal.id, Uuid::from_u128(7));
    assert_eq!(principal.email, "handler@club.test");
    assert!(principal.claims.administrator);
}

#[tokio::test]
async fn test_missing_claim_means_not_administrator() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(200)
                .header("content-type", "application/json")
                .body(user_json(None));
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    let principal = identity.get_user(&session("member-jwt")).await.unwrap().unwrap();

    assert!(!principal.claims.administrator);
}

#[tokio::test]
async fn test_get_user_status_mapping() {
    for (status, check) in [
        (404, "none"),
        (401, "unauthorized"),
        (503, "transient"),
    ] {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/user");
                then.status(status);
            })
            .await;
        let identity = SupabaseIdentity::new(&config(&server));

        let result = identity.get_user(&session("jwt")).await;
        match check {
            "none" => assert!(matches!(result, Ok(None))),
            "unauthorized" => assert!(matches!(result, Err(IdentityError::Unauthorized))),
            _ => assert!(result.unwrap_err().is_transient()),
        }
    }
}

#[tokio::test]
async fn test_unreachable_service_is_transient() {
    let identity = SupabaseIdentity::new(&AppConfig {
        supabase_url: "http://127.0.0.1:1".to_string(),
        ..AppConfig::default()
    });

    let err = identity.get_user(&session("jwt")).await.unwrap_err();

    assert!(err.is_transient());
}

// --- Account operations ---

#[tokio::test]
async fn test_sign_in_returns_grant_with_principal() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", ANON_KEY);
            then.status(200)
                .header("content-type", "application/json")
                .body(format!(
                    r#"{{"access_token":"fresh-jwt","token_type":"bearer","expires_in":3600,"refresh_token":"r","user":{}}}"#,
                    user_json(Some(true))
                ));
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    let grant = identity.sign_in("handler@club.test", "malinois").await.unwrap();

    mock.assert_async().await;
    assert_eq!(grant.session.access_token, "fresh-jwt");
    assert_eq!(grant.expires_in, 3600);
    assert_eq!(grant.session.user_id, grant.principal.id);
    assert!(grant.principal.claims.administrator);
}

#[tokio::test]
async fn test_sign_in_with_bad_credentials_is_unauthorized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#);
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    let err = identity.sign_in("handler@club.test", "wrong").await.unwrap_err();

    assert!(matches!(err, IdentityError::Unauthorized));
}

#[tokio::test]
async fn test_sign_up_accepts_both_response_shapes() {
    let bare = user_json(None);
    let with_session = format!(r#"{{"access_token":"jwt","expires_in":3600,"user":{}}}"#, user_json(None));

    for body in [bare, with_session] {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/v1/signup");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(body.clone());
            })
            .await;
        let identity = SupabaseIdentity::new(&config(&server));

        let principal = identity.sign_up("handler@club.test", "malinois").await.unwrap();
        assert_eq!(principal.email, "handler@club.test");
    }
}

#[tokio::test]
async fn test_sign_up_rejection_maps_to_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/auth/v1/signup");
            then.status(422)
                .header("content-type", "application/json")
                .body(r#"{"msg":"User already registered"}"#);
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    let err = identity.sign_up("handler@club.test", "malinois").await.unwrap_err();

    assert!(matches!(err, IdentityError::Rejected(_)));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_passes_redirect() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/recover")
                .query_param("redirect_to", "https://club.test/reset-password");
            then.status(200).header("content-type", "application/json").body("{}");
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    identity
        .send_password_reset("handler@club.test", "https://club.test/reset-password")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_update_password_and_sign_out_send_bearer() {
    let server = MockServer::start_async().await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/auth/v1/user")
                .header("authorization", "Bearer member-jwt");
            then.status(200)
                .header("content-type", "application/json")
                .body(user_json(None));
        })
        .await;
    let logout = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/auth/v1/logout")
                .header("authorization", "Bearer member-jwt");
            then.status(204);
        })
        .await;
    let identity = SupabaseIdentity::new(&config(&server));

    identity.update_password(&session("member-jwt"), "new-secret").await.unwrap();
    identity.sign_out(&session("member-jwt")).await.unwrap();

    update.assert_async().await;
    logout.assert_calls_async(1).await;
}
