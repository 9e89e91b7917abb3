//! Scoped UI state for a rendered page.
//!
//! Page-wide toggles (navigation drawer, modal, scroll lock) live in a [`UiStore`]
//! owned by the page being rendered and change only through [`UiEvent`]s. Scroll
//! lock is derived, never set directly. Pages are rendered on the server, so the
//! state travels in the query string: every toggle link points at the state it leads to.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    pub nav_open: bool,
    pub modal_open: bool,
}

impl UiState {
    /// The page must not scroll while an overlay is open.
    pub fn scroll_locked(&self) -> bool {
        self.nav_open || self.modal_open
    }

    /// The state reached from this one by `event`.
    pub fn after(mut self, event: UiEvent) -> UiState {
        match event {
            UiEvent::OpenNav => self.nav_open = true,
            UiEvent::CloseNav => self.nav_open = false,
            UiEvent::ToggleNav => self.nav_open = !self.nav_open,
            // The drawer closes when a modal takes over.
            UiEvent::OpenModal => {
                self.modal_open = true;
                self.nav_open = false;
            }
            UiEvent::CloseModal => self.modal_open = false,
        }
        self
    }

    /// Relative link (query string only) that reloads the current page in this state.
    pub fn href(&self) -> String {
        let mut params = Vec::new();
        if self.nav_open {
            params.push("nav=open");
        }
        if self.modal_open {
            params.push("dialog=open");
        }
        format!("?{}", params.join("&"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    OpenNav,
    CloseNav,
    ToggleNav,
    OpenModal,
    CloseModal,
}

/// UiStore
#[derive(Debug, Default)]
pub struct UiStore {
    state: UiState,
}

impl UiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    /// Applies one transition and returns the new state.
    pub fn dispatch(&mut self, event: UiEvent) -> UiState {
        self.state = self.state.after(event);
        self.state
    }
}

/// UiQuery
///
/// Query string that carries UI toggles on server-rendered pages
/// (`?nav=open`, `?dialog=open`).
#[derive(Debug, Default, Deserialize)]
pub struct UiQuery {
    pub nav: Option<String>,
    pub dialog: Option<String>,
}

impl UiQuery {
    /// Builds the page's store from the query string. The nav is applied first, so
    /// an open dialog wins over an open drawer.
    pub fn into_store(self) -> UiStore {
        let mut store = UiStore::new();
        if self.nav.as_deref() == Some("open") {
            store.dispatch(UiEvent::OpenNav);
        }
        if self.dialog.as_deref() == Some("open") {
            store.dispatch(UiEvent::OpenModal);
        }
        store
    }
}
