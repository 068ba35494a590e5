//! egui panels for the huddle assistant: chat, history and settings.
//! Panels render from [`state::UiState`] and hand user intent back to the
//! app as return values; they never call the core directly.

pub mod panels;
pub mod state;
pub mod theme;
