//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use tcm_assistant_core::DialogueController;
use tokio::sync::Mutex;

/// The shared application state, created once at startup and passed to all
/// handlers.
///
/// The process hosts exactly one consultation session; the controller owns it
/// and is single-writer, so handlers serialize on the mutex. The knowledge
/// index inside the controller is read-only and shared.
pub struct AppState {
    pub config: Arc<Config>,
    pub dialogue: Mutex<DialogueController>,
}
