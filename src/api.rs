//! HTTP update adapter
//!
//! Accepts normalized updates as JSON and exposes stored conversation state.

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::runtime::SharedDispatcher;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<SharedDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: SharedDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}
