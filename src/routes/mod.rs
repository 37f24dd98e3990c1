// routes/mod.rs
// Route handlers and the application router.

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::state::AppState;

pub mod balances;

pub use balances::{balances_details, balances_index};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/balances", get(balances_index))
        .route("/balances/details", get(balances_details))
        .with_state(state)
}
