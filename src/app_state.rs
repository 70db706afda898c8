//! Implements a struct that holds the state of the REST server.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{AccessControl, TransactionStore};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// Where budget transactions are read from and written to.
    pub transaction_store: Arc<dyn TransactionStore>,

    /// Decides who may call which endpoint.
    pub access: AccessControl,
}

impl AppState {
    /// Create a new [AppState] serving `transaction_store` behind `access`.
    pub fn new(transaction_store: Arc<dyn TransactionStore>, access: AccessControl) -> Self {
        Self {
            transaction_store,
            access,
        }
    }
}

impl FromRef<AppState> for AccessControl {
    fn from_ref(state: &AppState) -> Self {
        state.access.clone()
    }
}

impl FromRef<AppState> for Arc<dyn TransactionStore> {
    fn from_ref(state: &AppState) -> Self {
        state.transaction_store.clone()
    }
}
