#![allow(missing_docs)]

use std::sync::Arc;

use axum_test::TestServer;
use scraper::Html;

use crate::{
    AccessControl, ApiTokens, AppState, RolePolicy, TransactionRecord, TransactionStore,
    build_router,
    stores::{DocumentTransactionStore, InMemoryTree},
};

pub(crate) const ADMIN_TOKEN: &str = "admin-token";
pub(crate) const VIEWER_TOKEN: &str = "viewer-token";
/// A token issued for a role the standard policy does not know.
pub(crate) const GUEST_TOKEN: &str = "guest-token";

pub(crate) fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub(crate) fn test_access_control() -> AccessControl {
    AccessControl::new(
        RolePolicy::standard(),
        ApiTokens::new([
            ("admin", ADMIN_TOKEN),
            ("viewer", VIEWER_TOKEN),
            ("guest", GUEST_TOKEN),
        ]),
    )
}

/// Serve the full router over an in-memory document store seeded with `records`.
pub(crate) fn get_test_server(
    records: Vec<TransactionRecord>,
) -> (TestServer, Arc<dyn TransactionStore>) {
    let store: Arc<dyn TransactionStore> = Arc::new(DocumentTransactionStore::new(Arc::new(
        InMemoryTree::default(),
    )));

    if !records.is_empty() {
        store
            .insert_many(records)
            .expect("Could not insert test records");
    }

    let state = AppState::new(store.clone(), test_access_control());
    let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

    (server, store)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}
