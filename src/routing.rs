//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};

use crate::{
    AppState, ErrorDetail, Message,
    budget::{get_budget_summary, get_budget_total, get_sector_budget, get_subsidiary_budget},
    dashboard::get_dashboard_page,
    endpoints,
    transaction::{add_transaction, delete_transaction, get_transactions, update_transaction},
};

/// The greeting served from the root route.
pub(crate) const WELCOME_MESSAGE: &str = "Welcome to the Budget Dashboard API";

/// Return a router with all the app's routes.
///
/// Access checks happen in the handlers' extractors, so every route except
/// the root and the fallback requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    let budget_routes = Router::new()
        .route(endpoints::BUDGET_SUMMARY, get(get_budget_summary))
        .route(endpoints::BUDGET_BY_SUBSIDIARY, get(get_subsidiary_budget))
        .route(endpoints::BUDGET_BY_SECTOR, get(get_sector_budget))
        .route(endpoints::BUDGET_TOTAL, get(get_budget_total))
        .route(endpoints::DASHBOARD, get(get_dashboard_page));

    let transaction_routes = Router::new()
        .route(endpoints::TRANSACTIONS, get(get_transactions))
        .route(endpoints::ADD_TRANSACTION, post(add_transaction))
        .route(endpoints::UPDATE_TRANSACTION, put(update_transaction))
        .route(endpoints::DELETE_TRANSACTION, delete(delete_transaction));

    Router::new()
        .route(endpoints::ROOT, get(get_root))
        .merge(budget_routes)
        .merge(transaction_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_root() -> Json<Message> {
    Message::new(WELCOME_MESSAGE)
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorDetail {
            detail: "Not Found".to_owned(),
        }),
    )
        .into_response()
}
