//! Endpoints that total the budget amounts per subsidiary and sector.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error, TransactionStore,
    access::Viewer,
    aggregate::{GroupTotal, SummaryQuery},
};

/// Totals for every subsidiary and sector pair.
pub async fn get_budget_summary(
    _: Viewer,
    State(store): State<Arc<dyn TransactionStore>>,
) -> Result<Json<Vec<GroupTotal>>, Error> {
    store.summarize(&SummaryQuery::overview()).map(Json)
}

/// Per-sector totals for the subsidiary in the path.
pub async fn get_subsidiary_budget(
    _: Viewer,
    State(store): State<Arc<dyn TransactionStore>>,
    Path(subsidiary): Path<String>,
) -> Result<Json<Vec<GroupTotal>>, Error> {
    store
        .summarize(&SummaryQuery::for_subsidiary(&subsidiary))
        .map(Json)
}

/// Per-subsidiary totals for the sector in the path.
pub async fn get_sector_budget(
    _: Viewer,
    State(store): State<Arc<dyn TransactionStore>>,
    Path(sector): Path<String>,
) -> Result<Json<Vec<GroupTotal>>, Error> {
    store.summarize(&SummaryQuery::for_sector(&sector)).map(Json)
}

/// The totals over every transaction.
pub async fn get_budget_total(
    _: Viewer,
    State(store): State<Arc<dyn TransactionStore>>,
) -> Result<Json<GroupTotal>, Error> {
    let query = SummaryQuery::grand_total();

    store
        .summarize(&query)?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| Error::NotFound(query.not_found_message()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        ErrorDetail,
        aggregate::GroupTotal,
        record::test_records::record,
        test_utils::{ADMIN_TOKEN, GUEST_TOKEN, VIEWER_TOKEN, bearer, get_test_server},
    };

    #[tokio::test]
    async fn summary_sums_each_group() {
        let (server, _) = get_test_server(vec![
            record("T1", "A", "X", 100.0, 40.0, 60.0),
            record("T2", "A", "X", 50.0, 10.0, 40.0),
        ]);

        let response = server
            .get("/budget/summary")
            .add_header("Authorization", bearer(VIEWER_TOKEN))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!([{
            "Subsidiary": "A",
            "Sector": "X",
            "total_allocated": 150.0,
            "total_spent": 50.0,
            "total_remaining": 100.0,
        }]));
    }

    #[tokio::test]
    async fn summary_of_empty_store_is_not_found() {
        let (server, _) = get_test_server(Vec::new());

        let response = server
            .get("/budget/summary")
            .add_header("Authorization", bearer(ADMIN_TOKEN))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<ErrorDetail>().detail,
            "No budget data available"
        );
    }

    #[tokio::test]
    async fn subsidiary_totals_are_grouped_by_sector() {
        let (server, _) = get_test_server(vec![
            record("T1", "A", "X", 100.0, 40.0, 60.0),
            record("T2", "A", "Y", 50.0, 10.0, 40.0),
            record("T3", "B", "X", 20.0, 5.0, 15.0),
        ]);

        let response = server
            .get("/budget/subsidiary/A")
            .add_header("Authorization", bearer(VIEWER_TOKEN))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!([
            { "Sector": "X", "total_allocated": 100.0, "total_spent": 40.0, "total_remaining": 60.0 },
            { "Sector": "Y", "total_allocated": 50.0, "total_spent": 10.0, "total_remaining": 40.0 },
        ]));
    }

    #[tokio::test]
    async fn unknown_subsidiary_is_not_found() {
        let (server, _) = get_test_server(vec![record("T1", "A", "X", 1.0, 0.0, 1.0)]);

        let response = server
            .get("/budget/subsidiary/Z")
            .add_header("Authorization", bearer(VIEWER_TOKEN))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<ErrorDetail>().detail,
            "No budget data found for subsidiary: Z"
        );
    }

    #[tokio::test]
    async fn sector_totals_are_grouped_by_subsidiary() {
        let (server, _) = get_test_server(vec![
            record("T1", "A", "X", 100.0, 40.0, 60.0),
            record("T2", "B", "X", 20.0, 5.0, 15.0),
            record("T3", "A", "X", 10.0, 1.0, 9.0),
        ]);

        let response = server
            .get("/budget/sector/X")
            .add_header("Authorization", bearer(VIEWER_TOKEN))
            .await;

        response.assert_status_ok();
        let mut totals = response.json::<Vec<GroupTotal>>();
        totals.sort_by(|a, b| a.subsidiary.cmp(&b.subsidiary));
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].subsidiary.as_deref(), Some("A"));
        assert_eq!(totals[0].sector, None);
        assert_eq!(totals[0].total_allocated, 110.0);
        assert_eq!(totals[1].subsidiary.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn unknown_sector_is_not_found() {
        let (server, _) = get_test_server(vec![record("T1", "A", "X", 1.0, 0.0, 1.0)]);

        let response = server
            .get("/budget/sector/Q")
            .add_header("Authorization", bearer(VIEWER_TOKEN))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<ErrorDetail>().detail,
            "No budget data found for sector: Q"
        );
    }

    #[tokio::test]
    async fn total_covers_every_transaction() {
        let (server, _) = get_test_server(vec![
            record("T1", "A", "X", 100.0, 40.0, 60.0),
            record("T2", "B", "Y", 20.0, 5.0, 15.0),
        ]);

        let response = server
            .get("/budget/total")
            .add_header("Authorization", bearer(VIEWER_TOKEN))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "total_allocated": 120.0,
            "total_spent": 45.0,
            "total_remaining": 75.0,
        }));
    }

    #[tokio::test]
    async fn unknown_role_cannot_view_summary() {
        let (server, _) = get_test_server(vec![record("T1", "A", "X", 1.0, 0.0, 1.0)]);

        let response = server
            .get("/budget/summary")
            .add_header("Authorization", bearer(GUEST_TOKEN))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json::<ErrorDetail>().detail, "Invalid user role");
    }
}
