//! Endpoints for listing, adding, updating and deleting transactions.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error, JsonBody, Message, TransactionRecord, TransactionStore, TransactionUpdate,
    access::{Editor, Viewer},
};

/// List every stored transaction.
pub async fn get_transactions(
    _: Viewer,
    State(store): State<Arc<dyn TransactionStore>>,
) -> Result<Json<Vec<TransactionRecord>>, Error> {
    store.scan_all().map(Json)
}

/// Store the transaction in the request body.
pub async fn add_transaction(
    Editor(caller): Editor,
    State(store): State<Arc<dyn TransactionStore>>,
    JsonBody(record): JsonBody<TransactionRecord>,
) -> Result<Json<Message>, Error> {
    let transaction_id = record.transaction_id.clone();
    store.insert(record)?;

    tracing::info!("{} added transaction {transaction_id}", caller.role);

    Ok(Message::new("Transaction added successfully"))
}

/// Change the fields supplied in the request body of the transactions with the ID in the path.
pub async fn update_transaction(
    Editor(caller): Editor,
    State(store): State<Arc<dyn TransactionStore>>,
    Path(transaction_id): Path<String>,
    JsonBody(update): JsonBody<TransactionUpdate>,
) -> Result<Json<Message>, Error> {
    let updated = store.update(&transaction_id, &update)?;

    tracing::info!(
        "{} updated {updated} record(s) for transaction {transaction_id}",
        caller.role
    );

    Ok(Message::new(format!(
        "Transaction {transaction_id} updated successfully"
    )))
}

/// Delete the transactions with the ID in the path.
pub async fn delete_transaction(
    Editor(caller): Editor,
    State(store): State<Arc<dyn TransactionStore>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Message>, Error> {
    let deleted = store.delete(&transaction_id)?;

    tracing::info!(
        "{} deleted {deleted} record(s) for transaction {transaction_id}",
        caller.role
    );

    Ok(Message::new(format!(
        "Transaction {transaction_id} deleted successfully"
    )))
}
