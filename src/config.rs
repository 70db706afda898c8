//! Start-up configuration shared by the binaries: which store to open and which API tokens to accept.

use std::{
    env,
    path::Path,
    sync::{Arc, Mutex},
};

use clap::ValueEnum;
use rusqlite::Connection;

use crate::{
    ApiTokens, DocumentTransactionStore, Error, SQLiteTransactionStore, TransactionStore,
    initialize_db, stores::JsonFileTree,
};

/// The environment variable holding the API tokens, formatted `role:token[,role:token...]`.
pub const TOKENS_ENV_VAR: &str = "BUDGET_API_TOKENS";

/// The kinds of store the transactions can be kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// A table in a SQLite database file.
    Sqlite,
    /// A collection in a JSON document file.
    Document,
}

/// Open the transaction store of kind `backend` at `path`.
///
/// The SQLite database is created and its table initialized if needed. The
/// document file is created on the first write.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQLite database cannot be opened or initialized.
pub fn open_store(
    backend: StoreBackend,
    path: &Path,
) -> Result<Arc<dyn TransactionStore>, Error> {
    match backend {
        StoreBackend::Sqlite => {
            let connection = Connection::open(path)?;
            initialize_db(&connection)?;
            tracing::info!("Opened SQLite transaction store at {}", path.display());

            Ok(Arc::new(SQLiteTransactionStore::new(Arc::new(Mutex::new(
                connection,
            )))))
        }
        StoreBackend::Document => {
            tracing::info!("Opened document transaction store at {}", path.display());

            Ok(Arc::new(DocumentTransactionStore::new(Arc::new(
                JsonFileTree::new(path),
            ))))
        }
    }
}

/// Read the API tokens from [TOKENS_ENV_VAR].
///
/// # Errors
/// Returns [Error::InvalidConfig] if the variable is unset or malformed.
pub fn load_api_tokens() -> Result<ApiTokens, Error> {
    let text = env::var(TOKENS_ENV_VAR).map_err(|error| {
        Error::InvalidConfig(format!("could not read {TOKENS_ENV_VAR}: {error}"))
    })?;

    ApiTokens::parse(&text)
}
