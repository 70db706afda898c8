//! A budget tracking API.
//!
//! Budget transactions (allocated, spent and remaining amounts tagged by
//! subsidiary, sector and user) are stored in either a SQLite table or a JSON
//! document tree. This library serves a JSON API for creating, listing,
//! updating and deleting transactions, summary endpoints that total the
//! amounts per subsidiary and sector, and a read-only dashboard page.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::{Deserialize, Serialize};
use tokio::signal;

pub mod access;
pub mod aggregate;
mod app_state;
mod budget;
pub mod config;
pub mod csv_import;
mod dashboard;
pub mod endpoints;
mod logging;
pub mod record;
mod routing;
pub mod stores;
#[cfg(test)]
mod test_utils;
mod transaction;

pub use access::{AccessControl, ApiTokens, Capabilities, RolePolicy};
pub use app_state::AppState;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use record::{TransactionRecord, TransactionUpdate};
pub use routing::build_router;
pub use stores::{
    DocumentTransactionStore, SQLiteTransactionStore, TransactionStore, initialize_db,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry a bearer token, or the token is not one of
    /// the configured API tokens.
    #[error("missing or invalid API token")]
    Unauthenticated,

    /// The role claimed by the caller is not in the role policy.
    #[error("invalid user role \"{0}\"")]
    InvalidRole(String),

    /// The caller's role does not grant the capability the endpoint needs.
    #[error("permission denied")]
    PermissionDenied,

    /// A query, filter, update or delete matched no records.
    ///
    /// The string is the message shown to the client, e.g. "Transaction T1 not found".
    #[error("{0}")]
    NotFound(String),

    /// The request body is not valid JSON or does not have the expected fields.
    ///
    /// Holds the status code to reply with and a description of the problem.
    #[error("{1}")]
    InvalidBody(StatusCode, String),

    /// An update request did not supply any field to change.
    #[error("no fields provided for update")]
    NoFieldsToUpdate,

    /// The CSV had issues that prevented it from being parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// A configuration value (e.g. the API token list) is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The document tree could not be read, written or decoded.
    ///
    /// The string describes the underlying IO or JSON error and should only be
    /// logged on the server.
    #[error("document store error: {0}")]
    DocumentStoreError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::SqlError(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::DocumentStoreError(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::DocumentStoreError(value.to_string())
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidBody(rejection.status(), rejection.body_text())
    }
}

/// A JSON request body. Unlike [Json], a body that cannot be decoded is
/// answered with an [ErrorDetail].
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub(crate) struct JsonBody<T>(pub(crate) T);

/// The JSON body sent with every error response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// A message describing what went wrong.
    pub detail: String,
}

/// The JSON body sent when a write succeeds.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// A short description of what was done.
    pub message: String,
}

impl Message {
    pub(crate) fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

fn error_response(status_code: StatusCode, detail: impl Into<String>) -> Response {
    (
        status_code,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Unauthenticated => {
                error_response(StatusCode::UNAUTHORIZED, "Missing or invalid API token")
            }
            Error::InvalidRole(_) => error_response(StatusCode::FORBIDDEN, "Invalid user role"),
            Error::PermissionDenied => error_response(StatusCode::FORBIDDEN, "Permission denied"),
            Error::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            Error::InvalidBody(status_code, message) => error_response(status_code, message),
            Error::NoFieldsToUpdate => {
                error_response(StatusCode::BAD_REQUEST, "No fields provided for update")
            }
            Error::InvalidCSV(_) | Error::InvalidConfig(_) => {
                error_response(StatusCode::BAD_REQUEST, self.to_string())
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
