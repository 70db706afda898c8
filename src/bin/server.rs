use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, process::exit, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use budget_api::{
    AccessControl, AppState, RolePolicy, build_router,
    config::{StoreBackend, load_api_tokens, open_store},
    graceful_shutdown, logging_middleware,
};

/// The REST API server for the budget dashboard.
///
/// API tokens are read from the `BUDGET_API_TOKENS` environment variable,
/// formatted `role:token[,role:token...]`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The kind of store the transactions are kept in.
    #[arg(long, value_enum, default_value_t = StoreBackend::Sqlite)]
    backend: StoreBackend,

    /// File path to the SQLite database or JSON document file.
    #[arg(long)]
    store_path: PathBuf,

    /// The port to serve the API from.
    #[arg(short, long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let tokens = match load_api_tokens() {
        Ok(tokens) => tokens,
        Err(error) => {
            tracing::error!("Could not load API tokens: {error}");
            exit(1);
        }
    };
    tracing::info!("Loaded {} API token(s)", tokens.len());

    let store = match open_store(args.backend, &args.store_path) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!("Could not open transaction store: {error}");
            exit(1);
        }
    };

    let state = AppState::new(store, AccessControl::new(RolePolicy::standard(), tokens));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server stopped with an error: {error}");
        exit(1);
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are logged where they are turned into responses.
        .on_failure(());

    router.layer(tracing_layer)
}
