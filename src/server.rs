//! HTTP front end: the import event stream plus the static pages.

use crate::config::ImporterConfig;
use crate::error::Result;
use crate::importer::Importer;
use crate::progress::{self, ProgressEvent};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::{Stream, StreamExt};
use log::info;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

#[derive(Clone)]
struct AppState {
    importer: Importer,
    retry: Duration,
}

#[derive(Debug, Deserialize)]
pub struct ImportParams {
    /// Importer selector, e.g. `ica`
    pub api: String,
    /// Recipe URL or id understood by that importer
    pub recipe: String,
}

/// Builds the application router.
pub fn router(importer: Importer) -> Router {
    let config = importer.config().server.clone();
    let state = AppState {
        importer,
        retry: Duration::from_millis(config.retry_ms),
    };

    Router::new()
        .route("/api", get(import_recipe))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .fallback_service(ServeDir::new(&config.frontend_dir))
        .with_state(state)
}

/// Binds the configured address and serves until the process is stopped.
pub async fn serve(config: ImporterConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.server.static_dir).await?;
    let listener = TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    let app = router(Importer::new(config)?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Starts the import in a background task and streams its progress.
///
/// Each line becomes an event with an increasing id and a retry hint; the
/// stream ends with a `done` event. A client that disconnects cancels the
/// import at its next step.
async fn import_recipe(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (sink, progress) = progress::channel();
    let importer = state.importer.clone();

    tokio::spawn(async move {
        // Failures have already been reported through the sink
        let _ = importer.run(&params.api, &params.recipe, &sink).await;
        sink.done();
    });

    let retry = state.retry;
    let events = progress
        .into_stream()
        .enumerate()
        .map(move |(index, event)| Ok(to_sse_event(index + 1, event, retry)));

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse_event(id: usize, event: ProgressEvent, retry: Duration) -> Event {
    let event_builder = Event::default().id(id.to_string());
    match event {
        // Carriage returns would corrupt the event framing
        ProgressEvent::Message(line) => event_builder.retry(retry).data(line.replace('\r', "")),
        ProgressEvent::Done => event_builder.event("done").data("Finished"),
    }
}
