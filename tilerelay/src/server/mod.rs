//! HTTP front end.
//!
//! Exposes `GET /{zoom}/{x}/{y}` (the `y` segment may end in `.png`) and
//! renders resolver outcomes:
//!
//! | Outcome                | Response                          |
//! |------------------------|-----------------------------------|
//! | payload                | `200`, `Content-Type: image/png`  |
//! | [`ResolveError`]       | `404`                             |
//! | malformed path segment | `400` with the parse error        |

use std::io;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::TileStore;
use crate::coord::TileKey;
use crate::provider::TileFetcher;
use crate::resolver::{ResolveError, TileResolver};

/// Content type of served tiles.
pub const TILE_CONTENT_TYPE: &str = "image/png";

/// Builds the tile router around `resolver`.
pub fn router<S, F>(resolver: TileResolver<S, F>) -> Router
where
    S: TileStore + 'static,
    F: TileFetcher + 'static,
{
    Router::new()
        .route("/:z/:x/:y", get(tile_handler::<S, F>))
        .with_state(resolver)
}

/// Handles a single tile request.
pub async fn tile_handler<S, F>(
    State(resolver): State<TileResolver<S, F>>,
    Path((z, x, y)): Path<(String, String, String)>,
) -> Response
where
    S: TileStore + 'static,
    F: TileFetcher + 'static,
{
    let key = match TileKey::from_segments(&z, &x, &y) {
        Ok(key) => key,
        Err(e) => {
            debug!(z = %z, x = %x, y = %y, error = %e, "Rejected malformed tile path");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match resolver.resolve(key).await {
        Ok(data) => ([(header::CONTENT_TYPE, TILE_CONTENT_TYPE)], data).into_response(),
        Err(ResolveError::NotFound { key, source }) => {
            debug!(tile = %key, error = %source, "Tile unavailable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Serves `router` on `listener` until `shutdown` is cancelled.
///
/// In-progress requests are allowed to finish after cancellation.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Tile server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!(addr = %addr, "Tile server stopped");
    Ok(())
}
