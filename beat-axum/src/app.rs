use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::routes;
use crate::BeatState;

/// Prefix every beat route is mounted under.
pub const BEAT_PATH: &str = "/v1/beat";

#[derive(Clone)]
pub struct BeatApp {
    pub state: BeatState,
    pub router: Router<()>,
}

impl BeatApp {
    pub fn new(state: BeatState) -> Self {
        let router = Router::new().nest(BEAT_PATH, routes::beat_router(state.clone()));
        Self {
            state,
            router: with_http_layers(router),
        }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Request ids go in before tracing so the span can record them, and are
/// copied onto the response on the way out.
fn with_http_layers(router: Router<()>) -> Router<()> {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id()),
    )
}

pub fn beat_app(state: BeatState) -> BeatApp {
    BeatApp::new(state)
}
