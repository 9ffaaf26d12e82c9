//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router with the sample routes
//! - Wire up middleware (request ID, request spans, panic recovery)
//! - Serve on a listener until shutdown is signalled

use axum::Router;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::routes;
use crate::lifecycle::{ShutdownSignal, Telemetry};
use crate::logging::ROOT;

/// HTTP server for the sample service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(telemetry: &Telemetry) -> Self {
        Self {
            router: Self::build_router(telemetry),
        }
    }

    /// Layers run outermost first: request ID is assigned, then panics are
    /// caught, then the request span wraps the handler. The span therefore
    /// sees the request ID and observes the panic before it becomes a 500.
    fn build_router(telemetry: &Telemetry) -> Router {
        routes::router(telemetry.logger(ROOT))
            .layer(telemetry.request_span_layer())
            .layer(CatchPanicLayer::new())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
