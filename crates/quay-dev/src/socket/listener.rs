use std::future::Future;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::DevService;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until `shutdown` resolves.
///
/// Each connection is served on its own task with HTTP/1 upgrades enabled.
/// When the service fails (a [`RouteMiss`](crate::error::RouteMiss)), hyper
/// drops the connection without answering.
pub async fn serve<F>(listener: TcpListener, service: DevService, shutdown: F)
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        debug!(peer = %peer, "connection accepted");
        let service = service.clone();

        tokio::spawn(async move {
            let connection = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .with_upgrades();

            if let Err(err) = connection.await {
                debug!(peer = %peer, error = %err, "connection closed");
            }
        });
    }

    info!("dev server stopped accepting connections");
}
