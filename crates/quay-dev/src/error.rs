//! Error types for the dev server.

use std::io;

use quay_bundler::BuildError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DevServerError>;

#[derive(Debug, Error)]
pub enum DevServerError {
    /// A dev-server hook failed or the session was aborted.
    #[error(transparent)]
    Session(#[from] BuildError),

    #[error("failed to bind dev server to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("dev server stopped before it was ready")]
    NotReady,
}

/// An upgrade request for a path no socket server owns.
///
/// Returned to hyper as the service error, which drops the connection
/// without writing a response.
#[derive(Debug, Error)]
#[error("no socket server registered at {path}")]
pub struct RouteMiss {
    pub path: String,
}
