use crate::client::{SurfaceError, ViewerError};
use crate::transport::TransportError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Viewer(#[from] ViewerError),
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(String),
    #[error("failed to write snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SurfaceError,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
