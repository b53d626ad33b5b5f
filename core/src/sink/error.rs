use std::path::PathBuf;
use thiserror::Error;

/// Errors writing the overlay text file
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write sink output {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
