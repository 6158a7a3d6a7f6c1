use std::path::PathBuf;

use thiserror::Error;

use crate::machine::ProtocolError;

pub type RunResult<T> = std::result::Result<T, RunError>;

/// Fatal run-level failures. Each one aborts the whole multi-image run;
/// records already flushed to the description file are preserved.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("could not load image {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not scan image directory {path}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write description file {path}")]
    Description {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("window system failure")]
    Window(#[from] eframe::Error),
}
