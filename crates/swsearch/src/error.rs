//! Application-level error type shared by the CLI binary.

use std::path::PathBuf;

use thiserror::Error;

use crate::client::SearchError;
use crate::config::AppConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ConfigLoad(#[from] AppConfigError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to read input file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("column `{column}` not found in {path}")]
    MissingColumn { column: String, path: PathBuf },
    #[error("no structures found in {path}")]
    EmptyInput { path: PathBuf },
}
