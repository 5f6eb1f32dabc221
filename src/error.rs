use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BookgrabError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing environment variable {0}")]
    MissingEnv(String),

    #[error("invalid {name} URL: {message}")]
    InvalidUrl { name: &'static str, message: String },

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("mirror request failed: {0}")]
    MirrorHttp(String),

    #[error("mirror returned status {status}: {message}")]
    MirrorStatus { status: u16, message: String },

    #[error("no download link found for catalog id {0}")]
    DownloadLinkNotFound(String),

    #[error("download worker vanished before reporting a result")]
    DownloadAborted,

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
