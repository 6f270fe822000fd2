use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Why a URL produced no document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("disallowed by robots policy")]
    Disallowed,
    #[error("request failed: {0}")]
    Request(#[from] wreq::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("non-html content type {0:?}")]
    ContentType(Option<String>),
    #[error("browser configuration: {0}")]
    BrowserConfig(String),
    #[cfg(feature = "browser")]
    #[error("browser session failed: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("could not read page height: {0}")]
    Script(String),
}

/// Why a fetched page yielded no record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no catalog identifier in {url}")]
    MissingIdentifier { url: String },
    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("empty date text")]
    Empty,
    #[error("unknown month {0:?}")]
    Month(String),
    #[error("bad number {0:?}")]
    Number(String),
    #[error("unrecognised date shape {0:?}")]
    Shape(String),
    #[error("date out of range: {0}")]
    Range(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record has no {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    source: anyhow::Error,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, source: anyhow::anyhow!(what.into()) }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, source: err }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::from(anyhow::Error::new(err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::from(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(error = %self.source, "request failed");
        }
        (self.status, Json(json!({ "error": self.source.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
