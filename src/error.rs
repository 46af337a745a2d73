use std::io;

use csv::Error as CsvError;
use http::status::StatusCode;
use reqwest::Error as ReqwestError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::task::JoinError;
use url::ParseError as UrlParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SoulburnError {
    #[error("Baseline dataset error: {0}")]
    Baseline(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Remote communication error: {0}")]
    Remote(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Metadata provider error: {0}")]
    Service(String),
    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

impl SoulburnError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SoulburnError::Baseline(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SoulburnError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SoulburnError::Custom(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SoulburnError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SoulburnError::NotFound(_) => StatusCode::NOT_FOUND,
            SoulburnError::Remote(_) => StatusCode::BAD_GATEWAY,
            SoulburnError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SoulburnError::Service(_) => StatusCode::BAD_GATEWAY,
            SoulburnError::Shape(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// True for failures of the transport itself (network, timeout, non-2xx).
    pub fn is_transport(&self) -> bool {
        matches!(self, SoulburnError::Remote(_))
    }
}

impl From<toml::de::Error> for SoulburnError {
    fn from(src: toml::de::Error) -> SoulburnError {
        SoulburnError::Config(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for SoulburnError {
    fn from(src: JsonError) -> SoulburnError {
        SoulburnError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for SoulburnError {
    fn from(src: UrlParseError) -> SoulburnError {
        SoulburnError::Config(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for SoulburnError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => SoulburnError::NotFound(format!("{x}")),
            _ => SoulburnError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<ReqwestError> for SoulburnError {
    fn from(x: ReqwestError) -> Self {
        // reqwest renders the request URL, which carries the API key as a path segment
        let x = x.without_url();
        if x.is_decode() {
            SoulburnError::Shape(format!("{x}"))
        } else {
            SoulburnError::Remote(format!("{x}"))
        }
    }
}

impl From<CsvError> for SoulburnError {
    fn from(x: CsvError) -> Self {
        if x.is_io_error() {
            match x.into_kind() {
                csv::ErrorKind::Io(io_error) => io_error.into(),
                other => SoulburnError::Baseline(format!("{other:?}")),
            }
        } else {
            SoulburnError::Baseline(format!("CSV parse failed: {x}"))
        }
    }
}

impl From<JoinError> for SoulburnError {
    fn from(x: JoinError) -> Self {
        if x.is_panic() {
            SoulburnError::Custom(format!("task panicked: {x}"))
        } else {
            SoulburnError::Custom(format!("task cancelled: {x}"))
        }
    }
}
