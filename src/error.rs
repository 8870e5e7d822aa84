//! Error types for the Dodgers data pipelines

use thiserror::Error;

#[cfg(test)]
mod tests;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to parse number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("HTML structure error: {message}")]
    Html { message: String },

    #[error("{source_name}: expected field '{field}' is missing")]
    MissingField { source_name: String, field: String },

    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Object store error for '{key}': {message}")]
    Store { key: String, message: String },

    #[error("{source_name} returned no data")]
    NoData { source_name: String },

    #[error("Environment variable {var} is not set")]
    MissingEnv { var: String },

    #[error("Post failed: {message}")]
    Post { message: String },

    #[error("Run ledger error: {message}")]
    Ledger { message: String },
}

impl From<anyhow::Error> for DataError {
    fn from(err: anyhow::Error) -> Self {
        DataError::Ledger {
            message: format!("{:#}", err),
        }
    }
}

impl DataError {
    pub fn html(message: impl Into<String>) -> Self {
        DataError::Html {
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        DataError::Schema {
            message: message.into(),
        }
    }

    pub fn no_data(source_name: impl Into<String>) -> Self {
        DataError::NoData {
            source_name: source_name.into(),
        }
    }

    pub fn missing_field(source_name: impl Into<String>, field: impl Into<String>) -> Self {
        DataError::MissingField {
            source_name: source_name.into(),
            field: field.into(),
        }
    }
}
