use axum::http::StatusCode;
use std::fmt;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Startup failures while reading and normalizing dataset files.
#[derive(Debug)]
pub enum DatasetError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: serde_json::Error },
    Shape { path: String, message: String },
    MissingColumn { dataset: String, column: String },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetError::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            DatasetError::Parse { path, source } => write!(f, "failed to parse {path}: {source}"),
            DatasetError::Shape { path, message } => write!(f, "unexpected shape in {path}: {message}"),
            DatasetError::MissingColumn { dataset, column } => {
                write!(f, "dataset {dataset} has no column '{column}'")
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io { source, .. } => Some(source),
            DatasetError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failures inside one reduction cycle. These are logged and the previous
/// output is kept; they never reach the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ReduceError {
    MalformedRange(&'static str),
    MalformedDate(String),
    MalformedTier(String),
    EmptyView,
    Unsupported(&'static str),
}

impl fmt::Display for ReduceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReduceError::MalformedRange(which) => write!(f, "{which} must have exactly two bounds"),
            ReduceError::MalformedDate(value) => write!(f, "invalid date bound '{value}'"),
            ReduceError::MalformedTier(value) => write!(f, "invalid tier '{value}'"),
            ReduceError::EmptyView => write!(f, "filters exclude every row"),
            ReduceError::Unsupported(event) => write!(f, "{event} is not available in this dashboard"),
        }
    }
}

impl std::error::Error for ReduceError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    UnknownVariant(String),
    NoDatasets,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownVariant(value) => {
                write!(f, "DASHBOARD_VARIANT must be 'matches' or 'investments', got '{value}'")
            }
            ConfigError::NoDatasets => write!(f, "APP_DATASET_PATHS names no dataset files"),
        }
    }
}

impl std::error::Error for ConfigError {}
