//! Error types and handling module.
//!
//! Defines all application-specific error types and conversions.

use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream API answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Malformed input date.
    #[error("Invalid date format '{0}'. Please use YYYY-MM-DD (e.g., 2023-12-31).")]
    InvalidDate(String),

    /// A source returned no value for the requested metric or date.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Warehouse query failure.
    #[error("Query error: {0}")]
    Query(String),

    /// Spreadsheet service failure.
    #[error("Sheet error: {0}")]
    Sheet(String),

    /// Credential or token exchange failure.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Local file errors (query catalogs, credentials).
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    /// Wrap a failed read of `path`.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        AppError::Io { path: path.display().to_string(), source }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Parse(err.to_string());
        }
        match err.status() {
            Some(status) => AppError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => AppError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(err: std::num::ParseFloatError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::Auth(err.to_string())
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidDate(_) | AppError::Parse(_) | AppError::MissingData(_) => {
                McpError::invalid_params(err.to_string(), None)
            }
            AppError::Config(_) | AppError::Io { .. } => {
                McpError::invalid_request(err.to_string(), None)
            }
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_app_error_config_display() {
        let err = AppError::Config("DB_HOST environment variable not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: DB_HOST environment variable not set");
    }

    #[test]
    fn test_app_error_invalid_date_display() {
        let err = AppError::InvalidDate("2024/01/31".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid date format '2024/01/31'. Please use YYYY-MM-DD (e.g., 2023-12-31)."
        );
    }

    #[test]
    fn test_app_error_http_display() {
        let err = AppError::Http { status: 429, url: "https://api.llama.fi/protocol/lofty".into() };
        assert_eq!(err.to_string(), "HTTP 429 from https://api.llama.fi/protocol/lofty");
    }

    #[test]
    fn test_app_error_missing_data_display() {
        let err = AppError::MissingData("tvl_usd on 2024-01-31".to_string());
        assert_eq!(err.to_string(), "Missing data: tvl_usd on 2024-01-31");
    }

    #[test]
    fn test_app_error_to_mcp_error_invalid_params() {
        let err = AppError::InvalidDate("bad".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);

        let err = AppError::MissingData("nodes".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);

        let err = AppError::Parse("not a number".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_app_error_to_mcp_error_invalid_request() {
        let err = AppError::Config("config error".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn test_app_error_io_display_and_code() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err = AppError::io(std::path::Path::new("docs/kpis/queries.yaml"), source);
        assert_eq!(err.to_string(), "Cannot read docs/kpis/queries.yaml: not found");

        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn test_app_error_to_mcp_error_internal_error() {
        let err = AppError::Transport("connection reset".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INTERNAL_ERROR);

        let err = AppError::Query("syntax error".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INTERNAL_ERROR);

        let err = AppError::Sheet("sheet exists".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn test_from_parse_float_error() {
        let parse_result: std::result::Result<f64, _> = "n/a".parse();
        let app_err: AppError = parse_result.unwrap_err().into();
        assert!(matches!(app_err, AppError::Parse(_)));
    }

    #[test]
    fn test_mcp_error_message_preserved() {
        let err = AppError::Transport("Connection refused".to_string());
        let mcp_err: McpError = err.into();
        assert!(mcp_err.message.contains("Connection refused"));
        assert!(mcp_err.data.is_none());
    }
}
