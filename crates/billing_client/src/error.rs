use std::fmt;

use billing_core::{ErrorDetails, ErrorResponse, ParseError};
use thiserror::Error;

/// Non-success response from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub status: u16,
    /// Vendor error name, e.g. `VALIDATION_ERROR`.
    pub name: Option<String>,
    pub message: Option<String>,
    pub debug_id: Option<String>,
    pub information_link: Option<String>,
    pub details: Vec<ErrorDetails>,
    /// Raw response body.
    pub body: String,
}

impl ServiceError {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            name: None,
            message: None,
            debug_id: None,
            information_link: None,
            details: Vec::new(),
            body: body.into(),
        }
    }

    /// Builds the error from a raw body, picking up the vendor error fields
    /// when the body is an `ErrorResponse`.
    pub fn from_body(status: u16, body: String, debug_id_header: Option<String>) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(&body).unwrap_or_default();
        Self {
            status,
            name: parsed.name,
            message: parsed.message,
            debug_id: parsed.debug_id.or(debug_id_header),
            information_link: parsed.information_link,
            details: parsed.details,
            body,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        match &self.message {
            Some(message) => write!(f, ": {message}")?,
            None if !self.body.is_empty() => write!(f, ": {}", self.body)?,
            None => {}
        }
        for detail in &self.details {
            write!(
                f,
                " [{}: {}]",
                detail.field.as_deref().unwrap_or("-"),
                detail.issue.as_deref().unwrap_or("-")
            )?;
        }
        if let Some(debug_id) = &self.debug_id {
            write!(f, " (debug_id {debug_id})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

#[derive(Error, Debug)]
pub enum BillingError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Service error: {0}")]
    Service(ServiceError),

    #[error("Resource not found: {resource_id}")]
    NotFound {
        resource_id: String,
        debug_id: Option<String>,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("proxy_auth_required")]
    ProxyAuthRequired,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest_middleware::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Flat classification of [`BillingError`] for callers that only branch on
/// the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Service,
    NotFound,
    Auth,
    Transport,
    Config,
    InvalidRequest,
}

impl BillingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::Parse(_) => ErrorKind::Parse,
            BillingError::Service(_) => ErrorKind::Service,
            BillingError::NotFound { .. } => ErrorKind::NotFound,
            BillingError::Auth(_) | BillingError::ProxyAuthRequired => ErrorKind::Auth,
            BillingError::Http(_) | BillingError::Transport(_) => ErrorKind::Transport,
            BillingError::Config(_) => ErrorKind::Config,
            BillingError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            BillingError::Service(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_reads_vendor_body() {
        let body = r#"{"name":"VALIDATION_ERROR","message":"Invalid request","debug_id":"abc123","details":[{"field":"path","issue":"Invalid path provided."}]}"#;
        let err = ServiceError::from_body(400, body.to_string(), Some("header-id".into()));

        assert_eq!(err.status, 400);
        assert_eq!(err.name.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(err.debug_id.as_deref(), Some("abc123"));
        assert_eq!(
            err.to_string(),
            "HTTP 400 VALIDATION_ERROR: Invalid request [path: Invalid path provided.] (debug_id abc123)"
        );
    }

    #[test]
    fn service_error_keeps_non_json_body() {
        let err = ServiceError::from_body(502, "Bad Gateway".to_string(), Some("dbg".into()));
        assert!(err.name.is_none());
        assert_eq!(err.debug_id.as_deref(), Some("dbg"));
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway (debug_id dbg)");
    }

    #[test]
    fn kinds() {
        let not_found = BillingError::NotFound {
            resource_id: "P-1".into(),
            debug_id: None,
        };
        assert!(not_found.is_not_found());
        assert_eq!(not_found.to_string(), "Resource not found: P-1");

        let service = BillingError::Service(ServiceError::new(500, ""));
        assert_eq!(service.kind(), ErrorKind::Service);
        assert!(service.service_error().is_some());
        assert_eq!(BillingError::ProxyAuthRequired.kind(), ErrorKind::Auth);
    }
}
