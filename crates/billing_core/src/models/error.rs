//! Error body returned by the service on rejected requests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonResource;

    #[test]
    fn validation_error_body() {
        let body = r#"{
            "name": "VALIDATION_ERROR",
            "message": "Invalid request - see details",
            "debug_id": "2d1d1d1d1d1d1",
            "information_link": "https://developer.paypal.com/docs/api/#VALIDATION_ERROR",
            "details": [{"field": "path", "issue": "Invalid path provided."}]
        }"#;
        let error = ErrorResponse::from_json(body).unwrap();
        assert_eq!(error.name.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(error.details.len(), 1);
        assert_eq!(error.details[0].field.as_deref(), Some("path"));
    }
}
