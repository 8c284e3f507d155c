//! Response wrappers returned by the gateway.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// Body declared as `application/json`.
    Json(serde_json::Value),
    /// Anything else, as text.
    Text(String),
}

impl ApiResponse {
    /// Decode into `T`. A text body is accepted only when it is itself JSON.
    pub fn into_json<T: DeserializeOwned>(self) -> ApiResult<T> {
        match self {
            ApiResponse::Json(value) => Ok(serde_json::from_value(value)?),
            ApiResponse::Text(text) => {
                let trimmed = text.trim();
                let source = if trimmed.is_empty() { "null" } else { trimmed };
                serde_json::from_str(source)
                    .map_err(|e| ApiError::Parse(format!("expected JSON body: {}", e)))
            }
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Text(_) => None,
        }
    }
}

/// Binary download with its headers.
pub struct Download {
    pub headers: HashMap<String, String>,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// Get the filename from Content-Disposition header.
    pub fn content_disposition_filename(&self) -> Option<String> {
        self.headers
            .get("content-disposition")
            .and_then(|h| parse_content_disposition_filename(h))
    }
}

/// Parse filename from Content-Disposition header value.
/// Parses both `filename="name.pdf"` and `filename*=UTF-8''name.pdf` formats.
pub fn parse_content_disposition_filename(header: &str) -> Option<String> {
    // RFC 5987 form wins when both are present
    if let Some(start) = header.find("filename*=") {
        let rest = &header[start + 10..];
        if let Some(quote_start) = rest.find("''") {
            let encoded = rest[quote_start + 2..].split([';', ' ']).next()?;
            if let Ok(decoded) = urlencoding::decode(encoded) {
                let filename = decoded.trim().to_string();
                if !filename.is_empty() {
                    return Some(filename);
                }
            }
        }
    }

    if let Some(start) = header.find("filename=") {
        let rest = &header[start + 9..];
        let filename = if let Some(quoted) = rest.strip_prefix('"') {
            quoted.split('"').next()
        } else {
            rest.split([';', ' ']).next()
        };

        if let Some(name) = filename {
            let name = name.trim().to_string();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }

    None
}

/// Pull a human message out of an error payload.
/// Understands `{"message": ..}`, `{"detail": ".."}` and `{"error": ..}`.
pub(crate) fn error_message(payload: &ApiResponse) -> Option<String> {
    match payload {
        ApiResponse::Json(value) => ["message", "detail", "error"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(|s| s.to_string()),
        ApiResponse::Text(text) => {
            let text = text.trim();
            (!text.is_empty() && text.len() <= 200).then(|| text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_disposition_quoted() {
        let header = r#"attachment; filename="summary.pdf""#;
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("summary.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_unquoted() {
        let header = "attachment; filename=summary.txt";
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("summary.txt".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_prefers_rfc5987() {
        let header = r#"attachment; filename="fallback.pdf"; filename*=UTF-8''my%20paper.pdf"#;
        assert_eq!(
            parse_content_disposition_filename(header),
            Some("my paper.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_none() {
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }

    #[test]
    fn test_error_message_from_fastapi_detail() {
        let body = ApiResponse::Json(serde_json::json!({"detail": "Document not found"}));
        assert_eq!(error_message(&body).as_deref(), Some("Document not found"));
        assert_eq!(error_message(&ApiResponse::Text(String::new())), None);
    }

    #[test]
    fn test_empty_text_body_decodes_as_unit() {
        assert!(ApiResponse::Text(String::new()).into_json::<()>().is_ok());
    }
}
