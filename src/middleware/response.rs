use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope shared by every endpoint:
/// `{ data, errorMessage: null, isSuccess: true }`, plus the optional
/// `total` / `source` / `message` members the report routes carry.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    data: T,
    status_code: StatusCode,
    total: Option<usize>,
    source: Option<&'static str>,
    message: Option<String>,
    no_store: bool,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
            total: None,
            source: None,
            message: None,
            no_store: false,
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            ..Self::success(data)
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_source(mut self, source: &'static str) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Mark the response uncacheable (listing endpoints).
    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }
}

fn envelope(data: Value, total: Option<usize>, source: Option<&'static str>, message: Option<String>) -> Value {
    let mut body = json!({
        "data": data,
        "errorMessage": Value::Null,
        "isSuccess": true,
    });
    if let Some(total) = total {
        body["total"] = total.into();
    }
    if let Some(source) = source {
        body["source"] = source.into();
    }
    if let Some(message) = message {
        body["message"] = message.into();
    }
    body
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "data": Value::Null,
                        "errorMessage": "failed to serialize response data",
                        "isSuccess": false,
                    })),
                )
                    .into_response();
            }
        };

        let body = envelope(data_value, self.total, self.source, self.message);
        let mut response = (self.status_code, Json(body)).into_response();
        if self.no_store {
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        }
        response
    }
}

/// Result alias used by every handler.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_envelope() {
        let body = envelope(json!([1, 2]), None, None, None);
        assert_eq!(body["data"], json!([1, 2]));
        assert_eq!(body["errorMessage"], Value::Null);
        assert_eq!(body["isSuccess"], true);
        assert!(body.get("total").is_none());
        assert!(body.get("source").is_none());
    }

    #[test]
    fn report_envelope_carries_total_and_source() {
        let body = envelope(json!([]), Some(0), Some("pendataan"), None);
        assert_eq!(body["total"], 0);
        assert_eq!(body["source"], "pendataan");
    }

    #[test]
    fn message_member_is_optional() {
        let body = envelope(Value::Null, None, None, Some("user deleted".to_string()));
        assert_eq!(body["message"], "user deleted");
        assert_eq!(body["data"], Value::Null);
    }
}
