// response.rs
// JSON envelope `{statusCode, data, message}` shared with API consumers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: 201,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            data: None,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_camel_case_keys() {
        let body = ApiResponse::ok(vec!["a"], "Customers fetched");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "statusCode": 200, "data": ["a"], "message": "Customers fetched" })
        );
    }

    #[test]
    fn error_envelope_has_null_data() {
        let body: ApiResponse<()> = ApiResponse::error(404, "Customer not found");
        assert!(!body.is_success());
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["data"], serde_json::Value::Null);

        let parsed: ApiResponse<()> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, body);
    }
}
