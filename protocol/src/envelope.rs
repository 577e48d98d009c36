use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Envelope codes that count as success.
pub const SUCCESS_CODES: [i64; 3] = [200, 201, 204];

/// Envelope code that means the session cookie is no longer valid.
pub const LOGIN_EXPIRED_CODE: i64 = 401;

/// `{ code, message, result }` wrapper around every JSON REST response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T = JsonValue> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.code)
    }

    /// Text shown to the user for a failed call: `"{code}"` or
    /// `"{code}: {message}"`.
    pub fn error_summary(&self) -> String {
        if self.message.is_empty() {
            self.code.to_string()
        } else {
            format!("{}: {}", self.code, self.message)
        }
    }
}
