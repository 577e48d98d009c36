use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::message::ChatSource;

/// Row of the conversation list (`GET /conv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSchema {
    #[serde(default = "unsaved_id")]
    pub id: i64,
    pub source: ChatSource,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default = "default_true")]
    pub is_valid: bool,
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub update_time: Option<DateTime<Utc>>,
}

fn unsaved_id() -> i64 {
    -1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRead {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_active_time: Option<DateTime<Utc>>,
    /// Per-source quota and model settings; shape is owned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<JsonValue>,
}

/// Body of `/auth/register` and `/auth/adminregister`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
}

/// `GET /status/common`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonStatus {
    #[serde(default)]
    pub active_user_in_5m: Option<u64>,
    #[serde(default)]
    pub active_user_in_1h: Option<u64>,
    #[serde(default)]
    pub active_user_in_1d: Option<u64>,
    #[serde(default)]
    pub is_chatbot_busy: Option<bool>,
    #[serde(default)]
    pub chatbot_waiting_count: Option<u64>,
}

/// File record returned after an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFileInfo {
    pub id: String,
    pub original_filename: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "crate::timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub upload_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uploader_id: Option<i64>,
    /// Id assigned by the third-party blob store, once the upload completes.
    #[serde(default)]
    pub openai_web_file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartUploadRequest {
    pub file_name: String,
    pub file_size: u64,
    pub use_case: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartUploadResponse {
    pub upload_file_info: UploadedFileInfo,
    /// Pre-signed blob URL the file body is PUT to.
    pub upload_url: String,
}

/// Entry of the chat plugin registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPlugin {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub manifest: Option<ChatPluginManifest>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user_settings: Option<ChatPluginUserSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatPluginManifest {
    #[serde(default)]
    pub name_for_model: Option<String>,
    #[serde(default)]
    pub name_for_human: Option<String>,
    #[serde(default)]
    pub description_for_human: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPluginUserSettings {
    #[serde(default)]
    pub is_authenticated: Option<bool>,
    #[serde(default)]
    pub is_installed: Option<bool>,
}
