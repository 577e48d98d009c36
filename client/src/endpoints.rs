//! Typed wrappers over the REST endpoints.

use cws_protocol::ConversationHistory;
use cws_protocol::schema::ChatPlugin;
use cws_protocol::schema::CommonStatus;
use cws_protocol::schema::ConversationSchema;
use cws_protocol::schema::UserCreate;
use cws_protocol::schema::UserRead;
use reqwest::Method;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;
use url::Url;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::paths;

/// Filter for `POST /logs/server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub max_lines: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_keywords: Option<Vec<String>>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            max_lines: 100,
            exclude_keywords: None,
        }
    }
}

impl ApiClient {
    /// Cookie login. The backend answers with `Set-Cookie`, which the jar keeps.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let form = Form::new()
            .text("username", username.to_string())
            .text("password", password.to_string());
        let request = self.request(Method::POST, paths::LOGIN)?.multipart(form);
        self.execute::<JsonValue>(paths::LOGIN, request).await?;
        info!(username, "logged in");
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.request(Method::POST, paths::LOGOUT)?;
        self.execute::<JsonValue>(paths::LOGOUT, request).await?;
        Ok(())
    }

    pub async fn register(&self, user: &UserCreate) -> Result<UserRead, ApiError> {
        let request = self.request(Method::POST, paths::REGISTER)?.json(user);
        self.fetch(paths::REGISTER, request).await
    }

    /// Superuser-only registration that may grant admin rights.
    pub async fn admin_register(&self, user: &UserCreate) -> Result<UserRead, ApiError> {
        let request = self.request(Method::POST, paths::ADMIN_REGISTER)?.json(user);
        self.fetch(paths::ADMIN_REGISTER, request).await
    }

    pub async fn me(&self) -> Result<UserRead, ApiError> {
        let request = self.request(Method::GET, paths::USER_ME)?;
        self.fetch(paths::USER_ME, request).await
    }

    pub async fn users(&self) -> Result<Vec<UserRead>, ApiError> {
        let request = self.request(Method::GET, paths::USERS)?;
        self.fetch(paths::USERS, request).await
    }

    pub async fn user(&self, user_id: i64) -> Result<UserRead, ApiError> {
        let path = paths::user(user_id);
        let request = self.request(Method::GET, &path)?;
        self.fetch(&path, request).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        let path = paths::user(user_id);
        let request = self.request(Method::DELETE, &path)?;
        self.execute::<JsonValue>(&path, request).await?;
        Ok(())
    }

    pub async fn update_user_setting(
        &self,
        user_id: i64,
        setting: &JsonValue,
    ) -> Result<UserRead, ApiError> {
        let path = paths::user_setting(user_id);
        let request = self.request(Method::PATCH, &path)?.json(setting);
        self.fetch(&path, request).await
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationSchema>, ApiError> {
        let request = self.request(Method::GET, paths::CONVERSATIONS)?;
        Ok(self
            .execute(paths::CONVERSATIONS, request)
            .await?
            .unwrap_or_default())
    }

    pub async fn conversation_history(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationHistory, ApiError> {
        let path = paths::conversation(conversation_id);
        let request = self.request(Method::GET, &path)?;
        self.fetch(&path, request).await
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        let path = paths::conversation(conversation_id);
        let request = self.request(Method::DELETE, &path)?;
        self.execute::<JsonValue>(&path, request).await?;
        Ok(())
    }

    /// Remove the conversation from the backend and the upstream provider.
    pub async fn vanish_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        let path = paths::vanish_conversation(conversation_id);
        let request = self.request(Method::DELETE, &path)?;
        self.execute::<JsonValue>(&path, request).await?;
        Ok(())
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<ConversationSchema, ApiError> {
        let path = paths::conversation(conversation_id);
        let request = self
            .request(Method::PATCH, &path)?
            .query(&[("title", title)]);
        self.fetch(&path, request).await
    }

    /// Ask the backend to title the conversation from `message_id`.
    pub async fn generate_title(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<ConversationSchema, ApiError> {
        let path = paths::generate_title(conversation_id);
        let request = self
            .request(Method::PATCH, &path)?
            .query(&[("message_id", message_id)]);
        self.fetch(&path, request).await
    }

    pub async fn assign_conversation(
        &self,
        conversation_id: &str,
        username: &str,
    ) -> Result<(), ApiError> {
        let path = paths::assign_conversation(conversation_id, username);
        let request = self.request(Method::PATCH, &path)?;
        self.execute::<JsonValue>(&path, request).await?;
        Ok(())
    }

    pub async fn common_status(&self) -> Result<CommonStatus, ApiError> {
        let request = self.request(Method::GET, paths::COMMON_STATUS)?;
        self.fetch(paths::COMMON_STATUS, request).await
    }

    pub async fn system_info(&self) -> Result<JsonValue, ApiError> {
        let request = self.request(Method::GET, paths::SYSTEM_INFO)?;
        self.fetch(paths::SYSTEM_INFO, request).await
    }

    pub async fn system_config(&self) -> Result<JsonValue, ApiError> {
        let request = self.request(Method::GET, paths::SYSTEM_CONFIG)?;
        self.fetch(paths::SYSTEM_CONFIG, request).await
    }

    pub async fn update_system_config(&self, config: &JsonValue) -> Result<JsonValue, ApiError> {
        let request = self.request(Method::PUT, paths::SYSTEM_CONFIG)?.json(config);
        self.fetch(paths::SYSTEM_CONFIG, request).await
    }

    /// Request counts bucketed by `granularity` seconds.
    pub async fn request_stats(&self, granularity: u64) -> Result<Vec<JsonValue>, ApiError> {
        let request = self
            .request(Method::GET, paths::REQUEST_STATS)?
            .query(&[("granularity", granularity)]);
        Ok(self
            .execute(paths::REQUEST_STATS, request)
            .await?
            .unwrap_or_default())
    }

    pub async fn ask_stats(&self, granularity: u64) -> Result<Vec<JsonValue>, ApiError> {
        let request = self
            .request(Method::GET, paths::ASK_STATS)?
            .query(&[("granularity", granularity)]);
        Ok(self
            .execute(paths::ASK_STATS, request)
            .await?
            .unwrap_or_default())
    }

    pub async fn server_logs(&self, query: &LogQuery) -> Result<Vec<String>, ApiError> {
        let request = self.request(Method::POST, paths::SERVER_LOGS)?.json(query);
        Ok(self
            .execute(paths::SERVER_LOGS, request)
            .await?
            .unwrap_or_default())
    }

    pub async fn proxy_logs(&self, query: &LogQuery) -> Result<Vec<String>, ApiError> {
        let request = self.request(Method::POST, paths::PROXY_LOGS)?.json(query);
        Ok(self
            .execute(paths::PROXY_LOGS, request)
            .await?
            .unwrap_or_default())
    }

    pub async fn completion_logs(&self, limit: u32) -> Result<Vec<JsonValue>, ApiError> {
        let request = self
            .request(Method::GET, paths::COMPLETION_LOGS)?
            .query(&[("limit", limit)]);
        Ok(self
            .execute(paths::COMPLETION_LOGS, request)
            .await?
            .unwrap_or_default())
    }

    pub async fn chat_plugins(&self) -> Result<Vec<ChatPlugin>, ApiError> {
        let request = self.request(Method::GET, paths::CHAT_PLUGINS)?;
        Ok(self
            .execute(paths::CHAT_PLUGINS, request)
            .await?
            .unwrap_or_default())
    }

    pub fn local_download_url(&self, file_id: &str) -> Result<Url, ApiError> {
        self.endpoint(&paths::local_download(file_id))
    }
}
