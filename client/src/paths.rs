//! REST paths relative to the configured base URL.

pub const LOGIN: &str = "/auth/login";
pub const LOGOUT: &str = "/auth/logout";
pub const REGISTER: &str = "/auth/register";
pub const ADMIN_REGISTER: &str = "/auth/adminregister";

pub const USER_ME: &str = "/user/me";
pub const USERS: &str = "/user";

pub const CONVERSATIONS: &str = "/conv";

pub const COMMON_STATUS: &str = "/status/common";

pub const SYSTEM_INFO: &str = "/system/info";
pub const SYSTEM_CONFIG: &str = "/system/config";
pub const REQUEST_STATS: &str = "/system/stats/request";
pub const ASK_STATS: &str = "/system/stats/ask";

pub const SERVER_LOGS: &str = "/logs/server";
pub const PROXY_LOGS: &str = "/logs/proxy";
pub const COMPLETION_LOGS: &str = "/logs/completions";

pub const LOCAL_UPLOAD: &str = "/files/local/upload";
pub const LOCAL_DOWNLOAD: &str = "/files/local/download";
pub const UPLOAD_START: &str = "/files/openai-web/upload-start";
pub const UPLOAD_COMPLETE: &str = "/files/openai-web/upload-complete";

pub const CHAT_PLUGINS: &str = "/chat/openai-plugins";

/// WebSocket ask endpoint, appended to the base URL path.
pub const WEBSOCKET_CHAT: &str = "chat";

pub fn user(id: i64) -> String {
    format!("{USERS}/{id}")
}

pub fn user_setting(id: i64) -> String {
    format!("{USERS}/{id}/setting")
}

pub fn conversation(id: &str) -> String {
    format!("{CONVERSATIONS}/{id}")
}

pub fn vanish_conversation(id: &str) -> String {
    format!("{CONVERSATIONS}/{id}/vanish")
}

pub fn generate_title(id: &str) -> String {
    format!("{CONVERSATIONS}/{id}/gen_title")
}

pub fn assign_conversation(id: &str, username: &str) -> String {
    format!("{CONVERSATIONS}/{id}/assign/{username}")
}

pub fn local_download(file_id: &str) -> String {
    format!("{LOCAL_DOWNLOAD}/{file_id}")
}

pub fn upload_complete(file_id: &str) -> String {
    format!("{UPLOAD_COMPLETE}/{file_id}")
}

/// Calls whose 401 means bad credentials, not an expired session.
pub(crate) fn is_auth_call(path: &str) -> bool {
    path == LOGIN || path == LOGOUT
}
