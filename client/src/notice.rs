use tokio::sync::mpsc;
use tracing::debug;

/// Side-channel events the UI surfaces to the user while a call fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotice {
    /// Human-readable failure, e.g. `"403: errors.noPermission"`.
    Error(String),
    /// The session cookie was rejected; the user must log in again.
    LoginExpired,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct NoticeSender {
    tx: Option<mpsc::UnboundedSender<ClientNotice>>,
}

impl NoticeSender {
    pub(crate) fn new(tx: Option<mpsc::UnboundedSender<ClientNotice>>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, notice: ClientNotice) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(notice).is_err() {
            debug!("notice receiver dropped");
        }
    }
}
