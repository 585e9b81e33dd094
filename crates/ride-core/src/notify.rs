//! Outbound account mail: email verification and password reset links.
//!
//! Delivery is a side channel: callers log failures and carry on.

use async_trait::async_trait;

use crate::error::CoreResult;

/// Templated payloads understood by every [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Verification { token: String },
    PasswordReset { token: String },
}

impl Notification {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Verification { .. } => "Email Verification",
            Self::PasswordReset { .. } => "Password Reset Request",
        }
    }

    /// Renders the message body with links rooted at `base_url`.
    pub fn body(&self, base_url: &str) -> String {
        let base_url = base_url.trim_end_matches('/');
        match self {
            Self::Verification { token } => format!(
                "Please click the link below to verify your email:\n\
                 {base_url}/verify-email?token={token}"
            ),
            Self::PasswordReset { token } => format!(
                "Please click the link below to reset your password:\n\
                 {base_url}/reset-password?token={token}\n\
                 This link will expire in 1 hour."
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, notification: Notification) -> CoreResult<()>;
}

/// Notifier that writes rendered messages to the log instead of sending them.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    base_url: String,
}

impl LogNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, notification: Notification) -> CoreResult<()> {
        tracing::info!(
            recipient,
            subject = notification.subject(),
            body = %notification.body(&self.base_url),
            "notification dispatched"
        );
        Ok(())
    }
}
