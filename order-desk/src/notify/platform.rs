//! Notification platform boundary
//!
//! Permission is tri-state. Requesting it is an explicit, user-triggered call;
//! nothing in the core requests it on its own.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform notification permission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPermission {
    /// Never asked
    #[default]
    Default,
    Granted,
    /// Refused by the user; terminal until changed outside the app
    Denied,
}

impl NotificationPermission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationPermission::Default => "default",
            NotificationPermission::Granted => "granted",
            NotificationPermission::Denied => "denied",
        }
    }
}

impl FromStr for NotificationPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" => Ok(NotificationPermission::Default),
            "granted" => Ok(NotificationPermission::Granted),
            "denied" => Ok(NotificationPermission::Denied),
            other => Err(format!("unknown notification permission '{}'", other)),
        }
    }
}

impl fmt::Display for NotificationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ClickHandler = Arc<dyn Fn() + Send + Sync>;

/// A user-facing notification
#[derive(Clone)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Dedup tag; a second notification with the same tag replaces the first
    pub tag: String,
    pub on_click: Option<ClickHandler>,
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("title", &self.title)
            .field("body", &self.body)
            .field("tag", &self.tag)
            .field("on_click", &self.on_click.is_some())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification permission is {0}")]
    NotPermitted(NotificationPermission),

    #[error("Notification platform error: {0}")]
    Platform(String),
}

#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Ask the user; returns the resulting state
    async fn request_permission(&self) -> NotificationPermission;

    async fn raise(&self, notification: Notification) -> Result<(), NotifyError>;
}

// ============================================================================
// LogNotificationPlatform
// ============================================================================

const HISTORY_LIMIT: usize = 50;

/// Headless platform: notifications go to the log
///
/// Keeps the most recent notifications so a click can be replayed.
pub struct LogNotificationPlatform {
    permission: Mutex<NotificationPermission>,
    /// State adopted when permission is requested from `Default`
    answer: NotificationPermission,
    recent: Mutex<VecDeque<Notification>>,
}

impl LogNotificationPlatform {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer: NotificationPermission::Granted,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Answer given to the next permission request
    pub fn answering(mut self, answer: NotificationPermission) -> Self {
        self.answer = answer;
        self
    }

    pub fn recent(&self) -> Vec<Notification> {
        self.recent.lock().iter().cloned().collect()
    }

    /// Simulate a click on the notification with `tag`
    pub fn click(&self, tag: &str) -> bool {
        let handler = self
            .recent
            .lock()
            .iter()
            .rev()
            .find(|n| n.tag == tag)
            .and_then(|n| n.on_click.clone());
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl NotificationPlatform for LogNotificationPlatform {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> NotificationPermission {
        let mut permission = self.permission.lock();
        if *permission == NotificationPermission::Default {
            *permission = self.answer;
            tracing::info!(permission = %*permission, "Notification permission answered");
        }
        *permission
    }

    async fn raise(&self, notification: Notification) -> Result<(), NotifyError> {
        let permission = self.permission();
        if permission != NotificationPermission::Granted {
            return Err(NotifyError::NotPermitted(permission));
        }

        tracing::info!(tag = %notification.tag, "🔔 {}: {}", notification.title, notification.body);

        let mut recent = self.recent.lock();
        recent.retain(|n| n.tag != notification.tag);
        recent.push_back(notification);
        while recent.len() > HISTORY_LIMIT {
            recent.pop_front();
        }
        Ok(())
    }
}
