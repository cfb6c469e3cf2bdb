use std::sync::Arc;

use async_trait::async_trait;

use super::{Alert, AlertChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Unknown,
    Granted,
    Denied,
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    /// The notification stays until the user dismisses it.
    pub require_interaction: bool,
}

#[async_trait]
pub trait NotificationPlatform: Send + Sync + 'static {
    fn permission(&self) -> Permission;

    async fn request_permission(&self) -> Permission;

    async fn show(&self, notification: &AlertNotification) -> anyhow::Result<()>;
}

/// Emits alert notifications, asking for permission the first time one is
/// needed. Nothing here ever fails the caller.
pub struct NotificationDispatcher {
    platform: Arc<dyn NotificationPlatform>,
    icon: String,
}

impl NotificationDispatcher {
    pub fn new(platform: Arc<dyn NotificationPlatform>, icon: impl Into<String>) -> Self {
        Self {
            platform,
            icon: icon.into(),
        }
    }

    /// Asks for permission now if it is still unknown.
    pub async fn prepare(&self) -> Permission {
        let permission = self.platform.permission();
        if permission != Permission::Unknown {
            return permission;
        }

        let permission = self.platform.request_permission().await;
        log::info!("Notification permission is {permission:?}");
        permission
    }

    pub async fn dispatch(&self, title: &str, body: &str) {
        let permission = self.platform.permission();

        match permission {
            Permission::Unsupported => {
                log::warn!("Notifications are not supported here, dropping '{title}'");
            }
            Permission::Unknown => {
                let platform = Arc::clone(&self.platform);
                tokio::spawn(async move {
                    let granted = platform.request_permission().await;
                    log::info!("Notification permission is {granted:?}");
                });
                log::warn!("Notification permission not granted yet, dropping '{title}'");
            }
            Permission::Denied => {
                log::warn!("Notification permission denied, dropping '{title}'");
            }
            Permission::Granted => {
                let notification = AlertNotification {
                    title: title.to_string(),
                    body: body.to_string(),
                    icon: self.icon.clone(),
                    require_interaction: true,
                };

                if let Err(e) = self.platform.show(&notification).await {
                    log::error!("Could not show notification '{title}': {e:#}");
                }
            }
        }
    }
}

#[async_trait]
impl AlertChannel for NotificationDispatcher {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn deliver(&self, alert: &Alert) -> anyhow::Result<()> {
        self.dispatch(&alert.title, &alert.body).await;
        Ok(())
    }
}
