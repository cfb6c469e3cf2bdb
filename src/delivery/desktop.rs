use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use notify_rust::{Notification, Timeout};

use super::{AlertNotification, NotificationPlatform, Permission};

/// Desktop notifications through the platform notification service.
///
/// On freedesktop systems permission means a notification server answers on
/// the session bus. Elsewhere notifications are always allowed.
pub struct DesktopNotifications {
    app_name: String,
    permission: Mutex<Permission>,
}

impl DesktopNotifications {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            permission: Mutex::new(Permission::Unknown),
        }
    }

    fn set_permission(&self, permission: Permission) {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner) = permission;
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn probe_notification_server() -> Permission {
    match notify_rust::get_server_information() {
        Ok(server) => {
            log::info!("Found notification server {} {}", server.name, server.version);
            Permission::Granted
        }
        Err(e) => {
            log::warn!("No notification server available: {e}");
            Permission::Unsupported
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn probe_notification_server() -> Permission {
    Permission::Granted
}

#[async_trait]
impl NotificationPlatform for DesktopNotifications {
    fn permission(&self) -> Permission {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_permission(&self) -> Permission {
        let permission = tokio::task::spawn_blocking(probe_notification_server)
            .await
            .unwrap_or(Permission::Unsupported);
        self.set_permission(permission);
        permission
    }

    async fn show(&self, notification: &AlertNotification) -> anyhow::Result<()> {
        let timeout = if notification.require_interaction {
            Timeout::Never
        } else {
            Timeout::Default
        };

        let mut desktop = Notification::new();
        desktop
            .summary(&notification.title)
            .body(&notification.body)
            .icon(&notification.icon)
            .appname(&self.app_name)
            .timeout(timeout);

        tokio::task::spawn_blocking(move || desktop.show().map(|_| ()))
            .await
            .context("Notification task failed.")?
            .context("Could not show desktop notification.")
    }
}
