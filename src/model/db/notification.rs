use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::Notifiable, mongodb::Coll, mongodb::Id};

/// Core notification data: an audit/outbox entry for a recipient. Delivery
/// is somebody else's problem; we only persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCore {
    pub recipient: Notifiable,
    pub message: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl NotificationCore {
    pub fn new(recipient: Notifiable, message: String) -> Self {
        Self {
            recipient,
            message,
            created_at: Utc::now(),
        }
    }
}

/// A notification without an ID.
pub type NewNotification = NotificationCore;

/// A notification from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub notification: NotificationCore,
}

impl Deref for Notification {
    type Target = NotificationCore;

    fn deref(&self) -> &Self::Target {
        &self.notification
    }
}

impl Notification {
    /// Record a notification, tolerating failure: a notification that cannot
    /// be written must never undo the state change it describes, so errors
    /// are logged and swallowed here.
    pub async fn send(
        notifications: &Coll<NewNotification>,
        recipient: Notifiable,
        message: String,
    ) {
        let notification = NewNotification::new(recipient, message);
        if let Err(e) = notifications.insert_one(&notification, None).await {
            warn!(
                "Failed to record notification for {:?}: {e}",
                notification.recipient
            );
        }
    }
}
