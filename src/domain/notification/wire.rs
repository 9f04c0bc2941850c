//! Wire types for the notifications endpoint.

use crate::shared::NotificationId;
use serde::Deserialize;
use serde_json::Value;

/// One element of `GET /api/notifications`.
#[derive(Deserialize, Debug, Clone)]
pub struct NotificationResponse {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    /// ISO text, epoch millis, or a display label such as `"2 min ago"`.
    #[serde(default)]
    pub time: Value,
    #[serde(default)]
    pub read: bool,
}
