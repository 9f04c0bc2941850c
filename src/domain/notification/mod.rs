//! Notification domain: user notifications with optimistic read/dismiss.

pub mod client;
mod convert;
pub mod feed;
pub mod state;
pub mod wire;

use crate::error::FetchError;
use crate::shared::NotificationId;
use crate::source::{decode_json, Decode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use feed::{NotificationFeed, NotificationSink};
pub use state::{NotificationIntent, NotificationSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Warning,
    Info,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown notification type: {}", other)),
        }
    }
}

/// A user notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Time as sent by the backend, for display.
    pub time: String,
    /// Parsed `time`, when it is a real timestamp.
    pub timestamp: Option<DateTime<Utc>>,
    pub read: bool,
}

impl Decode for Vec<Notification> {
    fn decode(payload: serde_json::Value) -> Result<Self, FetchError> {
        let rows: Vec<wire::NotificationResponse> = decode_json(payload)?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }
}
