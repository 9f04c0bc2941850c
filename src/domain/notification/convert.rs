//! Conversions from wire types to domain types for notifications.

use super::wire::NotificationResponse;
use super::{Notification, NotificationKind};
use crate::shared::serde_util::timestamp_lenient;
use chrono::{DateTime, Utc};
use serde_json::Value;

impl From<NotificationResponse> for Notification {
    fn from(n: NotificationResponse) -> Self {
        let kind = n.kind.parse().unwrap_or_else(|_| {
            tracing::debug!(id = %n.id, kind = %n.kind, "Unknown notification type, using info");
            NotificationKind::Info
        });
        let (time, timestamp) = parse_time(n.time);
        Self {
            id: n.id,
            kind,
            title: n.title,
            message: n.message,
            time,
            timestamp,
            read: n.read,
        }
    }
}

fn parse_time(raw: Value) -> (String, Option<DateTime<Utc>>) {
    match raw {
        Value::String(s) => {
            let at = timestamp_lenient::parse(&s).ok();
            (s, at)
        }
        Value::Number(n) => {
            let at = n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis);
            (n.to_string(), at)
        }
        _ => (String::new(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(value: Value) -> NotificationResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_conversion_with_iso_time() {
        let n = Notification::from(wire(json!({
            "id": 12,
            "type": "warning",
            "title": "Margin",
            "message": "Margin usage above 80%",
            "time": "2024-05-01T08:00:00Z",
            "read": false
        })));
        assert_eq!(n.id.as_str(), "12");
        assert_eq!(n.kind, NotificationKind::Warning);
        assert_eq!(n.time, "2024-05-01T08:00:00Z");
        assert!(n.timestamp.is_some());
        assert!(!n.read);
    }

    #[test]
    fn test_conversion_keeps_display_label_and_unknown_kind() {
        let n = Notification::from(wire(json!({
            "id": "a1",
            "type": "promo",
            "title": "t",
            "message": "m",
            "time": "5 min ago"
        })));
        assert_eq!(n.kind, NotificationKind::Info);
        assert_eq!(n.time, "5 min ago");
        assert!(n.timestamp.is_none());
    }
}
