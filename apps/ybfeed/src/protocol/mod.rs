use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// The server marshals a feed with no items as `"items": null`. Accept that
/// as an empty list, but keep the field itself required so the untagged
/// channel-message dispatch still keys on its presence.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FeedItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<FeedItem>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload the client sends over the channel to (re)subscribe to feed pushes.
pub const SUBSCRIBE_REQUEST: &str = "feed";

/// Application close codes above this threshold end the session for good
/// (feed deleted, secret revoked). Everything at or below is transient.
pub const TERMINAL_CLOSE_THRESHOLD: u16 = 4000;

/// A feed as served by `GET /api/feeds/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub items: Vec<FeedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(
        default,
        rename = "vapidpublickey",
        skip_serializing_if = "Option::is_none"
    )]
    pub vapid_public_key: Option<String>,
}

impl Feed {
    /// The usable session secret, if the server granted one. The server
    /// serializes an empty string when the caller is not trusted with it.
    pub fn session_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// One item of a feed. `name` is the natural key within a feed; `date` only
/// matters for the snapshot-merge sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(rename = "type")]
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ItemKind {
    Text,
    Image,
    Binary,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Image => "image",
            ItemKind::Binary => "binary",
        }
    }
}

impl TryFrom<u8> for ItemKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ItemKind::Text),
            1 => Ok(ItemKind::Image),
            2 => Ok(ItemKind::Binary),
            other => Err(format!("unknown item type {other}")),
        }
    }
}

impl From<ItemKind> for u8 {
    fn from(kind: ItemKind) -> u8 {
        match kind {
            ItemKind::Text => 0,
            ItemKind::Image => 1,
            ItemKind::Binary => 2,
        }
    }
}

/// Messages pushed by the server over the feed channel.
///
/// The wire format carries no discriminant: a snapshot is recognized by its
/// `items` field, a delta by its `action` field. `untagged` keeps that wire
/// contract while the rest of the crate matches on explicit variants.
/// Payloads matching neither shape fail to parse and are dropped by the
/// channel as forward-compatible no-ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelMessage {
    Snapshot(FeedSnapshot),
    Delta(FeedDelta),
}

/// Full replacement of the item list. The server may rotate the feed secret
/// by including a fresh one here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    #[serde(deserialize_with = "null_as_empty")]
    pub items: Vec<FeedItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(
        default,
        rename = "vapidpublickey",
        skip_serializing_if = "Option::is_none"
    )]
    pub vapid_public_key: Option<String>,
}

impl FeedSnapshot {
    pub fn session_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// Incremental update to the item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDelta {
    pub action: FeedAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<FeedItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedAction {
    Add,
    Remove,
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_parses_from_full_feed_payload() {
        // Shape the server writes on "feed" requests: the whole public feed.
        let raw = r#"{
            "name": "demo",
            "secret": "abc123",
            "vapidpublickey": "BNcRd...",
            "items": [
                {"name": "x.txt", "date": "2024-03-01T10:00:00.123456789Z", "type": 0},
                {"name": "y.png", "date": "2024-02-29T09:30:00Z", "type": 1}
            ]
        }"#;
        let msg: ChannelMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ChannelMessage::Snapshot(snap) => {
                assert_eq!(snap.items.len(), 2);
                assert_eq!(snap.items[0].name, "x.txt");
                assert_eq!(snap.items[0].kind, ItemKind::Text);
                assert_eq!(snap.session_secret(), Some("abc123"));
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_without_secret_parses() {
        let msg: ChannelMessage = serde_json::from_str(r#"{"items": []}"#).unwrap();
        match msg {
            ChannelMessage::Snapshot(snap) => {
                assert!(snap.items.is_empty());
                assert_eq!(snap.session_secret(), None);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn empty_secret_is_not_a_session_secret() {
        let msg: ChannelMessage =
            serde_json::from_str(r#"{"items": [], "secret": ""}"#).unwrap();
        match msg {
            ChannelMessage::Snapshot(snap) => assert_eq!(snap.session_secret(), None),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn null_items_means_empty_feed() {
        let msg: ChannelMessage =
            serde_json::from_str(r#"{"items": null, "secret": "s1"}"#).unwrap();
        match msg {
            ChannelMessage::Snapshot(snap) => assert!(snap.items.is_empty()),
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn delta_parses_with_item() {
        let raw = r#"{
            "action": "add",
            "item": {"name": "x.txt", "date": "2024-03-01T10:00:00Z", "type": 0,
                     "feed": {"name": "demo", "items": null, "secret": "", "vapidpublickey": ""}}
        }"#;
        let msg: ChannelMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ChannelMessage::Delta(delta) => {
                assert_eq!(delta.action, FeedAction::Add);
                assert_eq!(delta.item.unwrap().name, "x.txt");
            }
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn delta_parses_without_item() {
        let msg: ChannelMessage = serde_json::from_str(r#"{"action":"empty"}"#).unwrap();
        match msg {
            ChannelMessage::Delta(delta) => {
                assert_eq!(delta.action, FeedAction::Empty);
                assert!(delta.item.is_none());
            }
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_payload_is_an_error_not_a_variant() {
        assert!(serde_json::from_str::<ChannelMessage>(r#"{"ping": true}"#).is_err());
    }

    #[test]
    fn item_kind_rejects_unknown_discriminant() {
        let raw = r#"{"name": "x", "date": "2024-03-01T10:00:00Z", "type": 7}"#;
        assert!(serde_json::from_str::<FeedItem>(raw).is_err());
    }
}
