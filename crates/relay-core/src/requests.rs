//! Typed command bodies, deserialized from JSON that already passed the gate.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

// The gate accepts any JSON number for counts, offsets and timers. They are held
// as whole values: fractions truncate toward zero, negatives clamp to zero.
fn whole_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    f64::deserialize(deserializer).map(|n| n as u64)
}

fn whole_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    f64::deserialize(deserializer).map(|n| n as u32)
}

/// Body of `clear` and `getMessages`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRequest {
    pub conversation_id: Uuid,
    pub archive: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteRequest {
    pub conversation_id: Uuid,
    pub mute: bool,
}

/// Body of both local and everywhere deletion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequest {
    pub conversation_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    /// Base64 text; decoded by the content transformer.
    pub data: String,
    #[serde(deserialize_with = "whole_u32")]
    pub height: u32,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(deserialize_with = "whole_u32")]
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreviewRequest {
    #[serde(default)]
    pub image: Option<ImageRequest>,
    pub permanent_url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tweet: Option<TweetContent>,
    pub url: String,
    #[serde(deserialize_with = "whole_u64")]
    pub url_offset: u64,
}

/// Mentions pass through the transformer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionContent {
    pub user_id: Uuid,
    #[serde(deserialize_with = "whole_u64")]
    pub start: u64,
    #[serde(deserialize_with = "whole_u64")]
    pub length: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub quoted_message_id: Uuid,
    /// 64 hex characters.
    pub quoted_message_sha256: String,
}

/// Content fields shared by `sendText` and `updateText`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBody {
    pub text: String,
    #[serde(default)]
    pub expects_read_confirmation: bool,
    #[serde(default)]
    pub link_preview: Option<LinkPreviewRequest>,
    #[serde(default)]
    pub mentions: Option<Vec<MentionContent>>,
    #[serde(default)]
    pub quote: Option<QuoteRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    pub conversation_id: Uuid,
    #[serde(default, deserialize_with = "whole_u64")]
    pub message_timer: u64,
    #[serde(flatten)]
    pub body: TextBody,
}

/// `updateText`: text content plus the id of the message being edited. Carries
/// no timer; a `messageTimer` in the body is ignored like any unknown field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdateRequest {
    pub conversation_id: Uuid,
    pub first_message_id: Uuid,
    #[serde(flatten)]
    pub body: TextBody,
}

/// `sendPing`: the flags of a text message without any text.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub expects_read_confirmation: bool,
    #[serde(default, deserialize_with = "whole_u64")]
    pub message_timer: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub conversation_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub expects_read_confirmation: bool,
    #[serde(default, deserialize_with = "whole_u64")]
    pub message_timer: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionType {
    #[serde(rename = "LIKE")]
    Like,
    /// Withdraws an earlier reaction.
    #[serde(rename = "NONE")]
    Remove,
}

impl ReactionType {
    /// Accepted spellings, in schema order.
    pub const WIRE_NAMES: &'static [&'static str] = &["LIKE", "NONE"];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionType::Like => "LIKE",
            ReactionType::Remove => "NONE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub conversation_id: Uuid,
    pub original_message_id: Uuid,
    #[serde(rename = "type")]
    pub reaction: ReactionType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_request_flattens_text_fields() {
        let req: MessageUpdateRequest = serde_json::from_value(json!({
            "conversationId": "11111111-1111-1111-1111-111111111111",
            "firstMessageId": "22222222-2222-2222-2222-222222222222",
            "text": "fixed typo",
            "expectsReadConfirmation": true,
        }))
        .unwrap();
        assert_eq!(req.body.text, "fixed typo");
        assert!(req.body.expects_read_confirmation);
        assert_eq!(
            req.first_message_id.to_string(),
            "22222222-2222-2222-2222-222222222222"
        );
    }

    #[test]
    fn update_request_ignores_a_timer() {
        let req: MessageUpdateRequest = serde_json::from_value(json!({
            "conversationId": "11111111-1111-1111-1111-111111111111",
            "firstMessageId": "22222222-2222-2222-2222-222222222222",
            "text": "b",
            "messageTimer": -1,
        }))
        .unwrap();
        assert_eq!(req.body.text, "b");
    }

    #[test]
    fn numbers_are_held_as_whole_values() {
        let req: PingRequest = serde_json::from_value(json!({
            "conversationId": "11111111-1111-1111-1111-111111111111",
            "messageTimer": 1500.5,
        }))
        .unwrap();
        assert_eq!(req.message_timer, 1500);

        let req: PingRequest = serde_json::from_value(json!({
            "conversationId": "11111111-1111-1111-1111-111111111111",
            "messageTimer": -1,
        }))
        .unwrap();
        assert_eq!(req.message_timer, 0);

        let mention: MentionContent = serde_json::from_value(json!({
            "userId": "33333333-3333-3333-3333-333333333333",
            "start": 0.0,
            "length": 4.9,
        }))
        .unwrap();
        assert_eq!((mention.start, mention.length), (0, 4));

        let req: PingRequest = serde_json::from_value(json!({
            "conversationId": "11111111-1111-1111-1111-111111111111",
        }))
        .unwrap();
        assert_eq!(req.message_timer, 0);
    }

    #[test]
    fn reaction_type_uses_wire_names() {
        let req: ReactionRequest = serde_json::from_value(json!({
            "conversationId": "11111111-1111-1111-1111-111111111111",
            "originalMessageId": "22222222-2222-2222-2222-222222222222",
            "type": "NONE",
        }))
        .unwrap();
        assert_eq!(req.reaction, ReactionType::Remove);
        assert_eq!(serde_json::to_value(ReactionType::Like).unwrap(), json!("LIKE"));
        for (variant, name) in [ReactionType::Like, ReactionType::Remove]
            .into_iter()
            .zip(ReactionType::WIRE_NAMES)
        {
            assert_eq!(variant.as_str(), *name);
        }
    }
}
