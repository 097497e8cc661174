//! Schema registry and validation gate.
//!
//! Every command owns one descriptor: a static list of [`FieldRule`]s. The gate
//! walks the descriptor against the raw JSON body, stops at the first violated
//! rule, and writes declared defaults into the body it forwards. Adding a
//! command means adding a descriptor, never a new branch in the walker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::requests::ReactionType;

/// A command descriptor.
pub type Schema = &'static [FieldRule];

static SHA256_HEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Fa-f0-9]{64}$").expect("digest pattern compiles")
});

/// String formats checked beyond "is a string".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Any form `Uuid::parse_str` reads: hyphenated, simple (32 hex digits),
    /// braced or `urn:uuid:` prefixed, case-insensitive.
    Uuid,
    /// 64 hex characters, i.e. a SHA-256 digest.
    Sha256Hex,
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Bool,
    Number,
    Text,
    Formatted(Format),
    OneOf(&'static [&'static str]),
    Object(Schema),
    ArrayOf(Schema),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Number(u64),
}

impl DefaultValue {
    fn to_value(self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Number(n) => Value::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence {
    Required,
    Optional,
    Default(DefaultValue),
}

/// One field of a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
}

impl FieldRule {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Required,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
        }
    }

    pub const fn defaulted(name: &'static str, kind: FieldKind, default: DefaultValue) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Default(default),
        }
    }
}

const UUID: FieldKind = FieldKind::Formatted(Format::Uuid);

const CONVERSATION_ID: FieldRule = FieldRule::required("conversationId", UUID);
const EXPECTS_READ_CONFIRMATION: FieldRule = FieldRule::defaulted(
    "expectsReadConfirmation",
    FieldKind::Bool,
    DefaultValue::Bool(false),
);
const MESSAGE_TIMER: FieldRule =
    FieldRule::defaulted("messageTimer", FieldKind::Number, DefaultValue::Number(0));

const LINK_PREVIEW_IMAGE: Schema = &[
    FieldRule::required("data", FieldKind::Text),
    FieldRule::required("height", FieldKind::Number),
    FieldRule::required("type", FieldKind::Text),
    FieldRule::required("width", FieldKind::Number),
];

const TWEET: Schema = &[
    FieldRule::optional("author", FieldKind::Text),
    FieldRule::optional("username", FieldKind::Text),
];

pub const LINK_PREVIEW: Schema = &[
    FieldRule::optional("image", FieldKind::Object(LINK_PREVIEW_IMAGE)),
    FieldRule::required("permanentUrl", FieldKind::Text),
    FieldRule::optional("summary", FieldKind::Text),
    FieldRule::optional("title", FieldKind::Text),
    FieldRule::optional("tweet", FieldKind::Object(TWEET)),
    FieldRule::required("url", FieldKind::Text),
    FieldRule::required("urlOffset", FieldKind::Number),
];

pub const MENTION: Schema = &[
    FieldRule::required("length", FieldKind::Number),
    FieldRule::required("start", FieldKind::Number),
    FieldRule::required("userId", UUID),
];

pub const QUOTE: Schema = &[
    FieldRule::required("quotedMessageId", UUID),
    FieldRule::required("quotedMessageSha256", FieldKind::Formatted(Format::Sha256Hex)),
];

pub const ARCHIVE: Schema = &[CONVERSATION_ID, FieldRule::required("archive", FieldKind::Bool)];

pub const MUTE: Schema = &[CONVERSATION_ID, FieldRule::required("mute", FieldKind::Bool)];

/// `clear` and `getMessages` only name the conversation.
pub const CONVERSATION: Schema = &[CONVERSATION_ID];

/// Shared by local and everywhere deletion.
pub const DELETION: Schema = &[CONVERSATION_ID, FieldRule::required("messageId", UUID)];

pub const LOCATION: Schema = &[
    CONVERSATION_ID,
    EXPECTS_READ_CONFIRMATION,
    FieldRule::required("latitude", FieldKind::Number),
    FieldRule::optional("locationName", FieldKind::Text),
    FieldRule::required("longitude", FieldKind::Number),
    MESSAGE_TIMER,
    FieldRule::optional("zoom", FieldKind::Number),
];

pub const TEXT: Schema = &[
    CONVERSATION_ID,
    EXPECTS_READ_CONFIRMATION,
    FieldRule::optional("linkPreview", FieldKind::Object(LINK_PREVIEW)),
    FieldRule::optional("mentions", FieldKind::ArrayOf(MENTION)),
    MESSAGE_TIMER,
    FieldRule::optional("quote", FieldKind::Object(QUOTE)),
    FieldRule::required("text", FieldKind::Text),
];

pub const PING: Schema = &[CONVERSATION_ID, EXPECTS_READ_CONFIRMATION, MESSAGE_TIMER];

pub const REACTION: Schema = &[
    CONVERSATION_ID,
    FieldRule::required("originalMessageId", UUID),
    FieldRule::required("type", FieldKind::OneOf(ReactionType::WIRE_NAMES)),
];

/// Same content pipeline as [`TEXT`], without a timer, plus the edited message id.
pub const MESSAGE_UPDATE: Schema = &[
    CONVERSATION_ID,
    EXPECTS_READ_CONFIRMATION,
    FieldRule::required("firstMessageId", UUID),
    FieldRule::optional("linkPreview", FieldKind::Object(LINK_PREVIEW)),
    FieldRule::optional("mentions", FieldKind::ArrayOf(MENTION)),
    FieldRule::optional("quote", FieldKind::Object(QUOTE)),
    FieldRule::required("text", FieldKind::Text),
];

/// Checks `body` against `schema` and returns it with defaults filled in.
/// Fields the schema does not declare are left untouched.
pub fn validate(schema: Schema, mut body: Value) -> Result<Value, ValidationError> {
    let map = body
        .as_object_mut()
        .ok_or_else(|| wrong_type("value", "an object"))?;
    check_object(schema, map, "")?;
    Ok(body)
}

fn check_object(
    schema: Schema,
    map: &mut Map<String, Value>,
    prefix: &str,
) -> Result<(), ValidationError> {
    for rule in schema {
        let path = if prefix.is_empty() {
            rule.name.to_string()
        } else {
            format!("{prefix}.{}", rule.name)
        };
        match map.get_mut(rule.name) {
            Some(value) => check_value(rule.kind, value, &path)?,
            None => match rule.presence {
                Presence::Required => return Err(ValidationError::Required(path)),
                Presence::Optional => {}
                Presence::Default(default) => {
                    map.insert(rule.name.to_string(), default.to_value());
                }
            },
        }
    }
    Ok(())
}

fn check_value(kind: FieldKind, value: &mut Value, path: &str) -> Result<(), ValidationError> {
    match kind {
        FieldKind::Bool if value.is_boolean() => Ok(()),
        FieldKind::Bool => Err(wrong_type(path, "a boolean")),
        FieldKind::Number if value.is_number() => Ok(()),
        FieldKind::Number => Err(wrong_type(path, "a number")),
        FieldKind::Text => {
            let text = as_text(value, path)?;
            if text.is_empty() {
                return Err(ValidationError::Empty(path.to_string()));
            }
            Ok(())
        }
        FieldKind::Formatted(Format::Uuid) => {
            let text = as_text(value, path)?;
            Uuid::parse_str(text)
                .map(|_| ())
                .map_err(|_| ValidationError::InvalidUuid(path.to_string()))
        }
        FieldKind::Formatted(Format::Sha256Hex) => {
            let text = as_text(value, path)?;
            if SHA256_HEX.is_match(text) {
                Ok(())
            } else {
                Err(ValidationError::DigestPattern {
                    path: path.to_string(),
                    value: text.to_string(),
                })
            }
        }
        FieldKind::OneOf(allowed) => {
            let text = as_text(value, path)?;
            if allowed.contains(&text) {
                Ok(())
            } else {
                Err(ValidationError::NotAllowed {
                    path: path.to_string(),
                    allowed,
                })
            }
        }
        FieldKind::Object(schema) => {
            let map = value
                .as_object_mut()
                .ok_or_else(|| wrong_type(path, "an object"))?;
            check_object(schema, map, path)
        }
        FieldKind::ArrayOf(schema) => {
            let items = value
                .as_array_mut()
                .ok_or_else(|| wrong_type(path, "an array"))?;
            for (index, item) in items.iter_mut().enumerate() {
                let item_path = format!("{path}[{index}]");
                let map = item
                    .as_object_mut()
                    .ok_or_else(|| wrong_type(&item_path, "an object"))?;
                check_object(schema, map, &item_path)?;
            }
            Ok(())
        }
    }
}

fn as_text<'a>(value: &'a Value, path: &str) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or_else(|| wrong_type(path, "a string"))
}

fn wrong_type(path: &str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType {
        path: path.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONVERSATION_UUID: &str = "11111111-1111-1111-1111-111111111111";
    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn missing_required_field_is_named() {
        let err = validate(ARCHIVE, json!({ "conversationId": CONVERSATION_UUID })).unwrap_err();
        assert_eq!(err, ValidationError::Required("archive".into()));
        assert_eq!(err.to_string(), "\"archive\" is required");
    }

    #[test]
    fn every_descriptor_requires_a_conversation() {
        for schema in [ARCHIVE, MUTE, CONVERSATION, DELETION, LOCATION, TEXT, PING, REACTION, MESSAGE_UPDATE] {
            let err = validate(schema, json!({})).unwrap_err();
            assert_eq!(err.path(), "conversationId");
        }
    }

    #[test]
    fn malformed_conversation_id_is_rejected() {
        let err = validate(CONVERSATION, json!({ "conversationId": "not-a-uuid" })).unwrap_err();
        assert_eq!(err, ValidationError::InvalidUuid("conversationId".into()));
    }

    #[test]
    fn guid_forms() {
        for accepted in [
            CONVERSATION_UUID,
            "11111111111111111111111111111111",
            "{11111111-1111-1111-1111-111111111111}",
            "urn:uuid:11111111-1111-1111-1111-111111111111",
            "ABCDEFAB-1111-1111-1111-111111111111",
        ] {
            assert!(validate(CONVERSATION, json!({ "conversationId": accepted })).is_ok());
        }
        for rejected in ["1111-1111", "11111111-1111-1111-1111-11111111111g", ""] {
            let err = validate(CONVERSATION, json!({ "conversationId": rejected })).unwrap_err();
            assert_eq!(err, ValidationError::InvalidUuid("conversationId".into()));
        }
    }

    #[test]
    fn any_json_number_is_a_number() {
        for timer in [json!(1500.5), json!(-1), json!(0.0), json!(9_000_000_000u64)] {
            let body = validate(PING, json!({ "conversationId": CONVERSATION_UUID, "messageTimer": timer.clone() }))
                .unwrap();
            assert_eq!(body["messageTimer"], timer);
        }
        let body = validate(
            TEXT,
            json!({
                "conversationId": CONVERSATION_UUID,
                "text": "hi @you",
                "mentions": [{ "userId": CONVERSATION_UUID, "start": 0.0, "length": 4 }],
            }),
        );
        assert!(body.is_ok());
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = validate(
            ARCHIVE,
            json!({ "conversationId": CONVERSATION_UUID, "archive": "true" }),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "\"archive\" must be a boolean");

        let err = validate(
            LOCATION,
            json!({ "conversationId": CONVERSATION_UUID, "latitude": "52.5", "longitude": 13.4 }),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "\"latitude\" must be a number");

        let err = validate(PING, json!({ "conversationId": CONVERSATION_UUID, "messageTimer": "5" }))
            .unwrap_err();
        assert_eq!(err.to_string(), "\"messageTimer\" must be a number");
    }

    #[test]
    fn body_must_be_an_object() {
        let err = validate(PING, json!(["conversationId"])).unwrap_err();
        assert_eq!(err.to_string(), "\"value\" must be an object");
    }

    #[test]
    fn defaults_are_written_into_the_body() {
        let body = validate(PING, json!({ "conversationId": CONVERSATION_UUID })).unwrap();
        assert_eq!(body["expectsReadConfirmation"], json!(false));
        assert_eq!(body["messageTimer"], json!(0));

        let body = validate(
            PING,
            json!({ "conversationId": CONVERSATION_UUID, "expectsReadConfirmation": true, "messageTimer": 5000 }),
        )
        .unwrap();
        assert_eq!(body["expectsReadConfirmation"], json!(true));
        assert_eq!(body["messageTimer"], json!(5000));
    }

    #[test]
    fn update_has_no_timer_default() {
        let body = validate(
            MESSAGE_UPDATE,
            json!({
                "conversationId": CONVERSATION_UUID,
                "firstMessageId": CONVERSATION_UUID,
                "text": "edited",
            }),
        )
        .unwrap();
        assert!(body.get("messageTimer").is_none());
        assert_eq!(body["expectsReadConfirmation"], json!(false));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body = validate(
            CONVERSATION,
            json!({ "conversationId": CONVERSATION_UUID, "extra": { "nested": 1 } }),
        )
        .unwrap();
        assert_eq!(body["extra"]["nested"], json!(1));
    }

    #[test]
    fn reaction_type_is_enumerated() {
        let base = json!({ "conversationId": CONVERSATION_UUID, "originalMessageId": CONVERSATION_UUID });
        for accepted in ["LIKE", "NONE"] {
            let mut body = base.clone();
            body["type"] = json!(accepted);
            assert!(validate(REACTION, body).is_ok());
        }
        for rejected in ["like", "explode", ""] {
            let mut body = base.clone();
            body["type"] = json!(rejected);
            let err = validate(REACTION, body).unwrap_err();
            assert_eq!(err.to_string(), "\"type\" must be one of [LIKE, NONE]");
        }
    }

    #[test]
    fn quote_digest_must_be_64_hex_characters() {
        let text = |digest: &str| {
            json!({
                "conversationId": CONVERSATION_UUID,
                "text": "quoted",
                "quote": { "quotedMessageId": CONVERSATION_UUID, "quotedMessageSha256": digest },
            })
        };
        assert!(validate(TEXT, text(DIGEST)).is_ok());
        assert!(validate(TEXT, text(&DIGEST.to_uppercase())).is_ok());

        let too_long = format!("{DIGEST}0");
        let not_hex = DIGEST.replace('9', "g");
        for bad in [&DIGEST[..63], too_long.as_str(), not_hex.as_str()] {
            let err = validate(TEXT, text(bad)).unwrap_err();
            assert_eq!(err.path(), "quote.quotedMessageSha256");
        }
    }

    #[test]
    fn nested_paths_are_reported() {
        let err = validate(
            TEXT,
            json!({
                "conversationId": CONVERSATION_UUID,
                "text": "hi",
                "linkPreview": {
                    "permanentUrl": "https://example.com",
                    "url": "example.com",
                    "urlOffset": 0,
                    "image": { "data": "aGk=", "height": 10, "type": "image/png" },
                },
            }),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::Required("linkPreview.image.width".into()));

        let err = validate(
            TEXT,
            json!({
                "conversationId": CONVERSATION_UUID,
                "text": "hi @you",
                "mentions": [
                    { "userId": CONVERSATION_UUID, "start": 3, "length": 4 },
                    { "userId": "nobody", "start": 3, "length": 4 },
                ],
            }),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidUuid("mentions[1].userId".into()));
    }

    #[test]
    fn required_text_must_not_be_empty() {
        let err = validate(TEXT, json!({ "conversationId": CONVERSATION_UUID, "text": "" })).unwrap_err();
        assert_eq!(err, ValidationError::Empty("text".into()));
    }
}
