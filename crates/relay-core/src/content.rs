//! Content transformer: validated requests in, client-ready content out.
//!
//! Two conversions happen here: the link preview image travels as base64 text
//! and is decoded to raw bytes, and the quote digest travels as hex and is
//! decoded to 32 raw bytes. Everything else passes through. Content objects are
//! built once per request and never mutated afterwards.

use base64::{
    alphabet,
    engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD as B64},
    engine::DecodePaddingMode,
    Engine as _,
};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::ContentError;
use crate::requests::{
    ImageRequest, LinkPreviewRequest, LocationRequest, MentionContent, QuoteRequest, TextBody,
    TweetContent,
};

const IMAGE_DATA_FIELD: &str = "linkPreview.image.data";
const QUOTE_DIGEST_FIELD: &str = "quote.quotedMessageSha256";

/// Padding optional, stray trailing bits tolerated.
const LENIENT_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageContent {
    #[serde(serialize_with = "as_base64")]
    pub data: Vec<u8>,
    pub height: u32,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreviewContent {
    pub permanent_url: String,
    pub url: String,
    pub url_offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet: Option<TweetContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteContent {
    pub quoted_message_id: Uuid,
    #[serde(serialize_with = "as_hex")]
    pub quoted_message_sha256: [u8; 32],
}

/// Everything `sendText` and `updateText` hand to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview: Option<LinkPreviewContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<MentionContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteContent>,
    pub expects_read_confirmation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationContent {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    pub expects_read_confirmation: bool,
}

/// Decodes base64 image text. Line breaks and other ASCII whitespace are
/// skipped, and the URL-safe `-` and `_` read as `+` and `/`.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, ContentError> {
    let normalized: Vec<u8> = data
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| match b {
            b'-' => b'+',
            b'_' => b'/',
            other => other,
        })
        .collect();
    LENIENT_B64
        .decode(normalized)
        .map_err(|source| ContentError::Base64 {
            field: IMAGE_DATA_FIELD,
            source,
        })
}

pub fn image_content(image: ImageRequest) -> Result<ImageContent, ContentError> {
    let data = decode_image_data(&image.data)?;
    Ok(ImageContent {
        data,
        height: image.height,
        mime_type: image.mime_type,
        width: image.width,
    })
}

pub fn link_preview_content(preview: LinkPreviewRequest) -> Result<LinkPreviewContent, ContentError> {
    let image = preview.image.map(image_content).transpose()?;
    Ok(LinkPreviewContent {
        permanent_url: preview.permanent_url,
        url: preview.url,
        url_offset: preview.url_offset,
        title: preview.title,
        summary: preview.summary,
        tweet: preview.tweet,
        image,
    })
}

/// Decodes a 64 character hex digest into its 32 raw bytes.
pub fn decode_digest(digest: &str) -> Result<[u8; 32], ContentError> {
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(digest, &mut bytes).map_err(|source| ContentError::Digest {
        field: QUOTE_DIGEST_FIELD,
        source,
    })?;
    Ok(bytes)
}

pub fn quote_content(quote: QuoteRequest) -> Result<QuoteContent, ContentError> {
    Ok(QuoteContent {
        quoted_message_id: quote.quoted_message_id,
        quoted_message_sha256: decode_digest(&quote.quoted_message_sha256)?,
    })
}

/// Consumes the content part of a text request.
pub fn text_content(request: TextBody) -> Result<TextContent, ContentError> {
    let link_preview = request.link_preview.map(link_preview_content).transpose()?;
    let quote = request.quote.map(quote_content).transpose()?;
    Ok(TextContent {
        text: request.text,
        link_preview,
        mentions: request.mentions.unwrap_or_default(),
        quote,
        expects_read_confirmation: request.expects_read_confirmation,
    })
}

pub fn location_content(request: &LocationRequest) -> LocationContent {
    LocationContent {
        latitude: request.latitude,
        longitude: request.longitude,
        name: request.location_name.clone(),
        zoom: request.zoom,
        expects_read_confirmation: request.expects_read_confirmation,
    }
}

fn as_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&B64.encode(data))
}

fn as_hex<S: Serializer>(digest: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(digest))
}
