//! Loopback client: an in-memory instance registry whose sessions keep their
//! conversations in process.
//!
//! Backs the gateway when no remote messaging client is wired in, and serves
//! as the reference implementation of [`InstanceLookup`] + [`ConversationClient`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::content::{LocationContent, TextContent};
use crate::error::ClientError;
use crate::instance::{ConversationClient, Instance, InstanceLookup};
use crate::requests::ReactionType;

/// What a stored message carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessagePayload {
    Text(TextContent),
    Location(LocationContent),
    Ping {
        #[serde(rename = "expectsReadConfirmation")]
        expects_read_confirmation: bool,
    },
    Reaction {
        #[serde(rename = "originalMessageId")]
        original_message_id: Uuid,
        reaction: ReactionType,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: Uuid,
    /// Id of the first version; equals `id` until the message is edited.
    pub first_message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message_timer: u64,
    pub payload: MessagePayload,
}

#[derive(Debug, Default)]
struct ConversationState {
    archived: bool,
    muted: bool,
    messages: Vec<StoredMessage>,
}

#[derive(Debug)]
struct LocalSession {
    name: String,
    conversations: HashMap<Uuid, ConversationState>,
}

/// In-memory registry of loopback sessions.
#[derive(Debug, Default)]
pub struct LocalInstanceService {
    sessions: DashMap<String, LocalSession>,
}

impl LocalInstanceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or renames) an instance. Existing conversations are kept.
    pub fn register_instance(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        debug!(instance_id = %id, %name, "registering loopback instance");
        self.sessions
            .entry(id)
            .and_modify(|session| session.name = name.clone())
            .or_insert_with(|| LocalSession {
                name,
                conversations: HashMap::new(),
            });
    }

    pub fn remove_instance(&self, id: &str) -> Option<Instance> {
        self.sessions.remove(id).map(|(id, session)| Instance {
            id,
            name: session.name,
        })
    }

    pub fn instances(&self) -> Vec<Instance> {
        let mut all: Vec<Instance> = self
            .sessions
            .iter()
            .map(|entry| Instance {
                id: entry.key().clone(),
                name: entry.value().name.clone(),
            })
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// `None` when the instance or conversation is unknown.
    pub fn is_archived(&self, instance_id: &str, conversation_id: Uuid) -> Option<bool> {
        self.read(instance_id, conversation_id, |c| c.archived)
    }

    pub fn is_muted(&self, instance_id: &str, conversation_id: Uuid) -> Option<bool> {
        self.read(instance_id, conversation_id, |c| c.muted)
    }

    pub fn messages(&self, instance_id: &str, conversation_id: Uuid) -> Option<Vec<StoredMessage>> {
        self.read(instance_id, conversation_id, |c| c.messages.clone())
    }

    fn read<T>(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        f: impl FnOnce(&ConversationState) -> T,
    ) -> Option<T> {
        let session = self.sessions.get(instance_id)?;
        session.conversations.get(&conversation_id).map(f)
    }

    /// Runs `f` on the conversation, creating it on first touch.
    fn with_conversation<T>(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        f: impl FnOnce(&mut ConversationState) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut session = self
            .sessions
            .get_mut(instance_id)
            .ok_or_else(|| ClientError::UnknownInstance(instance_id.to_string()))?;
        f(session.conversations.entry(conversation_id).or_default())
    }

    /// Like `with_conversation`, but never creates the conversation; fails with
    /// `missing` when it does not exist yet.
    fn with_existing_conversation<T>(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        missing: ClientError,
        f: impl FnOnce(&mut ConversationState) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut session = self
            .sessions
            .get_mut(instance_id)
            .ok_or_else(|| ClientError::UnknownInstance(instance_id.to_string()))?;
        match session.conversations.get_mut(&conversation_id) {
            Some(conversation) => f(conversation),
            None => Err(missing),
        }
    }

    fn append(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        message_timer: u64,
        payload: MessagePayload,
    ) -> Result<Uuid, ClientError> {
        let id = Uuid::new_v4();
        self.with_conversation(instance_id, conversation_id, |conversation| {
            conversation.messages.push(StoredMessage {
                id,
                first_message_id: id,
                timestamp: Utc::now(),
                message_timer,
                payload,
            });
            Ok(id)
        })
    }

    fn remove_message(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ClientError> {
        let not_found = || ClientError::MessageNotFound {
            conversation_id,
            message_id,
        };
        self.with_existing_conversation(instance_id, conversation_id, not_found(), |conversation| {
            let before = conversation.messages.len();
            conversation.messages.retain(|m| m.id != message_id);
            if conversation.messages.len() == before {
                return Err(not_found());
            }
            Ok(())
        })
    }
}

impl InstanceLookup for LocalInstanceService {
    fn instance_exists(&self, instance_id: &str) -> bool {
        self.sessions.contains_key(instance_id)
    }

    fn get_instance(&self, instance_id: &str) -> Option<Instance> {
        self.sessions.get(instance_id).map(|session| Instance {
            id: instance_id.to_string(),
            name: session.name.clone(),
        })
    }
}

#[async_trait]
impl ConversationClient for LocalInstanceService {
    async fn toggle_archive_conversation(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        archive: bool,
    ) -> Result<(), ClientError> {
        self.with_conversation(instance_id, conversation_id, |c| {
            c.archived = archive;
            Ok(())
        })
    }

    async fn toggle_mute_conversation(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        mute: bool,
    ) -> Result<(), ClientError> {
        self.with_conversation(instance_id, conversation_id, |c| {
            c.muted = mute;
            Ok(())
        })
    }

    async fn clear_conversation(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
    ) -> Result<(), ClientError> {
        self.with_conversation(instance_id, conversation_id, |c| {
            c.messages.clear();
            Ok(())
        })
    }

    async fn delete_message_local(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ClientError> {
        self.remove_message(instance_id, conversation_id, message_id)
    }

    // A loopback session has no other participants, so both deletions look alike.
    async fn delete_message_everyone(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ClientError> {
        self.remove_message(instance_id, conversation_id, message_id)
    }

    async fn get_messages(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
    ) -> Result<Option<Vec<Value>>, ClientError> {
        if !self.instance_exists(instance_id) {
            return Err(ClientError::UnknownInstance(instance_id.to_string()));
        }
        let Some(messages) = self.messages(instance_id, conversation_id) else {
            return Ok(None);
        };
        messages
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(|err| ClientError::remote_with_source("could not serialize messages", err))
    }

    async fn send_location(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        location: LocationContent,
        message_timer: u64,
    ) -> Result<Uuid, ClientError> {
        self.append(
            instance_id,
            conversation_id,
            message_timer,
            MessagePayload::Location(location),
        )
    }

    async fn send_text(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        content: TextContent,
        message_timer: u64,
    ) -> Result<Uuid, ClientError> {
        self.append(
            instance_id,
            conversation_id,
            message_timer,
            MessagePayload::Text(content),
        )
    }

    async fn send_ping(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        expects_read_confirmation: bool,
        message_timer: u64,
    ) -> Result<Uuid, ClientError> {
        self.append(
            instance_id,
            conversation_id,
            message_timer,
            MessagePayload::Ping {
                expects_read_confirmation,
            },
        )
    }

    async fn send_reaction(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        original_message_id: Uuid,
        reaction: ReactionType,
    ) -> Result<Uuid, ClientError> {
        self.append(
            instance_id,
            conversation_id,
            0,
            MessagePayload::Reaction {
                original_message_id,
                reaction,
            },
        )
    }

    async fn send_edited_text(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        first_message_id: Uuid,
        content: TextContent,
    ) -> Result<Uuid, ClientError> {
        let id = Uuid::new_v4();
        let not_found = || ClientError::MessageNotFound {
            conversation_id,
            message_id: first_message_id,
        };
        self.with_existing_conversation(instance_id, conversation_id, not_found(), |conversation| {
            let message = conversation
                .messages
                .iter_mut()
                .find(|m| m.first_message_id == first_message_id || m.id == first_message_id)
                .ok_or_else(not_found)?;
            message.id = id;
            message.timestamp = Utc::now();
            message.payload = MessagePayload::Text(content);
            Ok(id)
        })
    }
}
