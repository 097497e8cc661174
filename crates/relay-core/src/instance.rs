//! The seam to the messaging client: instance lookup plus conversation actions.
//!
//! Sessions are created, owned and torn down elsewhere; the relay only reads
//! the registry and calls into the session of the instance a request names.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::content::{LocationContent, TextContent};
use crate::error::ClientError;
use crate::requests::ReactionType;

/// A named session bound to one messaging identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
}

/// Read-only view of the instance registry at call time.
pub trait InstanceLookup: Send + Sync {
    fn instance_exists(&self, instance_id: &str) -> bool;

    fn get_instance(&self, instance_id: &str) -> Option<Instance>;
}

/// Conversation operations of the messaging client. Sends return the id of
/// the message they produced.
#[async_trait]
pub trait ConversationClient: Send + Sync {
    async fn toggle_archive_conversation(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        archive: bool,
    ) -> Result<(), ClientError>;

    async fn toggle_mute_conversation(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        mute: bool,
    ) -> Result<(), ClientError>;

    async fn clear_conversation(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
    ) -> Result<(), ClientError>;

    async fn delete_message_local(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ClientError>;

    async fn delete_message_everyone(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ClientError>;

    /// `None` when the client holds nothing for the conversation.
    async fn get_messages(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
    ) -> Result<Option<Vec<Value>>, ClientError>;

    async fn send_location(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        location: LocationContent,
        message_timer: u64,
    ) -> Result<Uuid, ClientError>;

    async fn send_text(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        content: TextContent,
        message_timer: u64,
    ) -> Result<Uuid, ClientError>;

    async fn send_ping(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        expects_read_confirmation: bool,
        message_timer: u64,
    ) -> Result<Uuid, ClientError>;

    async fn send_reaction(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        original_message_id: Uuid,
        reaction: ReactionType,
    ) -> Result<Uuid, ClientError>;

    async fn send_edited_text(
        &self,
        instance_id: &str,
        conversation_id: Uuid,
        first_message_id: Uuid,
        content: TextContent,
    ) -> Result<Uuid, ClientError>;
}

/// Anything that can both resolve instances and act on their conversations.
pub trait InstanceService: InstanceLookup + ConversationClient {}

impl<T: InstanceLookup + ConversationClient + ?Sized> InstanceService for T {}
