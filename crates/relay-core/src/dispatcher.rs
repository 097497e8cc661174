//! Command dispatcher: validate → look up instance → transform → call client → reply.
//!
//! Every command runs the same template. Validation failures never reach the
//! registry, unknown instances never reach the transformer, and only the client
//! call itself can produce a dispatch failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::command::Command;
use crate::content;
use crate::envelope::CommandReply;
use crate::error::{DispatchError, DispatchResult, ValidationError};
use crate::instance::{Instance, InstanceService};
use crate::requests::{
    ArchiveRequest, DeletionRequest, LocationRequest, MessageRequest, MessageUpdateRequest,
    MuteRequest, PingRequest, ReactionRequest, TextRequest,
};
use crate::schema;

/// Routes validated commands to the instance they name.
pub struct Dispatcher {
    service: Arc<dyn InstanceService>,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn InstanceService>) -> Self {
        Self { service }
    }

    /// Runs one command to completion. Each call is independent; ordering
    /// between concurrent calls is up to the client.
    #[instrument(skip(self, body), fields(command = %command))]
    pub async fn dispatch(
        &self,
        command: Command,
        instance_id: &str,
        body: Value,
    ) -> DispatchResult<CommandReply> {
        let result = self.run(command, instance_id, body).await;
        match &result {
            Ok(reply) => match reply.message_id() {
                Some(message_id) => info!(%message_id, "command dispatched"),
                None => info!("command dispatched"),
            },
            Err(DispatchError::Validation(err)) => warn!(field = err.path(), "validation failed: {}", err),
            Err(DispatchError::InstanceNotFound(_)) => warn!("unknown instance"),
            Err(DispatchError::Dispatch { message, .. }) => error!("client call failed: {}", message),
        }
        result
    }

    async fn run(
        &self,
        command: Command,
        instance_id: &str,
        body: Value,
    ) -> DispatchResult<CommandReply> {
        let body = schema::validate(command.schema(), body)?;
        let instance = self.lookup(instance_id)?;
        self.execute(command, instance, body).await
    }

    fn lookup(&self, instance_id: &str) -> DispatchResult<Instance> {
        if !self.service.instance_exists(instance_id) {
            return Err(DispatchError::InstanceNotFound(instance_id.to_string()));
        }
        self.service
            .get_instance(instance_id)
            .ok_or_else(|| DispatchError::InstanceNotFound(instance_id.to_string()))
    }

    async fn execute(
        &self,
        command: Command,
        instance: Instance,
        body: Value,
    ) -> DispatchResult<CommandReply> {
        let client = self.service.as_ref();
        let id = instance.id.as_str();

        match command {
            Command::Archive => {
                let req: ArchiveRequest = parse(body)?;
                client
                    .toggle_archive_conversation(id, req.conversation_id, req.archive)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::instance(instance))
            }
            Command::Mute => {
                let req: MuteRequest = parse(body)?;
                client
                    .toggle_mute_conversation(id, req.conversation_id, req.mute)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::instance(instance))
            }
            Command::Clear => {
                let req: MessageRequest = parse(body)?;
                client
                    .clear_conversation(id, req.conversation_id)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::instance(instance))
            }
            Command::Delete => {
                let req: DeletionRequest = parse(body)?;
                client
                    .delete_message_local(id, req.conversation_id, req.message_id)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::instance(instance))
            }
            Command::DeleteEverywhere => {
                let req: DeletionRequest = parse(body)?;
                client
                    .delete_message_everyone(id, req.conversation_id, req.message_id)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::instance(instance))
            }
            Command::GetMessages => {
                let req: MessageRequest = parse(body)?;
                let messages = client
                    .get_messages(id, req.conversation_id)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::Messages(messages.unwrap_or_default()))
            }
            Command::SendLocation => {
                let req: LocationRequest = parse(body)?;
                let location = content::location_content(&req);
                let message_id = client
                    .send_location(id, req.conversation_id, location, req.message_timer)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::message(instance, message_id))
            }
            Command::SendText => {
                let req: TextRequest = parse(body)?;
                let text = content::text_content(req.body)?;
                let message_id = client
                    .send_text(id, req.conversation_id, text, req.message_timer)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::message(instance, message_id))
            }
            Command::SendPing => {
                let req: PingRequest = parse(body)?;
                let message_id = client
                    .send_ping(
                        id,
                        req.conversation_id,
                        req.expects_read_confirmation,
                        req.message_timer,
                    )
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::message(instance, message_id))
            }
            Command::SendReaction => {
                let req: ReactionRequest = parse(body)?;
                let message_id = client
                    .send_reaction(id, req.conversation_id, req.original_message_id, req.reaction)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::message(instance, message_id))
            }
            Command::UpdateText => {
                let req: MessageUpdateRequest = parse(body)?;
                let text = content::text_content(req.body)?;
                let message_id = client
                    .send_edited_text(id, req.conversation_id, req.first_message_id, text)
                    .await
                    .map_err(DispatchError::from_client)?;
                Ok(CommandReply::message(instance, message_id))
            }
        }
    }
}

/// Validated bodies can still overflow the typed fields (e.g. a width past `u32`).
fn parse<T: DeserializeOwned>(body: Value) -> Result<T, ValidationError> {
    serde_json::from_value(body).map_err(|err| ValidationError::Malformed {
        path: "value".to_string(),
        reason: format!("could not be read: {err}"),
    })
}
