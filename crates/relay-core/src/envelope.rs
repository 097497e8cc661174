//! Response envelope: the JSON every command answers with.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::instance::Instance;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceReply {
    pub instance_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReply {
    pub instance_id: String,
    pub message_id: Uuid,
    pub name: String,
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    /// archive, mute, clear, delete, deleteEverywhere
    Instance(InstanceReply),
    /// sends and edits
    Message(MessageReply),
    /// getMessages: the bare list
    Messages(Vec<Value>),
}

impl CommandReply {
    pub fn instance(instance: Instance) -> Self {
        CommandReply::Instance(InstanceReply {
            instance_id: instance.id,
            name: instance.name,
        })
    }

    pub fn message(instance: Instance, message_id: Uuid) -> Self {
        CommandReply::Message(MessageReply {
            instance_id: instance.id,
            message_id,
            name: instance.name,
        })
    }

    pub fn message_id(&self) -> Option<Uuid> {
        match self {
            CommandReply::Message(reply) => Some(reply.message_id),
            _ => None,
        }
    }
}

/// Failure body. `stack` is only present for dispatch failures, and only when
/// diagnostics are exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorBody {
    pub fn from_error(err: &DispatchError, expose_diagnostics: bool) -> Self {
        let stack = match err {
            DispatchError::Dispatch { trace, .. } if expose_diagnostics => Some(trace.clone()),
            _ => None,
        };
        Self {
            error: err.to_string(),
            stack,
        }
    }
}
