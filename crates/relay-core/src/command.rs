//! The supported conversation actions and the descriptor each one validates against.

use std::fmt;

use crate::schema::{self, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Archive,
    Mute,
    Clear,
    Delete,
    DeleteEverywhere,
    GetMessages,
    SendLocation,
    SendText,
    SendPing,
    SendReaction,
    UpdateText,
}

impl Command {
    pub const ALL: [Command; 11] = [
        Command::Archive,
        Command::Mute,
        Command::Clear,
        Command::Delete,
        Command::DeleteEverywhere,
        Command::GetMessages,
        Command::SendLocation,
        Command::SendText,
        Command::SendPing,
        Command::SendReaction,
        Command::UpdateText,
    ];

    /// Last path segment of the command's route.
    pub fn route(self) -> &'static str {
        match self {
            Command::Archive => "archive",
            Command::Mute => "mute",
            Command::Clear => "clear",
            Command::Delete => "delete",
            Command::DeleteEverywhere => "deleteEverywhere",
            Command::GetMessages => "getMessages",
            Command::SendLocation => "sendLocation",
            Command::SendText => "sendText",
            Command::SendPing => "sendPing",
            Command::SendReaction => "sendReaction",
            Command::UpdateText => "updateText",
        }
    }

    pub fn from_route(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.route() == segment)
    }

    pub fn schema(self) -> Schema {
        match self {
            Command::Archive => schema::ARCHIVE,
            Command::Mute => schema::MUTE,
            Command::Clear | Command::GetMessages => schema::CONVERSATION,
            Command::Delete | Command::DeleteEverywhere => schema::DELETION,
            Command::SendLocation => schema::LOCATION,
            Command::SendText => schema::TEXT,
            Command::SendPing => schema::PING,
            Command::SendReaction => schema::REACTION,
            Command::UpdateText => schema::MESSAGE_UPDATE,
        }
    }

    /// True for commands whose reply carries a new message id.
    pub fn produces_message(self) -> bool {
        matches!(
            self,
            Command::SendLocation
                | Command::SendText
                | Command::SendPing
                | Command::SendReaction
                | Command::UpdateText
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}
