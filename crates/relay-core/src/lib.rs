//! Relay core library.
//! Command validation, content transformation and dispatch to messaging instances.

pub mod command;
pub mod content;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod instance;
pub mod local;
pub mod requests;
pub mod schema;

pub use command::Command;
pub use dispatcher::Dispatcher;
pub use envelope::{CommandReply, ErrorBody};
pub use error::{ClientError, ContentError, DispatchError, DispatchResult, ValidationError};
pub use instance::{ConversationClient, Instance, InstanceLookup, InstanceService};
pub use local::LocalInstanceService;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
