//! Channel abstraction for chat I/O.

pub mod cli;
pub mod command;

pub use cli::CliChannel;
pub use command::{ChatCommand, CommandParser};

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::dialog::Update;
use crate::error::ChannelError;

/// Stream of commands coming in from a channel.
pub type CommandStream = Pin<Box<dyn Stream<Item = ChatCommand> + Send>>;

/// A place users talk to the assistant through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin reading user input.
    async fn start(&self) -> Result<CommandStream, ChannelError>;

    /// Show one conversation update to the user.
    async fn render(&self, update: &Update) -> Result<(), ChannelError>;

    /// Show an out-of-band notice (help text, session dumps).
    async fn notice(&self, text: &str) -> Result<(), ChannelError>;
}
