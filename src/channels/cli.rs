//! CLI channel — stdin/stdout REPL.

use std::io::Write;

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, ChatCommand, CommandParser, CommandStream};
use crate::dialog::{Message, Sender, Update};
use crate::error::ChannelError;

/// Reads commands from stdin and prints the conversation to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Terminal rendering of one message, options and upload hint included.
pub fn format_message(message: &Message) -> String {
    let who = match message.sender {
        Sender::Bot => "🏦",
        Sender::User => "🙂",
    };
    let mut out = format!("{who} {}", message.text.replace('\n', "\n   "));
    if let Some(options) = &message.options {
        for (i, choice) in options.iter().enumerate() {
            out.push_str(&format!("\n   [{}] {}", i + 1, choice.label));
        }
    }
    if message.expects_file_upload {
        out.push_str("\n   📎 /upload <file name>");
    }
    out
}

/// Print `text` set off by blank lines, then re-show the prompt.
fn write_block(text: &str) -> Result<(), ChannelError> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "\n{text}\n")?;
    out.flush()?;
    eprint!("> ");
    Ok(())
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<CommandStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<ChatCommand>();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if tx.send(CommandParser::parse(&line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        // EOF
                        let _ = tx.send(ChatCommand::Quit);
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|cmd| (cmd, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn render(&self, update: &Update) -> Result<(), ChannelError> {
        match update {
            // The user already sees what they typed.
            Update::Appended(message) if message.sender == Sender::User => {}
            Update::Appended(message) => write_block(&format_message(message))?,
            Update::Reset { .. } => write_block("— new conversation —")?,
            Update::PromptsResolved | Update::Closed => {}
        }
        Ok(())
    }

    async fn notice(&self, text: &str) -> Result<(), ChannelError> {
        write_block(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::message::yes_no;

    #[test]
    fn renders_options_and_upload_hint() {
        let msg = Message::bot("Pick one\nplease").with_options(yes_no("👉 Yes", "❌ No"));
        let out = format_message(&msg);
        assert!(out.starts_with("🏦 Pick one\n   please"));
        assert!(out.contains("[1] 👉 Yes"));
        assert!(out.contains("[2] ❌ No"));

        let upload = format_message(&Message::bot("Send it").with_upload());
        assert!(upload.contains("/upload"));
    }

    #[test]
    fn user_messages_are_marked() {
        assert!(format_message(&Message::user("hi")).starts_with("🙂 hi"));
    }
}
