//! Chat commands — parses raw input lines from a channel.

use crate::dialog::{PendingPrompt, UserEvent};

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Free text for the conversation.
    Say(String),
    /// Pick a pending option by its 1-based number or its token.
    Pick(String),
    /// Submit a file by display name.
    Upload(String),
    /// Dump the session as JSON.
    ShowLog,
    Reset,
    Help,
    Quit,
}

/// Parses input lines into [`ChatCommand`]s.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(content: &str) -> ChatCommand {
        let trimmed = content.trim();
        let lower = trimmed.to_lowercase();

        match lower.as_str() {
            "/log" | "/session" => ChatCommand::ShowLog,
            "/reset" | "/restart" | "/new" => ChatCommand::Reset,
            "/help" | "/?" => ChatCommand::Help,
            "/quit" | "/exit" | "/close" => ChatCommand::Quit,
            _ => parse_with_argument(trimmed)
                .unwrap_or_else(|| ChatCommand::Say(trimmed.to_string())),
        }
    }
}

/// `/pick <n|token>` and `/upload <file name>`.
fn parse_with_argument(trimmed: &str) -> Option<ChatCommand> {
    let (command, argument) = trimmed.split_once(char::is_whitespace)?;
    // Only the command word is case-insensitive; the argument keeps its casing.
    let argument = argument.trim();
    if argument.is_empty() {
        return None;
    }
    match command.to_lowercase().as_str() {
        "/pick" | "/choose" => Some(ChatCommand::Pick(argument.to_string())),
        "/upload" | "/file" => Some(ChatCommand::Upload(argument.to_string())),
        _ => None,
    }
}

impl ChatCommand {
    /// Turn a conversational command into an engine event. A bare number
    /// while options are pending selects that option.
    pub fn into_event(self, prompt: &PendingPrompt) -> Option<UserEvent> {
        match self {
            ChatCommand::Say(text) => Some(
                pick_by_number(&text, prompt)
                    .map(UserEvent::Option)
                    .unwrap_or(UserEvent::Text(text)),
            ),
            ChatCommand::Pick(selector) => Some(UserEvent::Option(
                pick_by_number(&selector, prompt).unwrap_or(selector),
            )),
            ChatCommand::Upload(name) => Some(UserEvent::File(name)),
            ChatCommand::ShowLog | ChatCommand::Reset | ChatCommand::Help | ChatCommand::Quit => {
                None
            }
        }
    }
}

fn pick_by_number(selector: &str, prompt: &PendingPrompt) -> Option<String> {
    let options = prompt.options.as_ref()?;
    let index: usize = selector.trim().parse().ok()?;
    options
        .get(index.checked_sub(1)?)
        .map(|choice| choice.value.clone())
}

pub const HELP: &str = "\
Type a message to chat, e.g. \"I need a loan for my CFA course\".
  <n> or /pick <n>     choose option number n
  /upload <file name>  submit a document
  /log                 show the session as JSON
  /reset               start over
  /quit                leave";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::message::{yes_no, Choice};

    fn prompt_with(options: Vec<Choice>) -> PendingPrompt {
        PendingPrompt {
            options: Some(options),
            expects_file_upload: false,
        }
    }

    #[test]
    fn control_commands() {
        assert_eq!(CommandParser::parse("/log"), ChatCommand::ShowLog);
        assert_eq!(CommandParser::parse("  /RESET "), ChatCommand::Reset);
        assert_eq!(CommandParser::parse("/quit"), ChatCommand::Quit);
        assert_eq!(CommandParser::parse("/?"), ChatCommand::Help);
    }

    #[test]
    fn argument_commands_keep_case() {
        assert_eq!(
            CommandParser::parse("/upload Fee Receipt.PDF"),
            ChatCommand::Upload("Fee Receipt.PDF".into())
        );
        assert_eq!(
            CommandParser::parse("/pick 2"),
            ChatCommand::Pick("2".into())
        );
        assert_eq!(
            CommandParser::parse("/UPLOAD   İstanbul ID.png"),
            ChatCommand::Upload("İstanbul ID.png".into())
        );
        // KELVIN SIGN lowercases to a one-byte 'k'.
        assert_eq!(
            CommandParser::parse("/PIC\u{212A} 2"),
            ChatCommand::Pick("2".into())
        );
        // Missing argument falls back to plain text.
        assert_eq!(
            CommandParser::parse("/upload"),
            ChatCommand::Say("/upload".into())
        );
    }

    #[test]
    fn plain_text() {
        assert_eq!(
            CommandParser::parse("I need a CFA loan"),
            ChatCommand::Say("I need a CFA loan".into())
        );
    }

    #[test]
    fn numbers_select_pending_options() {
        let prompt = prompt_with(yes_no("Yes", "No"));
        assert_eq!(
            ChatCommand::Say("2".into()).into_event(&prompt),
            Some(UserEvent::Option("no".into()))
        );
        assert_eq!(
            ChatCommand::Pick("1".into()).into_event(&prompt),
            Some(UserEvent::Option("yes".into()))
        );
        assert_eq!(
            ChatCommand::Pick("yes".into()).into_event(&prompt),
            Some(UserEvent::Option("yes".into()))
        );
        // Out of range stays as typed.
        assert_eq!(
            ChatCommand::Say("3".into()).into_event(&prompt),
            Some(UserEvent::Text("3".into()))
        );
    }

    #[test]
    fn numbers_without_options_are_text() {
        assert_eq!(
            ChatCommand::Say("200000".into()).into_event(&PendingPrompt::default()),
            Some(UserEvent::Text("200000".into()))
        );
        assert_eq!(ChatCommand::Quit.into_event(&PendingPrompt::default()), None);
    }
}
