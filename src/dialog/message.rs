//! Chat message records shared with the renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// One selectable answer attached to a bot message.
///
/// `value` is the token fed back to the transition table; `label` is only
/// for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Whether free text typed by the user names this choice, either by its
    /// token or by its full label.
    pub fn matches_text(&self, text: &str) -> bool {
        let wanted = normalize(text);
        !wanted.is_empty() && (wanted == normalize(&self.value) || wanted == normalize(&self.label))
    }
}

/// Lower-case alphanumerics and spaces only, so "👉 Yes" and "yes" compare equal.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Mutually exclusive answers; cleared once the user responds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Choice>>,
    #[serde(default)]
    pub expects_file_upload: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::build(Sender::User, text.into())
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::build(Sender::Bot, text.into())
    }

    fn build(sender: Sender, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text,
            options: None,
            expects_file_upload: false,
            sent_at: Utc::now(),
        }
    }

    pub fn with_options(mut self, options: Vec<Choice>) -> Self {
        self.options = if options.is_empty() { None } else { Some(options) };
        self
    }

    pub fn with_upload(mut self) -> Self {
        self.expects_file_upload = true;
        self
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

/// What the renderer should offer below the latest bot message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPrompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Choice>>,
    #[serde(default)]
    pub expects_file_upload: bool,
}

impl PendingPrompt {
    pub fn is_empty(&self) -> bool {
        self.options.is_none() && !self.expects_file_upload
    }

    /// Find a pending choice by its token.
    pub fn choice(&self, value: &str) -> Option<&Choice> {
        self.options.as_ref()?.iter().find(|c| c.value == value)
    }

    /// Find a pending choice named by free text.
    pub fn choice_for_text(&self, text: &str) -> Option<&Choice> {
        self.options.as_ref()?.iter().find(|c| c.matches_text(text))
    }
}

/// The usual Yes/No pair.
pub fn yes_no(yes_label: &str, no_label: &str) -> Vec<Choice> {
    vec![Choice::new(yes_label, "yes"), Choice::new(no_label, "no")]
}
