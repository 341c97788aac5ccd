//! Session state — one record per conversation, replaced wholesale each turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::documents::DocumentQueue;
use super::message::{Message, PendingPrompt};
use crate::emi::Tenure;

/// Which scripted branch the conversation is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Undetermined,
    Education,
    Wedding,
    GenericNew,
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Undetermined => "undetermined",
            Self::Education => "education",
            Self::Wedding => "wedding",
            Self::GenericNew => "generic_new",
        };
        write!(f, "{s}")
    }
}

/// Stages of the existing-customer path shared by the education and
/// wedding flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingStage {
    CustomerType,
    Pan,
    Interest,
    Amount,
    Tenure,
    Proceed,
    Documents,
    Sanction,
}

/// Stages of the new-customer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewCustomerStage {
    Amount,
    Documents,
    CappedOffer,
    Tenure,
    Proceed,
}

/// Flow and stage together, so a stage can never exist without its flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow", content = "stage", rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Undetermined,
    Education(ExistingStage),
    Wedding(ExistingStage),
    GenericNew(NewCustomerStage),
}

/// Flow-independent view of the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Existing(ExistingStage),
    NewCustomer(NewCustomerStage),
}

impl FlowState {
    pub fn flow(&self) -> Flow {
        match self {
            Self::Undetermined => Flow::Undetermined,
            Self::Education(_) => Flow::Education,
            Self::Wedding(_) => Flow::Wedding,
            Self::GenericNew(_) => Flow::GenericNew,
        }
    }

    pub fn stage(&self) -> Stage {
        match *self {
            Self::Undetermined => Stage::Idle,
            Self::Education(s) | Self::Wedding(s) => Stage::Existing(s),
            Self::GenericNew(s) => Stage::NewCustomer(s),
        }
    }

    /// Whether uploads are accepted at this stage.
    pub fn collects_documents(&self) -> bool {
        matches!(
            self.stage(),
            Stage::Existing(ExistingStage::Documents)
                | Stage::NewCustomer(NewCustomerStage::Documents)
        )
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stage() {
            Stage::Idle => write!(f, "idle"),
            Stage::Existing(s) => write!(f, "{}/{s:?}", self.flow()),
            Stage::NewCustomer(s) => write!(f, "{}/{s:?}", self.flow()),
        }
    }
}

/// One conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub state: FlowState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenure: Option<Tenure>,
    #[serde(default)]
    pub documents: DocumentQueue,
    pub messages: Vec<Message>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: FlowState::Undetermined,
            loan_amount: None,
            tenure: None,
            documents: DocumentQueue::default(),
            messages: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn flow(&self) -> Flow {
        self.state.flow()
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn is_idle(&self) -> bool {
        self.state == FlowState::Undetermined
    }

    /// Move to `state`. Going back to `Undetermined` drops every loan detail.
    pub fn set_state(&mut self, state: FlowState) {
        self.state = state;
        if state == FlowState::Undetermined {
            self.loan_amount = None;
            self.tenure = None;
            self.documents.clear();
        }
    }

    /// The message log, oldest first.
    pub fn current_log(&self) -> &[Message] {
        &self.messages
    }

    /// Options and upload flag of the latest bot message.
    pub fn pending_prompt(&self) -> PendingPrompt {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_bot())
            .map(|m| PendingPrompt {
                options: m.options.clone(),
                expects_file_upload: m.expects_file_upload,
            })
            .unwrap_or_default()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Prompts are one-shot: once the user answers, no earlier message keeps
    /// its options or upload request.
    pub(crate) fn resolve_prompts(&mut self) {
        for message in &mut self.messages {
            message.options = None;
            message.expects_file_upload = false;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::message::{yes_no, Message};

    #[test]
    fn new_session_is_idle() {
        let s = Session::new();
        assert_eq!(s.flow(), Flow::Undetermined);
        assert_eq!(s.stage(), Stage::Idle);
        assert!(s.current_log().is_empty());
        assert!(s.pending_prompt().is_empty());
    }

    #[test]
    fn reset_clears_loan_details() {
        let mut s = Session::new();
        s.set_state(FlowState::Education(ExistingStage::Documents));
        s.loan_amount = Some(200_000);
        s.tenure = Some(Tenure::Two);
        s.documents.initialize(["a", "b"]);

        s.set_state(FlowState::Undetermined);
        assert!(s.loan_amount.is_none());
        assert!(s.tenure.is_none());
        assert!(s.documents.is_empty());
        assert!(s.is_idle());
    }

    #[test]
    fn pending_prompt_reads_last_bot_message() {
        let mut s = Session::new();
        s.push(Message::bot("pick").with_options(yes_no("Yes", "No")));
        s.push(Message::user("hmm"));
        assert_eq!(s.pending_prompt().options.map(|o| o.len()), Some(2));

        s.resolve_prompts();
        assert!(s.pending_prompt().is_empty());

        s.push(Message::bot("upload").with_upload());
        assert!(s.pending_prompt().expects_file_upload);

        s.resolve_prompts();
        assert!(s.pending_prompt().is_empty());
        assert!(s.messages.iter().all(|m| !m.expects_file_upload));
    }

    #[test]
    fn stage_views() {
        let state = FlowState::Wedding(ExistingStage::Documents);
        assert_eq!(state.flow(), Flow::Wedding);
        assert_eq!(state.stage(), Stage::Existing(ExistingStage::Documents));
        assert!(state.collects_documents());
        assert!(!FlowState::GenericNew(NewCustomerStage::Tenure).collects_documents());
        assert_eq!(FlowState::Undetermined.to_string(), "idle");
        assert_eq!(
            FlowState::GenericNew(NewCustomerStage::CappedOffer).to_string(),
            "generic_new/CappedOffer"
        );
    }

    #[test]
    fn flow_state_serde() {
        let json = serde_json::to_value(FlowState::Education(ExistingStage::Pan)).unwrap();
        assert_eq!(json, serde_json::json!({"flow": "education", "stage": "pan"}));
        let idle = serde_json::to_value(FlowState::Undetermined).unwrap();
        assert_eq!(idle, serde_json::json!({"flow": "undetermined"}));
    }

    #[test]
    fn display_matches_serde() {
        for flow in [Flow::Undetermined, Flow::Education, Flow::Wedding, Flow::GenericNew] {
            let json = serde_json::to_string(&flow).unwrap();
            assert_eq!(format!("\"{flow}\""), json);
        }
    }
}
