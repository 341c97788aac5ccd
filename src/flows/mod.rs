//! Step transition tables — one per loan flow.
//!
//! A table is a pure function from the current stage and one input to the
//! next stage, the bot replies to show, and the state changes to apply. The
//! dialog engine owns the session and applies the result.

pub mod education;
pub mod existing;
pub mod generic;
pub mod wedding;

pub use education::EducationTable;
pub use generic::GenericTable;
pub use wedding::WeddingTable;

use crate::config::DialogConfig;
use crate::dialog::message::{Choice, Message};
use crate::dialog::session::{Flow, FlowState};
use crate::emi::{format_rupees, LoanSummary, Tenure, ANNUAL_RATE_PERCENT};
use crate::error::DialogError;

/// What the user did, as seen by a transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Free text typed by the user.
    Text(String),
    /// Token of a selected option.
    Choice(String),
    /// Synthetic: the document queue just emptied.
    DocumentsComplete,
}

/// How long the runtime waits before showing a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    Typing,
    FollowUp,
}

/// A bot message plus its pacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub message: Message,
    pub pause: Pause,
}

impl Reply {
    pub fn typing(message: Message) -> Self {
        Self {
            message,
            pause: Pause::Typing,
        }
    }

    pub fn follow_up(message: Message) -> Self {
        Self {
            message,
            pause: Pause::FollowUp,
        }
    }
}

/// Session fields a transition may change besides the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateDelta {
    SetLoanAmount(u64),
    SetTenure(Tenure),
    QueueDocuments(Vec<String>),
}

/// Result of advancing a table by one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: FlowState,
    pub replies: Vec<Reply>,
    pub deltas: Vec<StateDelta>,
}

impl Transition {
    pub fn to(next: FlowState) -> Self {
        Self {
            next,
            replies: Vec::new(),
            deltas: Vec::new(),
        }
    }

    /// End the flow; the session goes back to idle.
    pub fn finish() -> Self {
        Self::to(FlowState::Undetermined)
    }

    pub fn say(mut self, message: Message) -> Self {
        self.replies.push(Reply::typing(message));
        self
    }

    pub fn with_replies(mut self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.extend(replies);
        self
    }

    pub fn with_delta(mut self, delta: StateDelta) -> Self {
        self.deltas.push(delta);
        self
    }
}

/// Read-only view of the session handed to a table.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub state: FlowState,
    pub loan_amount: Option<u64>,
    pub tenure: Option<Tenure>,
    pub config: &'a DialogConfig,
}

impl StepContext<'_> {
    pub fn unexpected(&self) -> DialogError {
        DialogError::UnexpectedInputAtStep {
            stage: self.state.to_string(),
        }
    }

    /// Loan amount captured earlier in the flow.
    pub fn amount(&self) -> Result<u64, DialogError> {
        self.loan_amount.ok_or_else(|| self.unexpected())
    }
}

/// One flow's transition rules.
pub trait TransitionTable: Send + Sync {
    fn flow(&self) -> Flow;

    fn advance(&self, ctx: &StepContext<'_>, input: Input) -> Result<Transition, DialogError>;
}

static EDUCATION: EducationTable = EducationTable;
static WEDDING: WeddingTable = WeddingTable;
static GENERIC: GenericTable = GenericTable;

/// The table driving `flow`, if a flow is active.
pub fn table_for(flow: Flow) -> Option<&'static dyn TransitionTable> {
    match flow {
        Flow::Undetermined => None,
        Flow::Education => Some(&EDUCATION),
        Flow::Wedding => Some(&WEDDING),
        Flow::GenericNew => Some(&GENERIC),
    }
}

/// Read an amount by dropping every non-digit: "₹2,00,000" → 200000.
pub fn parse_amount(text: &str) -> Result<u64, DialogError> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u64>() {
        Ok(amount) if amount > 0 => Ok(amount),
        _ => Err(DialogError::InvalidAmountFormat {
            input: text.to_string(),
        }),
    }
}

/// Pass `amount` through unless it is above `ceiling`.
pub fn check_ceiling(amount: u64, ceiling: u64) -> Result<u64, DialogError> {
    if amount > ceiling {
        Err(DialogError::EligibilityCeilingExceeded {
            requested: amount,
            ceiling,
        })
    } else {
        Ok(amount)
    }
}

pub(crate) fn tenure_options() -> Vec<Choice> {
    Tenure::ALL
        .iter()
        .map(|t| Choice::new(t.label(), t.years().to_string()))
        .collect()
}

pub(crate) fn tenure_from(input: &Input) -> Option<Tenure> {
    match input {
        Input::Choice(value) => value.parse().ok(),
        _ => None,
    }
}

/// Bulleted upload instructions followed by the first upload prompt.
pub(crate) fn document_request(intro: &str, documents: &[&str]) -> Message {
    const MARKERS: [&str; 3] = ["1️⃣", "2️⃣", "3️⃣"];
    let list = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| match MARKERS.get(i) {
            Some(marker) => format!("{marker} {doc}"),
            None => format!("• {doc}"),
        })
        .collect::<Vec<_>>()
        .join("\n");
    Message::bot(format!("{intro}\n{list}")).with_upload()
}

pub(crate) fn summary_message(summary: &LoanSummary) -> Message {
    Message::bot(format!(
        "Here’s your personalized loan summary:\n\
         • Loan Amount: {}\n\
         • Tenure: {} months ({})\n\
         • Interest Rate: {}% p.a.\n\
         • EMI: {}/month\n\
         • Processing Fee: {}\n\n\
         Would you like to proceed?",
        format_rupees(summary.amount),
        summary.tenure.months(),
        summary.tenure.label(),
        ANNUAL_RATE_PERCENT,
        format_rupees(summary.emi),
        format_rupees(summary.processing_fee),
    ))
    .with_options(vec![
        Choice::new("✅ Yes, proceed", "yes"),
        Choice::new("⏳ Maybe later", "no"),
    ])
}

/// Sanction notice plus the delayed formal letter.
pub(crate) fn sanction_replies(summary: &LoanSummary, purpose: &str) -> [Reply; 2] {
    let notice = Message::bot(format!(
        "🎉 Wonderful! Your loan has been sanctioned successfully.\n\
         • Loan: {}\n\
         • Tenure: {} months ({})\n\
         • Rate: {}% p.a.\n\
         • EMI: {}/month\n\n\
         You’ll receive your sanction letter shortly on email.",
        format_rupees(summary.amount),
        summary.tenure.months(),
        summary.tenure.label(),
        ANNUAL_RATE_PERCENT,
        format_rupees(summary.emi),
    ));
    let letter = Message::bot(format!(
        "Dear Customer,\n\
         We’re pleased to inform you that your {purpose} has been sanctioned successfully.\n\
         Please check your registered email for your official Loan Sanction Letter.\n\n\
         Warm regards,\nCustomer Relationship Team"
    ));
    [Reply::typing(notice), Reply::follow_up(letter)]
}

pub(crate) const RESUME_LATER: &str = "Alright! You can resume anytime later 😊";
