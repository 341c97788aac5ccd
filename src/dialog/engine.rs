//! Dialog engine — turns one user event into the next session and the bot
//! replies to show.
//!
//! The engine never mutates the session it is given. Every call clones it,
//! applies the turn, and hands the result back in a [`Turn`] together with
//! the paced replies. Delivering those replies (immediately in tests, after
//! the typing pause in the runtime) is the caller's job.

use super::detector::{self, FlowGuess};
use super::message::{Message, PendingPrompt};
use super::session::{ExistingStage, FlowState, Session};
use crate::config::DialogConfig;
use crate::error::DialogError;
use crate::flows::{self, education, wedding, Input, Pause, Reply, StateDelta, StepContext};

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    /// Free text from the input box.
    Text(String),
    /// Token of a selected option.
    Option(String),
    /// A file was picked; only its display name matters.
    File(String),
}

/// Result of one user event.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Session after the event, user echo included, bot replies not yet.
    pub session: Session,
    /// Bot replies to append, in order.
    pub replies: Vec<Reply>,
    /// Set when the input could not be used at the current stage.
    pub rejected: Option<DialogError>,
}

impl Turn {
    fn accepted(session: Session, replies: Vec<Reply>) -> Self {
        Self {
            session,
            replies,
            rejected: None,
        }
    }

    fn rejected(session: Session, replies: Vec<Reply>, error: DialogError) -> Self {
        Self {
            session,
            replies,
            rejected: Some(error),
        }
    }

    /// Append every reply right away and return the resulting session.
    pub fn settle(self) -> Session {
        let mut session = self.session;
        for reply in self.replies {
            session.push(reply.message);
        }
        session
    }
}

/// Stateless orchestrator over the flow detector and transition tables.
#[derive(Debug, Clone, Default)]
pub struct DialogEngine {
    config: DialogConfig,
}

impl DialogEngine {
    pub fn new(config: DialogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DialogConfig {
        &self.config
    }

    /// A fresh, idle session with an empty log.
    pub fn start_session(&self) -> Session {
        let session = Session::new();
        tracing::debug!(session_id = %session.id, "Session started");
        session
    }

    pub fn handle(&self, session: &Session, event: UserEvent) -> Turn {
        match event {
            UserEvent::Text(text) => self.submit_text(session, &text),
            UserEvent::Option(value) => self.select_option(session, &value),
            UserEvent::File(name) => self.submit_file(session, &name),
        }
    }

    /// Free text. Picks a flow while none is active, otherwise feeds the
    /// active table. Text naming one of the pending options counts as
    /// selecting it.
    pub fn submit_text(&self, session: &Session, text: &str) -> Turn {
        let text = text.trim();
        if text.is_empty() {
            return Turn::accepted(session.clone(), Vec::new());
        }

        let prompt = session.pending_prompt();
        let mut next = session.clone();
        next.resolve_prompts();
        next.push(Message::user(text));

        if next.is_idle() {
            return self.detect_flow(next, text);
        }

        let input = match prompt.choice_for_text(text) {
            Some(choice) => Input::Choice(choice.value.clone()),
            None => Input::Text(text.to_string()),
        };
        self.route(next, input, &prompt)
    }

    /// A selected option. Tokens that are not currently offered are dropped
    /// without echo.
    pub fn select_option(&self, session: &Session, value: &str) -> Turn {
        let prompt = session.pending_prompt();
        let Some(choice) = prompt.choice(value).cloned() else {
            tracing::warn!(
                session_id = %session.id,
                stage = %session.state,
                value,
                "Ignoring option that is not on offer"
            );
            let error = DialogError::UnexpectedInputAtStep {
                stage: session.state.to_string(),
            };
            return Turn::rejected(session.clone(), Vec::new(), error);
        };

        let mut next = session.clone();
        next.resolve_prompts();
        next.push(Message::user(choice.label));
        self.route(next, Input::Choice(choice.value), &prompt)
    }

    /// A submitted file. Advances the document queue and, when it empties,
    /// lets the active table move on.
    pub fn submit_file(&self, session: &Session, display_name: &str) -> Turn {
        let mut next = session.clone();
        if !next.state.collects_documents() {
            // Echoed, but whatever the bot last asked is still open.
            next.push(Message::user(format!("Uploaded: {display_name}")));
            tracing::debug!(session_id = %next.id, stage = %next.state, "Upload outside document collection");
            return Turn::rejected(next, Vec::new(), DialogError::UploadWithNoPendingDocument);
        }

        next.resolve_prompts();
        next.push(Message::user(format!("Uploaded: {display_name}")));

        let dequeued = match next.documents.submit(display_name) {
            Ok(dequeued) => dequeued,
            Err(e) => {
                tracing::warn!(session_id = %next.id, error = %e, "Upload ignored");
                return Turn::rejected(next, Vec::new(), e);
            }
        };

        if !dequeued.just_completed {
            let follow = match dequeued.remaining.as_slice() {
                [last] => format!("Finally, please upload: {last}"),
                [head, ..] => format!("Next, please upload: {head}"),
                [] => String::new(),
            };
            let ack = Message::bot(format!("✅ Received: {}.\n{follow}", dequeued.received))
                .with_upload();
            return Turn::accepted(next, vec![Reply::typing(ack)]);
        }

        let ack = Reply::typing(Message::bot(
            "✅ All documents received successfully.\nVerifying your details...",
        ));
        let mut turn = self.route(next, Input::DocumentsComplete, &PendingPrompt::default());
        if let Some(first) = turn.replies.first_mut() {
            first.pause = Pause::FollowUp;
        }
        turn.replies.insert(0, ack);
        turn
    }

    fn detect_flow(&self, mut next: Session, text: &str) -> Turn {
        let guess = detector::detect(text);
        let greeting = match guess {
            FlowGuess::Education => {
                next.set_state(FlowState::Education(ExistingStage::CustomerType));
                education::SCRIPT.greeting_message()
            }
            FlowGuess::Wedding => {
                next.set_state(FlowState::Wedding(ExistingStage::CustomerType));
                wedding::SCRIPT.greeting_message()
            }
            FlowGuess::Undetermined => Message::bot(detector::FALLBACK_PROMPT),
        };
        tracing::info!(session_id = %next.id, ?guess, "Flow detection");
        Turn::accepted(next, vec![Reply::typing(greeting)])
    }

    fn route(&self, mut next: Session, input: Input, prompt: &PendingPrompt) -> Turn {
        let Some(table) = flows::table_for(next.flow()) else {
            let error = DialogError::UnexpectedInputAtStep {
                stage: next.state.to_string(),
            };
            return Turn::rejected(next, Vec::new(), error);
        };

        let ctx = StepContext {
            state: next.state,
            loan_amount: next.loan_amount,
            tenure: next.tenure,
            config: &self.config,
        };

        match table.advance(&ctx, input) {
            Ok(transition) => {
                let from = next.state;
                for delta in transition.deltas {
                    match delta {
                        StateDelta::SetLoanAmount(amount) => next.loan_amount = Some(amount),
                        StateDelta::SetTenure(tenure) => next.tenure = Some(tenure),
                        StateDelta::QueueDocuments(labels) => next.documents.initialize(labels),
                    }
                }
                next.set_state(transition.next);
                tracing::info!(
                    session_id = %next.id,
                    flow = %table.flow(),
                    from = %from,
                    to = %next.state,
                    replies = transition.replies.len(),
                    "Dialog transition"
                );
                Turn::accepted(next, transition.replies)
            }
            Err(error) => {
                tracing::warn!(session_id = %next.id, stage = %next.state, %error, "Input rejected");
                let replies = self.recover(&next, &error, prompt);
                Turn::rejected(next, replies, error)
            }
        }
    }

    /// Re-prompt after a rejected input. The session itself stays as it was.
    fn recover(&self, session: &Session, error: &DialogError, prompt: &PendingPrompt) -> Vec<Reply> {
        let message = match error {
            DialogError::InvalidAmountFormat { .. } => {
                Some(Message::bot("Please enter a valid amount like ₹2,00,000"))
            }
            DialogError::UnexpectedInputAtStep { .. } => match (&prompt.options, session.documents.head()) {
                (Some(options), _) => Some(
                    Message::bot("Please choose one of the options below.")
                        .with_options(options.clone()),
                ),
                (None, Some(head)) if session.state.collects_documents() => {
                    Some(Message::bot(format!("Please upload: {head}")).with_upload())
                }
                _ => None,
            },
            DialogError::EligibilityCeilingExceeded { .. }
            | DialogError::UploadWithNoPendingDocument => None,
        };
        message.map(Reply::typing).into_iter().collect()
    }
}
