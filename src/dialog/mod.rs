//! Dialog core — session state, flow detection, document queue, and the
//! engine that ties them to the transition tables.
//!
//! The engine is synchronous and pure per turn; the runtime adds pacing and
//! event ordering on top of it.

pub mod detector;
pub mod documents;
pub mod engine;
pub mod message;
pub mod runtime;
pub mod session;

pub use detector::{detect, FlowGuess};
pub use documents::{Dequeued, DocumentQueue};
pub use engine::{DialogEngine, Turn, UserEvent};
pub use message::{Choice, Message, PendingPrompt, Sender};
pub use runtime::{spawn_conversation, ConversationHandle, Update};
pub use session::{ExistingStage, Flow, FlowState, NewCustomerStage, Session, Stage};
