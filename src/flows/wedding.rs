//! Wedding loan flow.

use super::existing::{self, Script};
use super::generic;
use super::{Input, StepContext, Transition, TransitionTable};
use crate::dialog::session::{Flow, FlowState};
use crate::error::DialogError;

pub static SCRIPT: Script = Script {
    greeting: "Dear Customer,\n\nThank you for reaching out and considering us for your financial needs. Congratulations on your upcoming wedding! 🎉\n\nWe’d be happy to explore suitable personal loan options for you.\nTo begin, may I know if you’re an existing customer with us?",
    ask_pan: "Great! Please share your PAN card number for verification.",
    offer_details: "Welcome back!\n\nThank you for being one of our valued customers.\nWould you like me to share more details about Personal Loan options for your wedding?",
    ask_amount: "Wonderful! Please mention the approximate amount you require for your wedding (e.g. ₹5,00,000)",
    documents_intro: "Perfect! Please upload these documents one by one:",
    documents: generic::DOCUMENTS,
    loan_purpose: "Personal Loan for your wedding",
    wrap: FlowState::Wedding,
};

/// Transitions for the wedding flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeddingTable;

impl TransitionTable for WeddingTable {
    fn flow(&self) -> Flow {
        Flow::Wedding
    }

    fn advance(&self, ctx: &StepContext<'_>, input: Input) -> Result<Transition, DialogError> {
        match ctx.state {
            FlowState::Wedding(stage) => existing::advance(&SCRIPT, stage, ctx, input),
            _ => Err(ctx.unexpected()),
        }
    }
}
