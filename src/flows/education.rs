//! CFA / education loan flow.

use super::existing::{self, Script};
use super::{Input, StepContext, Transition, TransitionTable};
use crate::dialog::session::{Flow, FlowState};
use crate::error::DialogError;

pub static SCRIPT: Script = Script {
    greeting: "Dear Customer,\n\nWe truly understand how important professional education like the CFA program is for your career growth, and we’d be happy to assist you with the right personal loan solution to make the process smooth and stress-free.\n\nWe’d be happy to explore suitable personal loan options for you.\nTo begin, may I know if you’re an existing customer with us?",
    ask_pan: "Excellent! Please share your PAN card number for verification 😊",
    offer_details: "Welcome back!\n\nThank you for being one of our valued customers.\nWould you like me to share more details about Personal Loan options for education purposes?",
    ask_amount: "Great! Please mention the approximate amount you require for your CFA course (e.g. ₹2,00,000)",
    documents_intro: "Perfect! Please upload these documents one by one:",
    documents: &[
        "CFA course enrollment proof or fee receipt",
        "ABC (Academic Bank of Credits) Number",
        "Academic Marksheets (10th, 12th, UG & PG)",
    ],
    loan_purpose: "Personal Loan for CFA course",
    wrap: FlowState::Education,
};

/// Transitions for the education flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct EducationTable;

impl TransitionTable for EducationTable {
    fn flow(&self) -> Flow {
        Flow::Education
    }

    fn advance(&self, ctx: &StepContext<'_>, input: Input) -> Result<Transition, DialogError> {
        match ctx.state {
            FlowState::Education(stage) => existing::advance(&SCRIPT, stage, ctx, input),
            _ => Err(ctx.unexpected()),
        }
    }
}
