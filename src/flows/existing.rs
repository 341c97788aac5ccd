//! Existing-customer stage machine shared by the education and wedding flows.
//!
//! Greeting → PAN → interest → amount (hard ceiling) → tenure → summary →
//! documents → approval in principle → sanction. Saying "No" at the greeting
//! hands the conversation to the new-customer flow.

use super::{
    check_ceiling, document_request, sanction_replies, summary_message, tenure_from,
    tenure_options, Input, StateDelta, StepContext, Transition, RESUME_LATER,
};
use crate::dialog::message::{yes_no, Choice, Message};
use crate::dialog::session::{ExistingStage, FlowState, NewCustomerStage};
use crate::emi::{format_rupees, LoanSummary};
use crate::error::DialogError;

/// The flow-specific wording and documents.
#[derive(Debug)]
pub struct Script {
    pub greeting: &'static str,
    pub ask_pan: &'static str,
    pub offer_details: &'static str,
    pub ask_amount: &'static str,
    pub documents_intro: &'static str,
    pub documents: &'static [&'static str],
    /// Used in the formal sanction letter, e.g. "Personal Loan for CFA course".
    pub loan_purpose: &'static str,
    pub wrap: fn(ExistingStage) -> FlowState,
}

impl Script {
    /// First message of the flow, asking whether the user already banks with us.
    pub fn greeting_message(&self) -> Message {
        Message::bot(self.greeting).with_options(yes_no("👉 Yes", "❌ No"))
    }
}

pub(crate) const NEW_CUSTOMER_WELCOME: &str = "That’s perfectly fine! Welcome aboard. 😊\nTo check your eligibility, please tell me the loan amount you need (e.g. ₹5,00,000).";

pub fn advance(
    script: &Script,
    stage: ExistingStage,
    ctx: &StepContext<'_>,
    input: Input,
) -> Result<Transition, DialogError> {
    let choice = match &input {
        Input::Choice(value) => Some(value.clone()),
        _ => None,
    };

    match (stage, choice.as_deref()) {
        (ExistingStage::CustomerType, Some("yes")) => {
            Ok(Transition::to((script.wrap)(ExistingStage::Pan)).say(Message::bot(script.ask_pan)))
        }
        (ExistingStage::CustomerType, Some("no")) => {
            Ok(Transition::to(FlowState::GenericNew(NewCustomerStage::Amount))
                .say(Message::bot(NEW_CUSTOMER_WELCOME)))
        }

        (ExistingStage::Pan, _) => match input {
            Input::Text(_) => Ok(Transition::to((script.wrap)(ExistingStage::Interest)).say(
                Message::bot(script.offer_details).with_options(vec![
                    Choice::new("✅ Yes, please", "yes"),
                    Choice::new("❌ No, thank you", "no"),
                    Choice::new("🤔 Maybe later", "later"),
                ]),
            )),
            _ => Err(ctx.unexpected()),
        },

        (ExistingStage::Interest, Some("yes")) => Ok(
            Transition::to((script.wrap)(ExistingStage::Amount)).say(Message::bot(script.ask_amount)),
        ),
        (ExistingStage::Interest, Some("no" | "later")) => {
            Ok(Transition::finish().say(Message::bot("Sure! You can reach out anytime 😊")))
        }

        (ExistingStage::Amount, _) => match input {
            Input::Text(text) => capture_amount(script, ctx, &text),
            _ => Err(ctx.unexpected()),
        },

        (ExistingStage::Tenure, Some(_)) => {
            let tenure = tenure_from(&input).ok_or_else(|| ctx.unexpected())?;
            let summary = LoanSummary::new(ctx.amount()?, tenure);
            tracing::debug!(amount = summary.amount, emi = summary.emi, "Loan summary computed");
            Ok(Transition::to((script.wrap)(ExistingStage::Proceed))
                .with_delta(StateDelta::SetTenure(tenure))
                .say(summary_message(&summary)))
        }

        (ExistingStage::Proceed, Some("yes")) => {
            Ok(Transition::to((script.wrap)(ExistingStage::Documents))
                .with_delta(StateDelta::QueueDocuments(
                    script.documents.iter().map(|d| d.to_string()).collect(),
                ))
                .say(document_request(script.documents_intro, script.documents)))
        }
        (ExistingStage::Proceed, Some("no")) => {
            Ok(Transition::finish().say(Message::bot(RESUME_LATER)))
        }

        (ExistingStage::Documents, _) if input == Input::DocumentsComplete => {
            let amount = ctx.amount()?;
            Ok(Transition::to((script.wrap)(ExistingStage::Sanction)).say(
                Message::bot(format!(
                    "✅ Documents verified successfully.\nYour loan of {} is approved in principle.\nWould you like to proceed to final sanction?",
                    format_rupees(amount)
                ))
                .with_options(yes_no("✅ Yes, confirm", "❌ No")),
            ))
        }

        (ExistingStage::Sanction, Some("yes")) => {
            let tenure = ctx.tenure.ok_or_else(|| ctx.unexpected())?;
            let summary = LoanSummary::new(ctx.amount()?, tenure);
            Ok(Transition::finish().with_replies(sanction_replies(&summary, script.loan_purpose)))
        }
        (ExistingStage::Sanction, Some("no")) => Ok(Transition::finish().say(Message::bot(
            "No problem. Your in-principle approval stays on record, so you can confirm the sanction whenever you’re ready 😊",
        ))),

        _ => Err(ctx.unexpected()),
    }
}

fn capture_amount(
    script: &Script,
    ctx: &StepContext<'_>,
    text: &str,
) -> Result<Transition, DialogError> {
    let amount = super::parse_amount(text)?;
    match check_ceiling(amount, ctx.config.existing_customer_ceiling) {
        Ok(amount) => Ok(Transition::to((script.wrap)(ExistingStage::Tenure))
            .with_delta(StateDelta::SetLoanAmount(amount))
            .say(
                Message::bot(format!(
                    "Thank you! Based on your relationship, {} is within your eligible range.\nPlease choose your loan tenure:",
                    format_rupees(amount)
                ))
                .with_options(tenure_options()),
            )),
        Err(DialogError::EligibilityCeilingExceeded { requested, ceiling }) => {
            tracing::info!(requested, ceiling, "Requested amount above existing-customer ceiling");
            Ok(Transition::finish().say(Message::bot(format!(
                "I’m sorry, {} is above the maximum of {} we can offer you through this channel.\nPlease visit your nearest branch or reach out to your relationship manager for a higher amount.",
                format_rupees(requested),
                format_rupees(ceiling)
            ))))
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialogConfig;
    use crate::emi::Tenure;
    use crate::flows::education::SCRIPT;
    use crate::flows::Pause;

    fn ctx(
        config: &DialogConfig,
        stage: ExistingStage,
        amount: Option<u64>,
        tenure: Option<Tenure>,
    ) -> StepContext<'_> {
        StepContext {
            state: FlowState::Education(stage),
            loan_amount: amount,
            tenure,
            config,
        }
    }

    fn choice(v: &str) -> Input {
        Input::Choice(v.to_string())
    }

    #[test]
    fn greeting_branches() {
        let config = DialogConfig::default();
        let c = ctx(&config, ExistingStage::CustomerType, None, None);

        let yes = advance(&SCRIPT, ExistingStage::CustomerType, &c, choice("yes")).unwrap();
        assert_eq!(yes.next, FlowState::Education(ExistingStage::Pan));

        let no = advance(&SCRIPT, ExistingStage::CustomerType, &c, choice("no")).unwrap();
        assert_eq!(no.next, FlowState::GenericNew(NewCustomerStage::Amount));

        assert!(advance(&SCRIPT, ExistingStage::CustomerType, &c, choice("maybe")).is_err());
        assert!(advance(&SCRIPT, ExistingStage::CustomerType, &c, Input::DocumentsComplete).is_err());
    }

    #[test]
    fn amount_within_ceiling_offers_tenures() {
        let config = DialogConfig::default();
        let c = ctx(&config, ExistingStage::Amount, None, None);
        let t = advance(&SCRIPT, ExistingStage::Amount, &c, Input::Text("₹2,00,000".into())).unwrap();
        assert_eq!(t.next, FlowState::Education(ExistingStage::Tenure));
        assert_eq!(t.deltas, vec![StateDelta::SetLoanAmount(200_000)]);
        assert!(t.replies[0].message.text.contains("₹200,000"));
    }

    #[test]
    fn amount_at_ceiling_is_allowed_above_is_not() {
        let config = DialogConfig {
            existing_customer_ceiling: 300_000,
            ..DialogConfig::default()
        };
        let c = ctx(&config, ExistingStage::Amount, None, None);
        let at = advance(&SCRIPT, ExistingStage::Amount, &c, Input::Text("300000".into())).unwrap();
        assert_eq!(at.next, FlowState::Education(ExistingStage::Tenure));

        let above = advance(&SCRIPT, ExistingStage::Amount, &c, Input::Text("300001".into())).unwrap();
        assert_eq!(above.next, FlowState::Undetermined);
        assert!(above.deltas.is_empty());
    }

    #[test]
    fn tenure_summary_uses_stored_amount() {
        let config = DialogConfig::default();
        let c = ctx(&config, ExistingStage::Tenure, Some(200_000), None);
        let t = advance(&SCRIPT, ExistingStage::Tenure, &c, choice("2")).unwrap();
        assert_eq!(t.deltas, vec![StateDelta::SetTenure(Tenure::Two)]);
        let text = &t.replies[0].message.text;
        assert!(text.contains("₹9,438/month"));
        assert!(text.contains("₹799"));

        assert!(advance(&SCRIPT, ExistingStage::Tenure, &c, choice("5")).is_err());
    }

    #[test]
    fn proceeding_queues_flow_documents() {
        let config = DialogConfig::default();
        let c = ctx(&config, ExistingStage::Proceed, Some(200_000), Some(Tenure::Two));
        let t = advance(&SCRIPT, ExistingStage::Proceed, &c, choice("yes")).unwrap();
        assert_eq!(t.next, FlowState::Education(ExistingStage::Documents));
        match &t.deltas[0] {
            StateDelta::QueueDocuments(labels) => {
                assert_eq!(labels.len(), 3);
                assert!(labels[0].contains("enrollment proof"));
                assert!(labels[1].contains("ABC"));
                assert!(labels[2].contains("Marksheets"));
            }
            other => panic!("Expected QueueDocuments, got {other:?}"),
        }
        assert!(t.replies[0].message.expects_file_upload);
    }

    #[test]
    fn documents_wait_for_completion_token() {
        let config = DialogConfig::default();
        let c = ctx(&config, ExistingStage::Documents, Some(200_000), Some(Tenure::Two));
        assert!(advance(&SCRIPT, ExistingStage::Documents, &c, Input::Text("hi".into())).is_err());
        let t = advance(&SCRIPT, ExistingStage::Documents, &c, Input::DocumentsComplete).unwrap();
        assert_eq!(t.next, FlowState::Education(ExistingStage::Sanction));
        assert!(t.replies[0].message.text.contains("approved in principle"));
    }

    #[test]
    fn sanction_sends_notice_then_delayed_letter() {
        let config = DialogConfig::default();
        let c = ctx(&config, ExistingStage::Sanction, Some(200_000), Some(Tenure::Two));
        let t = advance(&SCRIPT, ExistingStage::Sanction, &c, choice("yes")).unwrap();
        assert_eq!(t.next, FlowState::Undetermined);
        assert_eq!(t.replies.len(), 2);
        assert_eq!(t.replies[0].pause, Pause::Typing);
        assert_eq!(t.replies[1].pause, Pause::FollowUp);
        assert!(t.replies[0].message.text.contains("₹9,438/month"));
        assert!(t.replies[1].message.text.contains("CFA course"));

        let declined = advance(&SCRIPT, ExistingStage::Sanction, &c, choice("no")).unwrap();
        assert_eq!(declined.next, FlowState::Undetermined);
        assert_eq!(declined.replies.len(), 1);
    }
}
