//! New-customer flow.
//!
//! Reached by answering "No" at the existing-customer question of any flow.
//! Amount first, then proofs, then the eligibility ceiling decides between a
//! straight tenure choice and a capped offer.

use super::{
    check_ceiling, document_request, sanction_replies, summary_message, tenure_from,
    tenure_options, Input, StateDelta, StepContext, Transition, TransitionTable, RESUME_LATER,
};
use crate::dialog::message::{Choice, Message};
use crate::dialog::session::{Flow, FlowState, NewCustomerStage};
use crate::emi::{format_rupees, LoanSummary};
use crate::error::DialogError;

/// Income and identity proofs, also asked of existing wedding customers.
pub const DOCUMENTS: &[&str] = &[
    "Latest 3 months’ salary slips",
    "Bank statement (6 months)",
    "PAN and Aadhaar card",
];

const PROFILE_REQUEST: &str = "While you upload, you can also share:\n• Monthly income\n• Employment type (salaried/self-employed)\n• Any existing EMIs or loans";

/// Transitions for new customers.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericTable;

impl TransitionTable for GenericTable {
    fn flow(&self) -> Flow {
        Flow::GenericNew
    }

    fn advance(&self, ctx: &StepContext<'_>, input: Input) -> Result<Transition, DialogError> {
        let FlowState::GenericNew(stage) = ctx.state else {
            return Err(ctx.unexpected());
        };
        let choice = match &input {
            Input::Choice(value) => Some(value.clone()),
            _ => None,
        };
        let ceiling = ctx.config.new_customer_ceiling;

        match (stage, choice.as_deref()) {
            (NewCustomerStage::Amount, _) => match input {
                Input::Text(text) => {
                    let amount = super::parse_amount(&text)?;
                    let intro = match check_ceiling(amount, ceiling) {
                        Ok(_) => format!(
                            "Thanks! To process your request for {}, please upload these documents one by one:",
                            format_rupees(amount)
                        ),
                        Err(_) => format!(
                            "Thanks for the info. Based on our eligibility rules, you’re pre-approved for {}.\nHowever, since you requested {}, please upload these documents one by one:",
                            format_rupees(ceiling),
                            format_rupees(amount)
                        ),
                    };
                    let mut request = document_request(&intro, DOCUMENTS);
                    request.text = format!("{}\n\n{PROFILE_REQUEST}", request.text);
                    Ok(next_stage(NewCustomerStage::Documents)
                        .with_delta(StateDelta::SetLoanAmount(amount))
                        .with_delta(StateDelta::QueueDocuments(
                            DOCUMENTS.iter().map(|d| d.to_string()).collect(),
                        ))
                        .say(request))
                }
                _ => Err(ctx.unexpected()),
            },

            (NewCustomerStage::Documents, _) => match input {
                // Profile details are taken at face value and not evaluated.
                Input::Text(_) => Ok(next_stage(NewCustomerStage::Documents).say(
                    Message::bot("Thanks, noted. Please continue with the document uploads.")
                        .with_upload(),
                )),
                Input::DocumentsComplete => {
                    let amount = ctx.amount()?;
                    match check_ceiling(amount, ceiling) {
                        Ok(amount) => Ok(next_stage(NewCustomerStage::Tenure).say(
                            Message::bot(format!(
                                "✅ All documents verified. {} is within your eligible range.\nPlease choose your loan tenure:",
                                format_rupees(amount)
                            ))
                            .with_options(tenure_options()),
                        )),
                        Err(DialogError::EligibilityCeilingExceeded { requested, ceiling }) => {
                            tracing::info!(requested, ceiling, "Offering capped amount to new customer");
                            Ok(next_stage(NewCustomerStage::CappedOffer).say(
                                Message::bot(format!(
                                    "✅ All documents received.\nThank you! However, for {} approval, we need full income & banking proofs.\nWithout them, we can proceed only with {}.\nWould you like to continue?",
                                    format_rupees(requested),
                                    format_rupees(ceiling)
                                ))
                                .with_options(vec![
                                    Choice::new(
                                        format!("✅ Yes, proceed with {}", format_rupees(ceiling)),
                                        "yes",
                                    ),
                                    Choice::new("❌ No, I prefer to wait", "no"),
                                ]),
                            ))
                        }
                        Err(other) => Err(other),
                    }
                }
                Input::Choice(_) => Err(ctx.unexpected()),
            },

            (NewCustomerStage::CappedOffer, Some("yes")) => Ok(next_stage(NewCustomerStage::Tenure)
                .with_delta(StateDelta::SetLoanAmount(ceiling))
                .say(
                    Message::bot(format!(
                        "Noted. Processing your {} loan request. ✅\nPlease choose your loan tenure:",
                        format_rupees(ceiling)
                    ))
                    .with_options(tenure_options()),
                )),
            (NewCustomerStage::CappedOffer, Some("no")) => {
                let requested = ctx.amount()?;
                Ok(Transition::finish().say(Message::bot(format!(
                    "I completely understand your preference. Once full documents are shared or your income increases, we’ll reassess your {} request.\nWe’ve safely stored your details and we’ll notify you once you qualify for a higher amount. 😊",
                    format_rupees(requested)
                ))))
            }

            (NewCustomerStage::Tenure, Some(_)) => {
                let tenure = tenure_from(&input).ok_or_else(|| ctx.unexpected())?;
                let summary = LoanSummary::new(ctx.amount()?, tenure);
                Ok(next_stage(NewCustomerStage::Proceed)
                    .with_delta(StateDelta::SetTenure(tenure))
                    .say(summary_message(&summary)))
            }

            (NewCustomerStage::Proceed, Some("yes")) => {
                let tenure = ctx.tenure.ok_or_else(|| ctx.unexpected())?;
                let summary = LoanSummary::new(ctx.amount()?, tenure);
                Ok(Transition::finish().with_replies(sanction_replies(&summary, "Personal Loan")))
            }
            (NewCustomerStage::Proceed, Some("no")) => {
                Ok(Transition::finish().say(Message::bot(RESUME_LATER)))
            }

            _ => Err(ctx.unexpected()),
        }
    }
}

fn next_stage(stage: NewCustomerStage) -> Transition {
    Transition::to(FlowState::GenericNew(stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DialogConfig;
    use crate::emi::Tenure;

    fn ctx(config: &DialogConfig, stage: NewCustomerStage, amount: Option<u64>) -> StepContext<'_> {
        StepContext {
            state: FlowState::GenericNew(stage),
            loan_amount: amount,
            tenure: None,
            config,
        }
    }

    #[test]
    fn amount_above_ceiling_still_collects_documents() {
        let config = DialogConfig::default();
        let c = ctx(&config, NewCustomerStage::Amount, None);
        let t = GenericTable.advance(&c, Input::Text("900000".into())).unwrap();
        assert_eq!(t.next, FlowState::GenericNew(NewCustomerStage::Documents));
        assert_eq!(t.deltas[0], StateDelta::SetLoanAmount(900_000));
        assert_eq!(
            t.deltas[1],
            StateDelta::QueueDocuments(vec![
                "Latest 3 months’ salary slips".to_string(),
                "Bank statement (6 months)".to_string(),
                "PAN and Aadhaar card".to_string(),
            ])
        );
        let text = &t.replies[0].message.text;
        assert!(text.contains("pre-approved for ₹500,000"));
        assert!(text.contains("Monthly income"));
        assert!(t.replies[0].message.expects_file_upload);
    }

    #[test]
    fn malformed_amount_is_an_error() {
        let config = DialogConfig::default();
        let c = ctx(&config, NewCustomerStage::Amount, None);
        assert!(matches!(
            GenericTable.advance(&c, Input::Text("a lot".into())),
            Err(DialogError::InvalidAmountFormat { .. })
        ));
    }

    #[test]
    fn completion_above_ceiling_offers_capped_amount() {
        let config = DialogConfig::default();
        let c = ctx(&config, NewCustomerStage::Documents, Some(900_000));
        let t = GenericTable.advance(&c, Input::DocumentsComplete).unwrap();
        assert_eq!(t.next, FlowState::GenericNew(NewCustomerStage::CappedOffer));
        let options = t.replies[0].message.options.clone().unwrap();
        assert_eq!(options[0].label, "✅ Yes, proceed with ₹500,000");
        assert_eq!(options[0].value, "yes");
        assert_eq!(options[1].value, "no");
    }

    #[test]
    fn capped_offer_accept_lowers_amount() {
        let config = DialogConfig::default();
        let c = ctx(&config, NewCustomerStage::CappedOffer, Some(900_000));
        let t = GenericTable.advance(&c, Input::Choice("yes".into())).unwrap();
        assert_eq!(t.next, FlowState::GenericNew(NewCustomerStage::Tenure));
        assert_eq!(t.deltas, vec![StateDelta::SetLoanAmount(500_000)]);
    }

    #[test]
    fn capped_offer_decline_ends_with_notification_promise() {
        let config = DialogConfig::default();
        let c = ctx(&config, NewCustomerStage::CappedOffer, Some(900_000));
        let t = GenericTable.advance(&c, Input::Choice("no".into())).unwrap();
        assert_eq!(t.next, FlowState::Undetermined);
        let text = &t.replies[0].message.text;
        assert!(text.contains("notify you"));
        assert!(text.contains("₹900,000"));
    }

    #[test]
    fn proceed_requires_tenure() {
        let config = DialogConfig::default();
        let c = ctx(&config, NewCustomerStage::Proceed, Some(500_000));
        assert!(GenericTable.advance(&c, Input::Choice("yes".into())).is_err());

        let with_tenure = StepContext {
            tenure: Some(Tenure::Three),
            ..c
        };
        let t = GenericTable.advance(&with_tenure, Input::Choice("yes".into())).unwrap();
        assert_eq!(t.next, FlowState::Undetermined);
        assert!(t.replies[0].message.text.contains("₹16,667/month"));
    }

    #[test]
    fn rejects_other_flows() {
        let config = DialogConfig::default();
        let c = StepContext {
            state: FlowState::Undetermined,
            loan_amount: None,
            tenure: None,
            config: &config,
        };
        assert!(GenericTable.advance(&c, Input::Text("x".into())).is_err());
    }
}
