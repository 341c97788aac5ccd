//! Loan Assist — scripted personal-loan application assistant.

pub mod channels;
pub mod config;
pub mod dialog;
pub mod emi;
pub mod error;
pub mod flows;
