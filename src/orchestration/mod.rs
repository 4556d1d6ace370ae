//! Orchestration - fan a prompt out to many models and synthesize the answers

pub mod fan_out;
pub mod summary;

pub use fan_out::{DispatchOutcome, FanOutCoordinator, SkipReason, NO_CONTENT};
pub use summary::{
    build_summary_prompt, SummaryOutcome, SummarySkip, SummarySynthesizer, RESPONSE_SEPARATOR,
};
