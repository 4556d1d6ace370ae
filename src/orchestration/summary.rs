//! Summary synthesizer - one more model call over everyone's answers

use crate::catalog::Catalog;
use crate::llm::{Completer, LlmError, ModelDescriptor, NormalizedResult};
use crate::session::{ApiKeys, Session, SummaryState};
use std::sync::Arc;

/// Placed between model answers in the synthesis prompt
pub const RESPONSE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The summary slot now holds a summary or an error string
    Completed,
    Skipped(SummarySkip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySkip {
    NoModelChosen,
    NotEnoughResponses,
    AlreadyInFlight,
}

/// Build the instruction prompt wrapping every collected answer
pub fn build_summary_prompt<'a>(
    catalog: &Catalog,
    responses: impl IntoIterator<Item = &'a NormalizedResult>,
) -> String {
    let responses_text = responses
        .into_iter()
        .map(|r| format!("{}: {}", catalog.display_name(&r.model_id), r.content))
        .collect::<Vec<_>>()
        .join(RESPONSE_SEPARATOR);

    format!(
        "You are given responses from different AI models to the same user query.\n\n\
         {responses_text}\n\n\
         Task:\n\n\
         Carefully read all responses.\n\n\
         Identify common points and differences.\n\n\
         Summarize the key insights from both responses into a single, cohesive answer.\n\n\
         If there are conflicting opinions, briefly mention them.\n\n\
         Keep the summary concise, neutral, and easy to understand.\n\n\
         Focus on clarity, not just merging the texts."
    )
}

pub struct SummarySynthesizer {
    completer: Arc<dyn Completer>,
}

impl SummarySynthesizer {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self { completer }
    }

    /// Summarize with the session's chosen model and keys
    pub async fn request_summary(&self, session: &Session) -> SummaryOutcome {
        let model = session.summarization_model();
        let credentials = session.api_keys();
        self.summarize(session, model.as_ref(), &credentials).await
    }

    /// Ask `model` to synthesize the session's current responses
    ///
    /// No-op without a model, with fewer than two responses, or while another
    /// synthesis runs. Failures land in the summary slot as text. A result is
    /// dropped if the responses were reset or replaced while it was running.
    pub async fn summarize(
        &self,
        session: &Session,
        model: Option<&ModelDescriptor>,
        credentials: &ApiKeys,
    ) -> SummaryOutcome {
        let Some(model) = model else {
            return SummaryOutcome::Skipped(SummarySkip::NoModelChosen);
        };
        if session.responses().len() < 2 {
            return SummaryOutcome::Skipped(SummarySkip::NotEnoughResponses);
        }
        let Some((flight, responses)) = session.begin_summary() else {
            return SummaryOutcome::Skipped(SummarySkip::AlreadyInFlight);
        };
        if responses.len() < 2 {
            return SummaryOutcome::Skipped(SummarySkip::NotEnoughResponses);
        }

        let Some(key) = credentials.get(&model.api_key_name) else {
            let err = LlmError::MissingCredential(model.name.clone());
            session.set_summary_if_current(
                flight.round(),
                SummaryState::Failed(format!("Error: {err}")),
            );
            return SummaryOutcome::Completed;
        };

        let prompt = build_summary_prompt(session.catalog(), &responses);
        tracing::info!(
            model = %model.id,
            responses = responses.len(),
            "Generating summary"
        );

        let result = self.completer.complete(model, &prompt, key).await;
        let summary = match result.error_message() {
            Some(error) => {
                tracing::warn!("Summary with {} failed: {}", model.name, error);
                SummaryState::Failed(format!("Error generating summary: {error}"))
            }
            None => SummaryState::Ready(result.content),
        };
        if !session.set_summary_if_current(flight.round(), summary) {
            tracing::debug!("Responses changed while summarizing; summary discarded");
        }
        SummaryOutcome::Completed
    }
}
