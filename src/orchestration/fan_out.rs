//! Fan-out coordinator - one prompt, many models

use crate::llm::{Completer, LlmError, ModelDescriptor, NormalizedResult};
use crate::session::{ApiKeys, Session};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Content recorded when a call returned neither text nor an error
pub const NO_CONTENT: &str = "No content returned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every model has a recorded result
    Settled { attempted: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoModelsSelected,
    AlreadyInFlight,
}

pub struct FanOutCoordinator {
    completer: Arc<dyn Completer>,
    concurrent: bool,
}

impl FanOutCoordinator {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self {
            completer,
            concurrent: true,
        }
    }

    /// Await each model before starting the next instead of all at once
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Run the session's own selection with the session's own keys
    pub async fn submit_prompt(&self, session: &Session, prompt: &str) -> DispatchOutcome {
        let models = session.selected_models();
        let credentials = session.api_keys();
        self.dispatch_all(session, prompt, &models, &credentials).await
    }

    /// Send `prompt` to every model and record each result as it lands
    ///
    /// Returns once every model has a result in the session. A call that is
    /// already running, or an empty model list, makes this a no-op.
    pub async fn dispatch_all(
        &self,
        session: &Session,
        prompt: &str,
        models: &[ModelDescriptor],
        credentials: &ApiKeys,
    ) -> DispatchOutcome {
        if models.is_empty() {
            return DispatchOutcome::Skipped(SkipReason::NoModelsSelected);
        }
        let Some(_flight) = session.begin_dispatch(prompt) else {
            tracing::debug!("Prompt dispatch already in flight, ignoring new prompt");
            return DispatchOutcome::Skipped(SkipReason::AlreadyInFlight);
        };

        let mut ready = Vec::with_capacity(models.len());
        for model in models {
            match credentials.get(&model.api_key_name) {
                Some(key) => ready.push((model, key)),
                None => {
                    let err = LlmError::MissingCredential(model.name.clone());
                    session.record_response(NormalizedResult::failure(&model.id, err.to_string()));
                }
            }
        }

        tracing::info!(
            models = models.len(),
            dispatching = ready.len(),
            concurrent = self.concurrent,
            "Dispatching prompt"
        );

        if self.concurrent {
            let mut in_flight: FuturesUnordered<_> = ready
                .into_iter()
                .map(|(model, key)| self.call(model, prompt, key))
                .collect();
            while let Some(result) = in_flight.next().await {
                session.record_response(result);
            }
        } else {
            for (model, key) in ready {
                let result = self.call(model, prompt, key).await;
                session.record_response(result);
            }
        }

        DispatchOutcome::Settled {
            attempted: models.len(),
        }
    }

    async fn call(&self, model: &ModelDescriptor, prompt: &str, key: &str) -> NormalizedResult {
        let started = Instant::now();
        let mut result = self.completer.complete(model, prompt, key).await;
        let elapsed = started.elapsed();

        // The slot belongs to the model we called, whatever the completer said
        result.model_id = model.id.clone();
        if result.is_blank() {
            result.content = NO_CONTENT.to_string();
            result.error = None;
        }

        tracing::debug!(
            model = %model.id,
            elapsed_ms = elapsed.as_millis() as u64,
            ok = !result.is_error(),
            "Model call finished"
        );
        result.with_elapsed(elapsed)
    }
}
