//! Session state shared by the fan-out coordinator and the synthesizer
//!
//! All mutation goes through the named transitions on [`Session`]. Each one
//! takes the write lock, replaces whole values, and bumps a change counter,
//! so readers only ever see complete states and observers see every step.

mod types;

pub use types::{mask_key, ApiKeys, ChatMessage, ResponseCollection, Role, SummaryState};

use crate::catalog::Catalog;
use crate::llm::{ModelDescriptor, NormalizedResult};
use crate::storage::Preferences;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// Everything the session knows, as a plain value
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub api_keys: ApiKeys,
    /// In the order the user selected them
    pub selected_models: Vec<ModelDescriptor>,
    pub summarization_model_id: Option<String>,
    pub responses: ResponseCollection,
    pub messages: Vec<ChatMessage>,
    pub summary: SummaryState,
    pub is_loading: bool,
    pub is_summarizing: bool,
    /// Bumped whenever the responses or summary are reset or replaced, so a
    /// synthesis can tell whether its inputs are still current
    pub round: u64,
}

pub struct Session {
    catalog: Arc<Catalog>,
    inner: RwLock<SessionState>,
    changes: watch::Sender<u64>,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            catalog,
            inner: RwLock::new(SessionState::default()),
            changes,
        }
    }

    /// Restore keys, selection and summarizer from saved preferences
    ///
    /// Ids that are no longer in the catalog are dropped.
    pub fn from_preferences(catalog: Arc<Catalog>, prefs: &Preferences) -> Self {
        let session = Self::new(catalog);
        {
            let mut state = session.write_inner();
            state.api_keys = prefs.api_keys.clone();
            state.selected_models = prefs
                .selected_models
                .iter()
                .filter_map(|id| {
                    let model = session.catalog.get(id).cloned();
                    if model.is_none() {
                        tracing::warn!("Dropping unknown saved model selection '{}'", id);
                    }
                    model
                })
                .collect();
            state.summarization_model_id = prefs
                .summarization_model_id
                .clone()
                .filter(|id| session.catalog.get(id).is_some());
        }
        session
    }

    // ========== Private Helpers ==========

    fn read_inner(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Session read lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Session write lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Apply one transition and notify observers
    fn transition<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let out = {
            let mut state = self.write_inner();
            f(&mut state)
        };
        self.changes.send_modify(|version| *version += 1);
        out
    }

    // ========== Getters ==========

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Consistent copy of the whole state
    pub fn snapshot(&self) -> SessionState {
        self.read_inner().clone()
    }

    /// Receiver that changes on every transition
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn api_keys(&self) -> ApiKeys {
        self.read_inner().api_keys.clone()
    }

    pub fn selected_models(&self) -> Vec<ModelDescriptor> {
        self.read_inner().selected_models.clone()
    }

    pub fn summarization_model(&self) -> Option<ModelDescriptor> {
        let id = self.read_inner().summarization_model_id.clone()?;
        self.catalog.get(&id).cloned()
    }

    pub fn responses(&self) -> ResponseCollection {
        self.read_inner().responses.clone()
    }

    pub fn summary(&self) -> SummaryState {
        self.read_inner().summary.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read_inner().is_loading
    }

    pub fn is_summarizing(&self) -> bool {
        self.read_inner().is_summarizing
    }

    /// The persisted subset of the state
    pub fn preferences(&self) -> Preferences {
        let state = self.read_inner();
        Preferences {
            api_keys: state.api_keys.clone(),
            selected_models: state.selected_models.iter().map(|m| m.id.clone()).collect(),
            summarization_model_id: state.summarization_model_id.clone(),
        }
    }

    // ========== Transitions ==========

    pub fn set_api_key(&self, group: &str, key: &str) {
        self.transition(|state| state.api_keys = state.api_keys.with(group, key));
    }

    pub fn remove_api_key(&self, group: &str) {
        self.transition(|state| state.api_keys = state.api_keys.without(group));
    }

    /// Select the model if unselected, unselect it otherwise
    ///
    /// Returns whether the model is selected afterwards; unknown ids are
    /// ignored and return `false`.
    pub fn toggle_model_selection(&self, model_id: &str) -> bool {
        let Some(model) = self.catalog.get(model_id).cloned() else {
            tracing::debug!("Ignoring selection toggle for unknown model '{}'", model_id);
            return false;
        };
        self.transition(|state| {
            let was_selected = state.selected_models.iter().any(|m| m.id == model_id);
            let mut selected = state.selected_models.clone();
            if was_selected {
                selected.retain(|m| m.id != model_id);
            } else {
                selected.push(model);
            }
            state.selected_models = selected;
            !was_selected
        })
    }

    pub fn clear_selections(&self) {
        self.transition(|state| state.selected_models = Vec::new());
    }

    /// Choose the synthesis model; unknown ids clear the choice
    pub fn set_summarization_model(&self, model_id: Option<&str>) {
        let model_id = model_id
            .filter(|id| self.catalog.get(id).is_some())
            .map(str::to_string);
        self.transition(|state| state.summarization_model_id = model_id);
    }

    /// Drop all responses, the message log, and the summary
    pub fn clear_responses(&self) {
        self.transition(|state| {
            state.responses = ResponseCollection::new();
            state.messages = Vec::new();
            state.summary = SummaryState::Empty;
            state.round += 1;
        });
    }

    pub fn clear_summary(&self) {
        self.transition(|state| {
            state.summary = SummaryState::Empty;
            state.round += 1;
        });
    }

    /// Upsert a model's result and log it as an assistant message
    ///
    /// Any existing summary is cleared since it no longer matches.
    pub fn record_response(&self, result: NormalizedResult) {
        self.transition(|state| {
            let mut messages = state.messages.clone();
            messages.push(ChatMessage::assistant(&result.model_id, &result.content));
            let mut responses = state.responses.clone();
            responses.upsert(result);
            state.responses = responses;
            state.messages = messages;
            state.summary = SummaryState::Empty;
            state.round += 1;
        });
    }

    pub fn set_summary(&self, summary: SummaryState) {
        self.transition(|state| state.summary = summary);
    }

    /// Store a summary only if nothing reset the round since `round`
    ///
    /// Returns whether it was stored.
    pub fn set_summary_if_current(&self, round: u64, summary: SummaryState) -> bool {
        self.transition(|state| {
            if state.round != round {
                tracing::debug!(
                    "Dropping summary from round {} (now {})",
                    round,
                    state.round
                );
                return false;
            }
            state.summary = summary;
            true
        })
    }

    /// Start a prompt round unless one is already running
    ///
    /// Clears responses and summary and logs the prompt in the same step.
    pub(crate) fn begin_dispatch(&self, prompt: &str) -> Option<FlightGuard<'_>> {
        self.transition(|state| {
            if state.is_loading {
                return None;
            }
            let mut messages = state.messages.clone();
            messages.push(ChatMessage::user(prompt));
            state.messages = messages;
            state.responses = ResponseCollection::new();
            state.summary = SummaryState::Empty;
            state.round += 1;
            state.is_loading = true;
            Some(state.round)
        })
        .map(|round| FlightGuard {
            session: self,
            flight: Flight::Dispatch,
            round,
        })
    }

    /// Start a synthesis unless one is already running
    ///
    /// Returns the guard along with the responses as of the guard's round.
    pub(crate) fn begin_summary(&self) -> Option<(FlightGuard<'_>, ResponseCollection)> {
        self.transition(|state| {
            if state.is_summarizing {
                return None;
            }
            state.is_summarizing = true;
            Some((state.round, state.responses.clone()))
        })
        .map(|(round, responses)| {
            let guard = FlightGuard {
                session: self,
                flight: Flight::Summary,
                round,
            };
            (guard, responses)
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Flight {
    Dispatch,
    Summary,
}

/// Clears the matching in-flight flag when dropped
///
/// Dropping also covers early returns and cancelled futures.
pub(crate) struct FlightGuard<'a> {
    session: &'a Session,
    flight: Flight,
    round: u64,
}

impl FlightGuard<'_> {
    /// Session round when the flight started
    pub(crate) fn round(&self) -> u64 {
        self.round
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let flight = self.flight;
        self.session.transition(|state| match flight {
            Flight::Dispatch => state.is_loading = false,
            Flight::Summary => state.is_summarizing = false,
        });
    }
}
