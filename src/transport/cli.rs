//! CLI commands for terminal use

use crate::catalog::Catalog;
use crate::config::Config;
use crate::llm::{Completer, DirectDispatcher, ModelDescriptor, NormalizedResult, RelayClient};
use crate::orchestration::{
    DispatchOutcome, FanOutCoordinator, SkipReason, SummaryOutcome, SummarySkip,
    SummarySynthesizer,
};
use crate::session::{mask_key, Session, SummaryState};
use crate::storage::PreferenceStore;
use anyhow::{bail, Result};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

/// How command output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Config, saved preferences and the session built from them
struct Workspace {
    config: Config,
    store: PreferenceStore,
    session: Session,
}

impl Workspace {
    fn load() -> Result<Self> {
        let config = Config::load()?;
        let catalog = Arc::new(Catalog::with_overrides(config.catalog.models.clone()));
        let store = PreferenceStore::new()?;
        let session = Session::from_preferences(catalog, &store.load()?);
        Ok(Self {
            config,
            store,
            session,
        })
    }

    fn catalog(&self) -> &Catalog {
        self.session.catalog()
    }

    fn model(&self, id: &str) -> Result<ModelDescriptor> {
        match self.catalog().get(id) {
            Some(model) => Ok(model.clone()),
            None => bail!("Unknown model '{}'. Run `polyprompt models` to list them.", id),
        }
    }

    fn save(&self) -> Result<()> {
        self.store.save(&self.session.preferences())
    }

    fn completer(&self, relay: Option<&str>) -> Arc<dyn Completer> {
        match relay.or(self.config.relay.url.as_deref()) {
            Some(url) => {
                tracing::info!("Dispatching through relay at {}", url);
                Arc::new(RelayClient::new(url))
            }
            None => Arc::new(DirectDispatcher::new()),
        }
    }
}

/// Send one prompt to several models, optionally summarizing the answers
pub async fn run_ask(
    prompt: &str,
    model_ids: &[String],
    summarize_with: Option<&str>,
    format: OutputFormat,
    relay: Option<&str>,
) -> Result<()> {
    let ws = Workspace::load()?;

    let models = if model_ids.is_empty() {
        ws.session.selected_models()
    } else {
        model_ids
            .iter()
            .map(|id| ws.model(id))
            .collect::<Result<Vec<_>>>()?
    };
    if models.is_empty() {
        bail!("No models selected. Pass -m <model-id> or run `polyprompt select <model-id>`.");
    }

    let summarizer = match summarize_with {
        Some(id) => Some(ws.model(id)?),
        None => ws.session.summarization_model(),
    };

    let completer = ws.completer(relay);
    let coordinator = FanOutCoordinator::new(completer.clone())
        .with_concurrency(ws.config.dispatch.concurrent);
    let credentials = ws.session.api_keys();

    let mut changes = ws.session.subscribe();
    let dispatch = coordinator.dispatch_all(&ws.session, prompt, &models, &credentials);
    tokio::pin!(dispatch);

    let mut printed = 0;
    let outcome = loop {
        tokio::select! {
            outcome = &mut dispatch => break outcome,
            Ok(()) = changes.changed() => {
                if format == OutputFormat::Table {
                    printed = print_arrivals(&ws.session, printed);
                }
            }
        }
    };
    if format == OutputFormat::Table {
        print_arrivals(&ws.session, printed);
    }

    match outcome {
        DispatchOutcome::Settled { attempted } => {
            tracing::debug!("Collected results from {} models", attempted);
        }
        DispatchOutcome::Skipped(SkipReason::NoModelsSelected) => bail!("No models selected"),
        DispatchOutcome::Skipped(SkipReason::AlreadyInFlight) => bail!("A prompt is already running"),
    }

    let mut summary_note = None;
    if let Some(model) = summarizer.as_ref() {
        let synthesizer = SummarySynthesizer::new(completer);
        match synthesizer
            .summarize(&ws.session, Some(model), &credentials)
            .await
        {
            SummaryOutcome::Completed => {}
            SummaryOutcome::Skipped(SummarySkip::NotEnoughResponses) => {
                summary_note = Some("A summary needs at least two responses");
            }
            SummaryOutcome::Skipped(reason) => {
                tracing::debug!("Summary skipped: {:?}", reason);
            }
        }
    }

    let responses = ws.session.responses();
    let summary = ws.session.summary();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "prompt": prompt,
                "responses": responses,
                "summary": summary,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct ResponseRow {
                #[tabled(rename = "Model")]
                model: String,
                #[tabled(rename = "Status")]
                status: String,
                #[tabled(rename = "Time")]
                time: String,
                #[tabled(rename = "Response")]
                response: String,
            }

            let rows: Vec<ResponseRow> = responses
                .iter()
                .map(|r| ResponseRow {
                    model: ws.catalog().display_name(&r.model_id).to_string(),
                    status: if r.is_error() { "error" } else { "ok" }.to_string(),
                    time: format_elapsed(r.elapsed),
                    response: r.error_message().unwrap_or(&r.content).to_string(),
                })
                .collect();

            println!();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);

            match &summary {
                SummaryState::Ready(text) => {
                    println!("\n{}", "=== SUMMARY ===".bold().cyan());
                    println!("{}", text);
                }
                SummaryState::Failed(text) => {
                    println!("\n{} {}", "Summary failed:".red().bold(), text);
                }
                SummaryState::Empty => {
                    if let Some(note) = summary_note {
                        println!("\n{}", note.yellow());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Print the responses recorded since the last call; returns the new count
fn print_arrivals(session: &Session, already_printed: usize) -> usize {
    let responses = session.responses();
    for result in responses.iter().skip(already_printed) {
        println!("{}", arrival_line(session.catalog(), result));
    }
    responses.len().max(already_printed)
}

fn arrival_line(catalog: &Catalog, result: &NormalizedResult) -> String {
    let name = catalog.display_name(&result.model_id);
    match result.error_message() {
        Some(error) => format!("{} {}: {}", "✗".red(), name.bold(), error),
        None => format!(
            "{} {} ({})",
            "✓".green(),
            name.bold(),
            format_elapsed(result.elapsed)
        ),
    }
}

fn format_elapsed(elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(d) => format!("{:.1}s", d.as_secs_f64()),
        None => "-".to_string(),
    }
}

/// List the catalog with selection and credential markers
pub fn run_models(format: OutputFormat) -> Result<()> {
    let ws = Workspace::load()?;
    let selected: Vec<String> = ws
        .session
        .selected_models()
        .into_iter()
        .map(|m| m.id)
        .collect();
    let summarizer = ws.session.summarization_model().map(|m| m.id);
    let keys = ws.session.api_keys();

    match format {
        OutputFormat::Json => {
            let output: Vec<_> = ws
                .catalog()
                .models()
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "id": m.id,
                        "name": m.name,
                        "provider": m.provider,
                        "apiKeyName": m.api_key_name,
                        "selected": selected.contains(&m.id),
                        "summarizer": summarizer.as_deref() == Some(m.id.as_str()),
                        "hasKey": keys.contains(&m.api_key_name),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct ModelRow {
                #[tabled(rename = "Model ID")]
                id: String,
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "Provider")]
                provider: String,
                #[tabled(rename = "Key")]
                key: String,
                #[tabled(rename = "Selected")]
                selected: String,
            }

            let rows: Vec<ModelRow> = ws
                .catalog()
                .models()
                .iter()
                .map(|m| {
                    let mut marker = String::new();
                    if let Some(pos) = selected.iter().position(|id| id == &m.id) {
                        marker = format!("#{}", pos + 1);
                    }
                    if summarizer.as_deref() == Some(m.id.as_str()) {
                        marker = format!("{} (summarizer)", marker).trim().to_string();
                    }
                    ModelRow {
                        id: m.id.clone(),
                        name: m.name.clone(),
                        provider: m.provider.to_string(),
                        key: if keys.contains(&m.api_key_name) {
                            "✓".to_string()
                        } else {
                            format!("missing ({})", m.api_key_name)
                        },
                        selected: marker,
                    }
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
    }
    Ok(())
}

pub fn run_keys_set(group: &str, value: &str) -> Result<()> {
    if group.trim().is_empty() || value.trim().is_empty() {
        bail!("Both a key group and a key value are required");
    }
    let ws = Workspace::load()?;
    if !ws.catalog().credential_groups().contains(&group) {
        println!(
            "{} no model in the catalog uses the '{}' key group",
            "Note:".yellow().bold(),
            group
        );
    }
    ws.session.set_api_key(group, value.trim());
    ws.save()?;
    println!("{} Saved key for {}", "✓".green(), group.bold());
    Ok(())
}

pub fn run_keys_remove(group: &str) -> Result<()> {
    let ws = Workspace::load()?;
    if !ws.session.api_keys().contains(group) {
        bail!("No key stored for '{}'", group);
    }
    ws.session.remove_api_key(group);
    ws.save()?;
    println!("{} Removed key for {}", "✓".green(), group.bold());
    Ok(())
}

pub fn run_keys_list() -> Result<()> {
    let ws = Workspace::load()?;
    let keys = ws.session.api_keys();

    #[derive(Tabled)]
    struct KeyRow {
        #[tabled(rename = "Group")]
        group: String,
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Models")]
        models: String,
    }

    let mut groups: Vec<String> = ws
        .catalog()
        .credential_groups()
        .into_iter()
        .map(str::to_string)
        .collect();
    for group in keys.groups() {
        if !groups.iter().any(|g| g == group) {
            groups.push(group.to_string());
        }
    }

    let rows: Vec<KeyRow> = groups
        .iter()
        .map(|group| KeyRow {
            group: group.clone(),
            key: keys
                .get(group)
                .map(mask_key)
                .unwrap_or_else(|| "-".to_string()),
            models: ws
                .catalog()
                .models_in_group(group)
                .map(|m| m.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

/// Toggle models in or out of the saved selection
pub fn run_select(model_ids: &[String], clear: bool) -> Result<()> {
    let ws = Workspace::load()?;
    if clear {
        ws.session.clear_selections();
    }
    for id in model_ids {
        ws.model(id)?;
        let selected = ws.session.toggle_model_selection(id);
        let verb = if selected { "Selected" } else { "Unselected" };
        println!("{} {}", verb, id.bold());
    }
    ws.save()?;

    let selection = ws.session.selected_models();
    if selection.is_empty() {
        println!("No models selected");
    } else {
        let names: Vec<&str> = selection.iter().map(|m| m.name.as_str()).collect();
        println!("{} {}", "Selection:".bold(), names.join(", "));
    }
    Ok(())
}

/// Show, set, or clear the summarization model
pub fn run_summarizer(model_id: Option<&str>, clear: bool) -> Result<()> {
    let ws = Workspace::load()?;
    if clear {
        ws.session.set_summarization_model(None);
        ws.save()?;
        println!("Summarization model cleared");
        return Ok(());
    }
    match model_id {
        Some(id) => {
            let model = ws.model(id)?;
            ws.session.set_summarization_model(Some(id));
            ws.save()?;
            println!("{} Summaries will use {}", "✓".green(), model.name.bold());
        }
        None => match ws.session.summarization_model() {
            Some(model) => println!("{} ({})", model.name, model.id),
            None => println!("No summarization model set"),
        },
    }
    Ok(())
}
