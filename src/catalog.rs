//! Model catalog
//!
//! Built-in model descriptors plus whatever the user adds in `config.toml`.
//! The catalog is built once at startup and never changes afterwards.

use crate::llm::{ModelDescriptor, ProviderKind};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const GEMINI_MODELS_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEEPSEEK_CHAT_URL: &str = "https://api.deepseek.com/v1/chat/completions";
const MISTRAL_CHAT_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const COHERE_GENERATE_URL: &str = "https://api.cohere.ai/v1/generate";

#[derive(Debug, Clone)]
pub struct Catalog {
    models: Vec<ModelDescriptor>,
}

impl Catalog {
    /// The models shipped with polyprompt
    pub fn builtin() -> Self {
        Self {
            models: builtin_models(),
        }
    }

    /// Built-in models with user entries layered on top
    ///
    /// An entry whose id matches a built-in model replaces it in place; any
    /// other entry is appended.
    pub fn with_overrides(overrides: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        let mut catalog = Self::builtin();
        for model in overrides {
            match catalog.models.iter_mut().find(|m| m.id == model.id) {
                Some(existing) => *existing = model,
                None => catalog.models.push(model),
            }
        }
        catalog
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Display name for a model id, falling back to the id itself
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|m| m.name.as_str()).unwrap_or(id)
    }

    /// Distinct credential groups, in catalog order
    pub fn credential_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = Vec::new();
        for model in &self.models {
            if !groups.contains(&model.api_key_name.as_str()) {
                groups.push(&model.api_key_name);
            }
        }
        groups
    }

    /// Models that authenticate with the given credential group
    pub fn models_in_group<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = &'a ModelDescriptor> + 'a {
        self.models.iter().filter(move |m| m.api_key_name == group)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn gemini_endpoint(model: &str) -> String {
    format!("{GEMINI_MODELS_URL}/{model}:generateContent")
}

fn builtin_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("gpt-4o", "GPT-4o", ProviderKind::OpenAi, "openai", OPENAI_CHAT_URL)
            .with_description("OpenAI's flagship multimodal model"),
        ModelDescriptor::new(
            "gpt-4o-mini",
            "GPT-4o Mini",
            ProviderKind::OpenAi,
            "openai",
            OPENAI_CHAT_URL,
        )
        .with_description("Small, fast, and cheap GPT-4o variant"),
        ModelDescriptor::new(
            "claude-3-5-sonnet-20241022",
            "Claude 3.5 Sonnet",
            ProviderKind::Anthropic,
            "anthropic",
            ANTHROPIC_MESSAGES_URL,
        )
        .with_description("Anthropic's most capable mid-size model"),
        ModelDescriptor::new(
            "claude-3-5-haiku-20241022",
            "Claude 3.5 Haiku",
            ProviderKind::Anthropic,
            "anthropic",
            ANTHROPIC_MESSAGES_URL,
        )
        .with_description("Anthropic's fastest model"),
        ModelDescriptor::new(
            "gemini-1.5-pro",
            "Gemini 1.5 Pro",
            ProviderKind::Google,
            "google",
            gemini_endpoint("gemini-1.5-pro"),
        )
        .with_description("Google's long-context reasoning model"),
        ModelDescriptor::new(
            "gemini-1.5-flash",
            "Gemini 1.5 Flash",
            ProviderKind::Google,
            "google",
            gemini_endpoint("gemini-1.5-flash"),
        )
        .with_description("Google's fast multimodal model"),
        ModelDescriptor::new(
            "deepseek-chat",
            "DeepSeek Chat",
            ProviderKind::Deepseek,
            "deepseek",
            DEEPSEEK_CHAT_URL,
        )
        .with_description("DeepSeek's general chat model"),
        ModelDescriptor::new(
            "mistral-large-latest",
            "Mistral Large",
            ProviderKind::Mistral,
            "mistral",
            MISTRAL_CHAT_URL,
        )
        .with_description("Mistral's top-tier reasoning model"),
        ModelDescriptor::new(
            "command",
            "Cohere Command",
            ProviderKind::Cohere,
            "cohere",
            COHERE_GENERATE_URL,
        )
        .with_description("Cohere's instruction-following generation model"),
    ]
}
