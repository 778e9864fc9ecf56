//! Builds chat sessions from templates.

use std::sync::Arc;

use parley_types::config::{AppConfig, AutosaveConfig};
use parley_types::template::Template;

use crate::chat::autosave::Autosave;
use crate::chat::buffer::ConversationBuffer;
use crate::chat::session::ChatSession;
use crate::chat::store::SaveStore;
use crate::llm::provider::LlmProvider;
use crate::llm::retry::RetryPolicy;
use crate::tokens::TokenCounter;

/// Per-session choices that override the template and config defaults.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub model: Option<String>,
    /// `Some(None)` starts without a system prompt.
    pub system_prompt: Option<Option<String>>,
    pub reminder: Option<Option<String>>,
    /// Autosave slot prefix, for callers that run several sessions at once.
    pub autosave_name: Option<String>,
}

/// Shared wiring for every session a process creates.
pub struct SessionFactory<P, S> {
    provider: Arc<P>,
    counter: Arc<dyn TokenCounter>,
    store: Option<Arc<S>>,
    default_model: Option<String>,
    default_system_prompt: String,
    autosave: AutosaveConfig,
    retry: RetryPolicy,
}

impl<P: LlmProvider, S: SaveStore> SessionFactory<P, S> {
    pub fn new(provider: Arc<P>, counter: Arc<dyn TokenCounter>, config: &AppConfig) -> Self {
        Self {
            provider,
            counter,
            store: None,
            default_model: config.default_model.clone(),
            default_system_prompt: config.default_system_prompt.clone(),
            autosave: config.autosave.clone(),
            retry: RetryPolicy::from(config.retry),
        }
    }

    /// Sessions built from now on save into `store` and autosave.
    pub fn with_store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn store(&self) -> Option<&Arc<S>> {
        self.store.as_ref()
    }

    /// The model a session would run: override, then config, then template.
    pub fn resolve_model(&self, template: &Template, overrides: &SessionOverrides) -> String {
        overrides
            .model
            .clone()
            .or_else(|| self.default_model.clone())
            .unwrap_or_else(|| template.model.clone())
    }

    pub fn build(&self, template: &Template, overrides: SessionOverrides) -> ChatSession<P, S> {
        let model = self.resolve_model(template, &overrides);
        let buffer = ConversationBuffer::new(
            model.clone(),
            template.buffer.budget(),
            Arc::clone(&self.counter),
        );
        let mut params = template.completion.params();
        params.stream = true;

        let mut session = ChatSession::new(Arc::clone(&self.provider), buffer)
            .with_params(params)
            .with_retry(self.retry);
        if let Some(store) = &self.store {
            let mut autosave = self.autosave.clone();
            if let Some(name) = overrides.autosave_name {
                autosave.name = name;
            }
            session = session.with_store(Arc::clone(store), Some(Autosave::new(&autosave)));
        }

        let system_prompt = overrides
            .system_prompt
            .unwrap_or_else(|| Some(self.default_system_prompt.clone()));
        let reminder = overrides
            .reminder
            .unwrap_or_else(|| template.buffer.reminder.clone());
        session.set_system_prompt(system_prompt);
        session.set_reminder(reminder);

        tracing::info!(
            template = %template.name,
            model = %model,
            session_id = %session.session_id(),
            "created chat session"
        );
        session
    }
}

#[cfg(test)]
mod tests {
    use parley_types::config::RetryConfig;

    use super::*;
    use crate::chat::store::testing::MemoryStore;
    use crate::llm::mock::ScriptedProvider;
    use crate::template::registry::TemplateRegistry;
    use crate::tokens::testing::CharCounter;

    fn factory(config: &AppConfig) -> SessionFactory<ScriptedProvider, MemoryStore> {
        SessionFactory::new(
            Arc::new(ScriptedProvider::replies(&["hello there"])),
            Arc::new(CharCounter),
            config,
        )
    }

    fn small() -> Template {
        TemplateRegistry::builtin().get("gpt-4_small").clone()
    }

    #[test]
    fn test_budget_and_params_from_template() {
        let session = factory(&AppConfig::default()).build(&small(), SessionOverrides::default());
        let budget = session.buffer().budget();
        assert_eq!(budget.ceiling, 4_000);
        assert_eq!(budget.reserved_completion, 500);
        assert_eq!(session.model(), "gpt-4");
        assert_eq!(session.params().max_tokens, Some(500));
        assert!(session.params().stream);
        assert!(!session.has_store());
    }

    #[test]
    fn test_model_resolution_order() {
        let mut config = AppConfig::default();
        let template = small();
        assert_eq!(
            factory(&config).resolve_model(&template, &SessionOverrides::default()),
            "gpt-4"
        );

        config.default_model = Some("gpt-4o".to_string());
        let f = factory(&config);
        assert_eq!(f.resolve_model(&template, &SessionOverrides::default()), "gpt-4o");

        let overrides = SessionOverrides {
            model: Some("gpt-4o-mini".to_string()),
            ..Default::default()
        };
        assert_eq!(f.resolve_model(&template, &overrides), "gpt-4o-mini");
    }

    #[test]
    fn test_default_prompt_and_template_reminder() {
        let mut template = small();
        template.buffer.reminder = Some("stay on topic".to_string());
        let session = factory(&AppConfig::default()).build(&template, SessionOverrides::default());

        let prompt = session.system_prompt().unwrap();
        assert!(prompt.raw().contains("||model||"));
        assert_eq!(session.reminder().unwrap().raw(), "stay on topic");
        assert!(session.buffer().overhead_tokens() > 0);
    }

    #[test]
    fn test_overrides_clear_prompts() {
        let mut template = small();
        template.buffer.reminder = Some("stay on topic".to_string());
        let overrides = SessionOverrides {
            system_prompt: Some(None),
            reminder: Some(None),
            ..Default::default()
        };
        let session = factory(&AppConfig::default()).build(&template, overrides);
        assert!(session.system_prompt().is_none());
        assert!(session.reminder().is_none());
        assert_eq!(session.buffer().overhead_tokens(), 0);
    }

    #[tokio::test]
    async fn test_store_enables_autosave() {
        let config = AppConfig {
            autosave: AutosaveConfig {
                frequency: 1,
                slots: 2,
                name: "auto_save".to_string(),
            },
            retry: RetryConfig {
                attempts: 1,
                delay_secs: 0,
            },
            ..AppConfig::default()
        };
        let store = Arc::new(MemoryStore::default());
        let f = factory(&config).with_store(Arc::clone(&store));
        let overrides = SessionOverrides {
            autosave_name: Some("channel_42".to_string()),
            ..Default::default()
        };
        let mut session = f.build(&small(), overrides);
        assert!(session.has_store());

        session.chat("hi").await.unwrap();
        assert!(store.exists("channel_42_0").await.unwrap());
    }
}
