//! Chat session facade.
//!
//! A `ChatSession` ties the conversation buffer to a provider: it appends the
//! user's turn, composes the request with the rendered system prompt and
//! reminder, calls the provider with retry, and appends the reply. It also
//! owns the session's sampling parameters and, when a store is attached, its
//! manual saves and rotating autosave.
//!
//! A failed completion leaves the user's turn in the buffer; there is no
//! rollback. If a store is attached an emergency save is attempted before
//! the error is returned.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};
use futures_util::StreamExt;
use parley_types::budget::BudgetParams;
use parley_types::error::StoreError;
use parley_types::llm::{CompletionRequest, LlmError, Role, StreamEvent};
use parley_types::params::ModelParameters;
use parley_types::record::SessionRecord;
use uuid::Uuid;

use super::autosave::Autosave;
use super::buffer::{ConversationBuffer, ModelChange};
use super::composer::compose;
use super::prompt::{Reminder, SystemPrompt};
use super::store::SaveStore;
use super::turn::Turn;
use crate::llm::provider::LlmProvider;
use crate::llm::retry::{RetryPolicy, with_retry};

/// Errors from chat session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no save store is attached to this session")]
    NoStore,
}

pub struct ChatSession<P, S> {
    provider: Arc<P>,
    buffer: ConversationBuffer,
    system_prompt: Option<SystemPrompt>,
    reminder: Option<Reminder>,
    params: ModelParameters,
    retry: RetryPolicy,
    store: Option<Arc<S>>,
    autosave: Option<Autosave>,
}

impl<P: LlmProvider, S: SaveStore> ChatSession<P, S> {
    pub fn new(provider: Arc<P>, buffer: ConversationBuffer) -> Self {
        Self {
            provider,
            buffer,
            system_prompt: None,
            reminder: None,
            params: ModelParameters::default(),
            retry: RetryPolicy::default(),
            store: None,
            autosave: None,
        }
    }

    /// Attach a save store, optionally with rotating autosave.
    pub fn with_store(mut self, store: Arc<S>, autosave: Option<Autosave>) -> Self {
        self.store = Some(store);
        self.autosave = autosave;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_params(mut self, params: ModelParameters) -> Self {
        self.params = params;
        self
    }

    // --- Configuration ---

    /// Replace or clear the system prompt, then re-trim. Returns the number
    /// of turns evicted.
    pub fn set_system_prompt(&mut self, raw: Option<String>) -> usize {
        self.system_prompt = raw.map(SystemPrompt::new);
        self.refresh_overhead()
    }

    /// Replace or clear the reminder, then re-trim.
    pub fn set_reminder(&mut self, raw: Option<String>) -> usize {
        self.reminder = raw.map(Reminder::new);
        self.refresh_overhead()
    }

    /// Switch models, recounting every live turn under the new model.
    pub fn set_model(&mut self, model: impl Into<String>) -> usize {
        let model = model.into();
        tracing::info!(from = %self.buffer.model(), to = %model, "changing model");
        let evicted = self.buffer.set_model(model, ModelChange::Recount);
        evicted + self.refresh_overhead()
    }

    pub fn set_budget(&mut self, budget: BudgetParams) -> usize {
        self.buffer.set_budget(budget)
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ModelParameters {
        &mut self.params
    }

    pub fn system_prompt(&self) -> Option<&SystemPrompt> {
        self.system_prompt.as_ref()
    }

    pub fn reminder(&self) -> Option<&Reminder> {
        self.reminder.as_ref()
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn model(&self) -> &str {
        self.buffer.model()
    }

    pub fn session_id(&self) -> Uuid {
        self.buffer.session_id()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn history(&self, role: Option<Role>, limit: Option<usize>, newest_first: bool) -> Vec<&Turn> {
        self.buffer.snapshot(role, limit, newest_first)
    }

    // --- Chatting ---

    /// Send `user_text` and return the full reply.
    pub async fn chat(&mut self, user_text: &str) -> Result<String, SessionError> {
        self.buffer.push(Role::User, user_text);
        let request = self.build_request(false);
        let provider = Arc::clone(&self.provider);

        let result = with_retry(self.retry, || provider.complete(&request)).await;
        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err).await),
        };

        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = %response.stop_reason,
            "completion finished"
        );
        self.buffer.push(Role::Assistant, response.content.clone());
        self.autosave_tick().await;
        Ok(response.content)
    }

    /// Send `user_text` and stream the reply, passing each text delta to
    /// `on_delta`. Returns the full reply.
    ///
    /// Only opening the stream is retried. A failure after text has started
    /// arriving discards the partial reply.
    pub async fn chat_stream<F>(&mut self, user_text: &str, mut on_delta: F) -> Result<String, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        self.buffer.push(Role::User, user_text);
        let request = self.build_request(true);
        let provider = Arc::clone(&self.provider);

        let opened = with_retry(self.retry, || {
            let mut stream = provider.stream(request.clone());
            async move {
                match stream.next().await {
                    Some(Ok(event)) => Ok((Some(event), stream)),
                    Some(Err(err)) => Err(err),
                    None => Ok((None, stream)),
                }
            }
        })
        .await;
        let (first, mut stream) = match opened {
            Ok(opened) => opened,
            Err(err) => return Err(self.fail(err).await),
        };

        let mut reply = String::new();
        let mut next = first;
        loop {
            match next {
                Some(StreamEvent::TextDelta { text }) => {
                    on_delta(&text);
                    reply.push_str(&text);
                }
                Some(StreamEvent::MessageDelta { stop_reason }) => {
                    tracing::debug!(%stop_reason, "stream stopping");
                }
                Some(StreamEvent::Usage(usage)) => {
                    tracing::debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "stream usage"
                    );
                }
                Some(StreamEvent::Done) | None => break,
            }
            next = match stream.next().await {
                Some(Ok(event)) => Some(event),
                Some(Err(err)) => return Err(self.fail(err).await),
                None => None,
            };
        }

        self.buffer.push(Role::Assistant, reply.clone());
        self.autosave_tick().await;
        Ok(reply)
    }

    /// The request that would be sent for the current buffer.
    pub fn build_request(&self, stream: bool) -> CompletionRequest {
        let now = Local::now().naive_local();
        self.build_request_at(stream, now)
    }

    fn build_request_at(&self, stream: bool, now: NaiveDateTime) -> CompletionRequest {
        let model = self.buffer.model();
        let counter = self.buffer.counter().as_ref();
        let system = self.system_prompt.as_ref().map(|p| p.turn(counter, model, now));
        let reminder = self.reminder.as_ref().map(|r| r.turn(counter, model, now));
        CompletionRequest {
            model: model.to_string(),
            messages: compose(&self.buffer, system.as_ref(), reminder.as_ref()),
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            presence_penalty: self.params.presence_penalty,
            frequency_penalty: self.params.frequency_penalty,
            stream,
        }
    }

    // --- Resetting ---

    /// Clear the conversation. Saves are untouched.
    pub fn reset(&mut self) {
        self.buffer.reset();
    }

    /// Back up and delete the autosave slots, then clear the conversation.
    pub async fn hard_reset(&mut self) -> Result<(), SessionError> {
        if let (Some(store), Some(autosave)) = (&self.store, &mut self.autosave) {
            autosave.backup(store.as_ref()).await?;
            autosave.clear(store.as_ref()).await?;
        }
        self.buffer.reset();
        Ok(())
    }

    // --- Persistence ---

    /// Full session state including prompts, stamped with the current time.
    pub fn to_record(&self) -> SessionRecord {
        stamped_record(&self.buffer, self.system_prompt.as_ref(), self.reminder.as_ref())
    }

    /// Restore state from a record.
    ///
    /// Prompts stored in the record replace the current ones; a record
    /// without prompts keeps whatever is set.
    pub fn load_record(&mut self, record: &SessionRecord) {
        if let Some(raw) = &record.system_prompt {
            self.system_prompt = Some(SystemPrompt::new(raw.clone()));
        }
        if let Some(raw) = &record.reminder {
            self.reminder = Some(Reminder::new(raw.clone()));
        }
        let (system, reminder) = self.prompt_costs(&record.model);
        self.buffer.load_record(record, system, reminder);
        tracing::info!(
            session_id = %self.buffer.session_id(),
            turns = self.buffer.len(),
            "session loaded"
        );
    }

    pub async fn save(&self, name: &str, overwrite: bool) -> Result<(), SessionError> {
        let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
        store.write(name, &self.to_record(), overwrite).await?;
        tracing::info!(name, "session saved");
        Ok(())
    }

    pub async fn load(&mut self, name: &str) -> Result<(), SessionError> {
        let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
        let record = store.read(name).await?;
        self.load_record(&record);
        Ok(())
    }

    pub async fn saves(&self) -> Result<Vec<String>, SessionError> {
        let store = self.store.as_ref().ok_or(SessionError::NoStore)?;
        Ok(store.names().await?)
    }

    /// Load the newest autosave slot, if any. Returns its name.
    pub async fn resume_autosave(&mut self) -> Result<Option<String>, SessionError> {
        let (Some(store), Some(autosave)) = (&self.store, &mut self.autosave) else {
            return Ok(None);
        };
        let Some((name, record)) = autosave.most_recent(store.as_ref()).await? else {
            return Ok(None);
        };
        self.load_record(&record);
        Ok(Some(name))
    }

    /// Multi-line diagnostics for the session.
    pub fn debug_report(&self) -> String {
        let budget = self.buffer.budget();
        let mut out = String::new();
        let _ = writeln!(out, "session id:      {}", self.buffer.session_id());
        let _ = writeln!(out, "provider:        {}", self.provider.name());
        let _ = writeln!(out, "model:           {}", self.buffer.model());
        let _ = writeln!(
            out,
            "budget:          ceiling {} / reserved {} / pad {} / max turns {}",
            budget.ceiling,
            budget.reserved_completion,
            budget.pad,
            budget
                .max_turns
                .map_or_else(|| "unlimited".to_string(), |n| n.to_string())
        );
        let _ = writeln!(out, "overhead tokens: {}", self.buffer.overhead_tokens());
        let _ = writeln!(out, "usable tokens:   {}", self.buffer.usable_tokens());
        let _ = writeln!(out, "total tokens:    {}", self.buffer.total_tokens());
        let _ = writeln!(out, "turns:           {}", self.buffer.len());
        let _ = writeln!(out, "evictions:       {}", self.buffer.eviction_count());
        let _ = writeln!(
            out,
            "last evicted:    {}",
            self.buffer
                .last_evicted()
                .map_or_else(|| "none".to_string(), |t| format!("[{}] {}", t.role(), t.preview(60)))
        );
        let _ = writeln!(
            out,
            "system prompt:   {}",
            self.system_prompt.as_ref().map_or("none", |p| p.raw())
        );
        let _ = writeln!(
            out,
            "reminder:        {}",
            self.reminder.as_ref().map_or("none", |r| r.raw())
        );
        let _ = writeln!(out, "params:");
        for line in self.params.describe() {
            let _ = writeln!(out, "  {line}");
        }
        out
    }

    fn refresh_overhead(&mut self) -> usize {
        let model = self.buffer.model().to_string();
        let (system, reminder) = self.prompt_costs(&model);
        self.buffer.set_overhead(system, reminder)
    }

    /// Token cost of the current system prompt and reminder under `model`.
    fn prompt_costs(&self, model: &str) -> (u32, u32) {
        let now = Local::now().naive_local();
        let counter = self.buffer.counter().as_ref();
        let system = self
            .system_prompt
            .as_ref()
            .map_or(0, |p| p.token_cost(counter, model));
        let reminder = self
            .reminder
            .as_ref()
            .map_or(0, |r| r.token_cost(counter, model, now));
        (system, reminder)
    }

    async fn autosave_tick(&mut self) {
        let (Some(store), Some(autosave)) = (&self.store, &mut self.autosave) else {
            return;
        };
        if !autosave.tick() {
            return;
        }
        let record = stamped_record(&self.buffer, self.system_prompt.as_ref(), self.reminder.as_ref());
        if let Err(err) = autosave.save_now(store.as_ref(), &record).await {
            tracing::warn!(error = %err, "autosave failed");
        }
    }

    /// Log a provider failure, attempt an emergency save, and hand the error
    /// back for returning.
    async fn fail(&self, err: LlmError) -> SessionError {
        tracing::error!(error = %err, provider = %self.provider.name(), "completion failed");
        if let Some(store) = &self.store {
            let name = format!("emergency_save_{}", Local::now().format("%d-%m-%Y_%H-%M-%S"));
            match store.write(&name, &self.to_record(), true).await {
                Ok(()) => tracing::warn!(name = %name, "wrote emergency save"),
                Err(save_err) => tracing::error!(error = %save_err, "emergency save failed"),
            }
        }
        SessionError::Llm(err)
    }
}

fn stamped_record(
    buffer: &ConversationBuffer,
    system_prompt: Option<&SystemPrompt>,
    reminder: Option<&Reminder>,
) -> SessionRecord {
    let mut record = buffer.to_record();
    record.system_prompt = system_prompt.map(|p| p.raw().to_string());
    record.reminder = reminder.map(|r| r.raw().to_string());
    record.saved_at = Some(Utc::now());
    record
}
