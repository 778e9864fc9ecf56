//! Bounded conversation buffer.
//!
//! An ordered queue of counted turns kept under two independent limits: the
//! usable token budget (see [`super::budget`]) and an optional cap on the
//! number of turns. Appends are always admitted; the eviction loop then pops
//! from the oldest end until both limits hold.
//!
//! The buffer is synchronous and does no locking. Callers that share one
//! across tasks wrap it (or the session owning it) in a mutex.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parley_types::budget::BudgetParams;
use parley_types::llm::{Message, Role};
use parley_types::record::SessionRecord;
use uuid::Uuid;

use super::budget::usable_for;
use super::turn::Turn;
use crate::tokens::TokenCounter;

/// How existing turns are treated when the model changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChange {
    /// Existing turns keep the counts made under the old model.
    KeepCounts,
    /// Every live turn is recounted under the new model, then trimmed.
    Recount,
}

pub struct ConversationBuffer {
    model: String,
    budget: BudgetParams,
    counter: Arc<dyn TokenCounter>,
    turns: VecDeque<Turn>,
    total_tokens: u64,
    system_tokens: u32,
    reminder_tokens: u32,
    usable_tokens: u32,
    eviction_count: u64,
    last_evicted: Option<Turn>,
    session_id: Uuid,
}

impl fmt::Debug for ConversationBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationBuffer")
            .field("model", &self.model)
            .field("budget", &self.budget)
            .field("turns", &self.turns.len())
            .field("total_tokens", &self.total_tokens)
            .field("usable_tokens", &self.usable_tokens)
            .field("eviction_count", &self.eviction_count)
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl ConversationBuffer {
    /// An empty buffer with no system or reminder overhead.
    pub fn new(
        model: impl Into<String>,
        budget: BudgetParams,
        counter: Arc<dyn TokenCounter>,
    ) -> Self {
        Self {
            model: model.into(),
            budget,
            counter,
            turns: VecDeque::new(),
            total_tokens: 0,
            system_tokens: 0,
            reminder_tokens: 0,
            usable_tokens: usable_for(&budget, 0),
            eviction_count: 0,
            last_evicted: None,
            session_id: Uuid::now_v7(),
        }
    }

    /// Rebuild a buffer from a validated record, recounting every turn.
    ///
    /// The record's limits are enforced on load, so a record saved under a
    /// larger budget comes back trimmed.
    pub fn from_record(record: &SessionRecord, counter: Arc<dyn TokenCounter>) -> Self {
        let mut buffer = Self::new(record.model.clone(), record.budget, counter);
        buffer.session_id = record.session_id;
        buffer.eviction_count = record.eviction_count;
        buffer.last_evicted = record.last_evicted.as_ref().map(|m| buffer.count_message(m));
        for message in &record.turns {
            let turn = buffer.count_message(message);
            buffer.total_tokens += u64::from(turn.token_count());
            buffer.turns.push_back(turn);
        }
        buffer.evict();
        buffer
    }

    /// Replace this buffer's whole state with a record's, trimming under
    /// the given prompt overhead.
    ///
    /// The overhead must be the cost of the prompts that go with the record,
    /// counted under the record's model.
    pub fn load_record(&mut self, record: &SessionRecord, system_tokens: u32, reminder_tokens: u32) {
        let mut loaded = Self::from_record(record, Arc::clone(&self.counter));
        loaded.system_tokens = system_tokens;
        loaded.reminder_tokens = reminder_tokens;
        loaded.recompute();
        *self = loaded;
    }

    /// Snapshot the buffer as a persistable record.
    ///
    /// Prompt and timestamp fields are left empty; the session fills them.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            model: self.model.clone(),
            budget: self.budget,
            turns: self.turns.iter().map(Turn::to_message).collect(),
            eviction_count: self.eviction_count,
            session_id: self.session_id,
            last_evicted: self.last_evicted.as_ref().map(Turn::to_message),
            system_prompt: None,
            reminder: None,
            saved_at: None,
        }
    }

    /// Append a turn, then evict until the limits hold.
    ///
    /// Returns the number of turns evicted by this call.
    pub fn append(&mut self, turn: Turn) -> usize {
        self.total_tokens += u64::from(turn.token_count());
        self.turns.push_back(turn);
        self.evict()
    }

    /// Count `content` under the current model and append it.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> usize {
        let turn = Turn::counted(role, content, &self.model, self.counter.as_ref());
        self.append(turn)
    }

    /// Read-only view of the turns.
    ///
    /// `role` keeps only turns of that role, `limit` caps the number
    /// returned, and `newest_first` walks from the tail.
    pub fn snapshot(&self, role: Option<Role>, limit: Option<usize>, newest_first: bool) -> Vec<&Turn> {
        let matches = |t: &&Turn| role.is_none_or(|r| t.role() == r);
        let limit = limit.unwrap_or(usize::MAX);
        if newest_first {
            self.turns.iter().rev().filter(matches).take(limit).collect()
        } else {
            self.turns.iter().filter(matches).take(limit).collect()
        }
    }

    /// Live turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Drop every turn and start a new session id. Budget and model stay.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.total_tokens = 0;
        self.eviction_count = 0;
        self.last_evicted = None;
        self.session_id = Uuid::now_v7();
        tracing::debug!(session_id = %self.session_id, "conversation buffer reset");
    }

    /// Set the system prompt and reminder costs, then re-trim.
    pub fn set_overhead(&mut self, system_tokens: u32, reminder_tokens: u32) -> usize {
        self.system_tokens = system_tokens;
        self.reminder_tokens = reminder_tokens;
        self.recompute()
    }

    /// Replace the budget parameters, then re-trim.
    pub fn set_budget(&mut self, budget: BudgetParams) -> usize {
        self.budget = budget;
        self.recompute()
    }

    /// Switch models. See [`ModelChange`] for what happens to live turns.
    ///
    /// Overhead is not recounted here; the owner of the prompts calls
    /// [`set_overhead`](Self::set_overhead) with costs for the new model.
    pub fn set_model(&mut self, model: impl Into<String>, change: ModelChange) -> usize {
        self.model = model.into();
        match change {
            ModelChange::KeepCounts => {
                tracing::debug!(model = %self.model, "model changed, keeping stale turn counts");
                0
            }
            ModelChange::Recount => self.recount(),
        }
    }

    /// Recount every live turn under the current model, then re-trim.
    pub fn recount(&mut self) -> usize {
        let counter = Arc::clone(&self.counter);
        for turn in self.turns.iter_mut() {
            *turn = turn.recounted(&self.model, counter.as_ref());
        }
        self.total_tokens = self.turns.iter().map(|t| u64::from(t.token_count())).sum();
        self.evict()
    }

    /// Count `text` under the current model.
    pub fn count(&self, text: &str) -> u32 {
        self.counter.count(&self.model, text)
    }

    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn budget(&self) -> BudgetParams {
        self.budget
    }

    pub fn usable_tokens(&self) -> u32 {
        self.usable_tokens
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn overhead_tokens(&self) -> u32 {
        self.system_tokens.saturating_add(self.reminder_tokens)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn eviction_count(&self) -> u64 {
        self.eviction_count
    }

    pub fn last_evicted(&self) -> Option<&Turn> {
        self.last_evicted.as_ref()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn count_message(&self, message: &Message) -> Turn {
        Turn::counted(
            message.role,
            message.content.clone(),
            &self.model,
            self.counter.as_ref(),
        )
    }

    fn recompute(&mut self) -> usize {
        self.usable_tokens = usable_for(&self.budget, self.overhead_tokens());
        self.evict()
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.total_tokens > u64::from(self.usable_tokens) && self.pop_head() {
            evicted += 1;
        }
        if let Some(max_turns) = self.budget.max_turns {
            while self.turns.len() > max_turns && self.pop_head() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::debug!(
                evicted,
                eviction_count = self.eviction_count,
                total_tokens = self.total_tokens,
                usable_tokens = self.usable_tokens,
                turns = self.turns.len(),
                "evicted turns from conversation buffer"
            );
        }
        evicted
    }

    fn pop_head(&mut self) -> bool {
        match self.turns.pop_front() {
            Some(turn) => {
                self.total_tokens -= u64::from(turn.token_count());
                self.eviction_count += 1;
                self.last_evicted = Some(turn);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::testing::{CharCounter, ModelAwareCounter};

    fn buffer(ceiling: u32, reserved: u32, pad: u32, max_turns: Option<usize>) -> ConversationBuffer {
        ConversationBuffer::new(
            "gpt-4",
            BudgetParams::new(ceiling, reserved, pad, max_turns),
            Arc::new(CharCounter),
        )
    }

    fn contents(buffer: &ConversationBuffer) -> Vec<String> {
        buffer.turns().map(|t| t.content().to_string()).collect()
    }

    #[test]
    fn test_scenario_token_eviction() {
        let mut buf = buffer(100, 20, 10, None);
        assert_eq!(buf.usable_tokens(), 70);

        for _ in 0..3 {
            assert_eq!(buf.append(Turn::new(Role::User, "a", 5)), 0);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_tokens(), 15);

        let evicted = buf.append(Turn::new(Role::Assistant, "big", 60));
        assert_eq!(evicted, 1);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_tokens(), 70);
        assert_eq!(buf.eviction_count(), 1);
        assert_eq!(buf.last_evicted().map(Turn::token_count), Some(5));
    }

    #[test]
    fn test_scenario_turn_cap() {
        let mut buf = buffer(10_000, 0, 0, Some(2));
        buf.push(Role::User, "1");
        buf.push(Role::Assistant, "2");
        buf.push(Role::User, "3");
        assert_eq!(contents(&buf), ["2", "3"]);
        assert_eq!(buf.eviction_count(), 1);
        assert_eq!(buf.last_evicted().map(Turn::content), Some("1"));
    }

    #[test]
    fn test_oversized_turn_empties_buffer() {
        let mut buf = buffer(100, 20, 10, None);
        buf.push(Role::User, "aaaaa");
        let evicted = buf.append(Turn::new(Role::User, "huge", 500));
        assert_eq!(evicted, 2);
        assert!(buf.is_empty());
        assert_eq!(buf.total_tokens(), 0);
        assert_eq!(buf.last_evicted().map(Turn::content), Some("huge"));
    }

    #[test]
    fn test_budget_invariant_holds_after_every_append() {
        let mut buf = buffer(200, 50, 25, Some(7));
        let sizes = [3u32, 40, 90, 1, 60, 125, 2, 2, 2, 2, 2, 2, 2, 80, 30];
        for (i, size) in sizes.iter().enumerate() {
            buf.append(Turn::new(Role::User, format!("t{i}"), *size));
            assert!(buf.total_tokens() <= u64::from(buf.usable_tokens()));
            assert!(buf.len() <= 7);
            let sum: u64 = buf.turns().map(|t| u64::from(t.token_count())).sum();
            assert_eq!(sum, buf.total_tokens());
        }
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let mut buf = buffer(10_000, 0, 0, Some(3));
        for i in 0..6 {
            buf.push(Role::User, format!("m{i}"));
            if i >= 3 {
                let expected = format!("m{}", i - 3);
                assert_eq!(buf.last_evicted().map(Turn::content), Some(expected.as_str()));
            }
        }
        assert_eq!(contents(&buf), ["m3", "m4", "m5"]);
        assert_eq!(buf.eviction_count(), 3);
    }

    #[test]
    fn test_snapshot_filters_and_orders() {
        let mut buf = buffer(10_000, 0, 0, None);
        buf.push(Role::User, "u1");
        buf.push(Role::Assistant, "a1");
        buf.push(Role::User, "u2");
        buf.push(Role::Assistant, "a2");

        let users: Vec<&str> = buf
            .snapshot(Some(Role::User), None, false)
            .into_iter()
            .map(Turn::content)
            .collect();
        assert_eq!(users, ["u1", "u2"]);

        let newest: Vec<&str> = buf
            .snapshot(None, Some(3), true)
            .into_iter()
            .map(Turn::content)
            .collect();
        assert_eq!(newest, ["a2", "u2", "a1"]);

        assert!(buf.snapshot(Some(Role::System), None, false).is_empty());
        assert!(buf.snapshot(None, Some(0), false).is_empty());
        assert_eq!(buf.eviction_count(), 0);
    }

    #[test]
    fn test_reset_keeps_budget_and_model() {
        let mut buf = buffer(20, 0, 0, Some(2));
        buf.push(Role::User, "aaaaaaaaaa");
        buf.push(Role::User, "bbbbbbbbbb");
        buf.push(Role::User, "c");
        let old_id = buf.session_id();
        assert!(buf.eviction_count() > 0);

        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.total_tokens(), 0);
        assert_eq!(buf.eviction_count(), 0);
        assert!(buf.last_evicted().is_none());
        assert_ne!(buf.session_id(), old_id);
        assert_eq!(buf.model(), "gpt-4");
        assert_eq!(buf.budget(), BudgetParams::new(20, 0, 0, Some(2)));
    }

    #[test]
    fn test_overhead_change_trims_immediately() {
        let mut buf = buffer(100, 20, 10, None);
        for _ in 0..7 {
            buf.push(Role::User, "aaaaaaaaaa");
        }
        assert_eq!(buf.total_tokens(), 70);

        let evicted = buf.set_overhead(15, 10);
        assert_eq!(buf.usable_tokens(), 45);
        assert_eq!(evicted, 3);
        assert_eq!(buf.total_tokens(), 40);
    }

    #[test]
    fn test_budget_change_trims_immediately() {
        let mut buf = buffer(100, 0, 0, None);
        for _ in 0..5 {
            buf.push(Role::User, "aaaaaaaaaa");
        }
        buf.set_budget(BudgetParams::new(100, 60, 10, Some(1)));
        assert_eq!(buf.usable_tokens(), 30);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_negative_budget_uses_floor() {
        let buf = buffer(100, 500, 0, None);
        assert_eq!(buf.usable_tokens(), super::super::budget::USABLE_FLOOR);
    }

    #[test]
    fn test_model_change_keep_counts() {
        let mut buf = ConversationBuffer::new(
            "single",
            BudgetParams::new(10_000, 0, 0, None),
            Arc::new(ModelAwareCounter),
        );
        buf.push(Role::User, "abcd");
        buf.set_model("double", ModelChange::KeepCounts);
        assert_eq!(buf.total_tokens(), 4);
        buf.push(Role::User, "abcd");
        assert_eq!(buf.total_tokens(), 12);
    }

    #[test]
    fn test_model_change_recount_then_trim() {
        let mut buf = ConversationBuffer::new(
            "single",
            BudgetParams::new(20, 0, 0, None),
            Arc::new(ModelAwareCounter),
        );
        buf.push(Role::User, "aaaaa");
        buf.push(Role::User, "bbbbb");
        buf.push(Role::User, "ccccc");
        assert_eq!(buf.total_tokens(), 15);

        let evicted = buf.set_model("double", ModelChange::Recount);
        assert_eq!(evicted, 1);
        assert_eq!(buf.total_tokens(), 20);
        assert_eq!(contents(&buf), ["bbbbb", "ccccc"]);
        assert_eq!(buf.model(), "double");
    }

    #[test]
    fn test_record_round_trip() {
        let mut buf = buffer(30, 0, 0, Some(3));
        for i in 0..5 {
            buf.push(Role::User, format!("turn number {i}"));
        }
        let record = buf.to_record();
        let json = record.to_json_pretty().unwrap();
        let parsed = SessionRecord::from_json(&json).unwrap();
        let restored = ConversationBuffer::from_record(&parsed, Arc::new(CharCounter));

        assert_eq!(contents(&restored), contents(&buf));
        assert_eq!(restored.model(), buf.model());
        assert_eq!(restored.budget(), buf.budget());
        assert_eq!(restored.eviction_count(), buf.eviction_count());
        assert_eq!(restored.session_id(), buf.session_id());
        assert_eq!(restored.total_tokens(), buf.total_tokens());
        assert_eq!(
            restored.last_evicted().map(Turn::content),
            buf.last_evicted().map(Turn::content)
        );
    }

    #[test]
    fn test_empty_round_trip() {
        let buf = buffer(100, 20, 10, None);
        let record = SessionRecord::from_json(&buf.to_record().to_json_pretty().unwrap()).unwrap();
        let restored = ConversationBuffer::from_record(&record, Arc::new(CharCounter));
        assert!(restored.is_empty());
        assert_eq!(restored.session_id(), buf.session_id());
        assert_eq!(restored.budget(), buf.budget());
    }

    #[test]
    fn test_load_record_applies_overhead() {
        let mut buf = buffer(100, 0, 0, None);
        buf.set_overhead(70, 0);
        let mut source = buffer(100, 0, 0, None);
        for _ in 0..9 {
            source.push(Role::User, "aaaaaaaaaa");
        }
        buf.load_record(&source.to_record(), 40, 0);
        assert_eq!(buf.usable_tokens(), 60);
        assert_eq!(buf.total_tokens(), 60);
        assert_eq!(buf.session_id(), source.session_id());
    }
}
