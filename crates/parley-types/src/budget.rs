//! Token budget parameters for a conversation buffer.

use serde::{Deserialize, Serialize};

/// Default context ceiling in tokens.
pub const DEFAULT_CEILING: u32 = 8_000;

/// Default number of tokens held back for the model's reply.
pub const DEFAULT_RESERVED_COMPLETION: u32 = 1_000;

/// Default safety pad subtracted from the ceiling.
pub const DEFAULT_PAD: u32 = 500;

/// Default cap on the number of live turns.
pub const DEFAULT_MAX_TURNS: usize = 200;

/// Inputs to the budget policy.
///
/// `max_turns = None` means the turn count is unbounded; only the token
/// ceiling applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetParams {
    pub ceiling: u32,
    pub reserved_completion: u32,
    pub pad: u32,
    pub max_turns: Option<usize>,
}

impl BudgetParams {
    pub fn new(ceiling: u32, reserved_completion: u32, pad: u32, max_turns: Option<usize>) -> Self {
        Self {
            ceiling,
            reserved_completion,
            pad,
            max_turns,
        }
    }
}

impl Default for BudgetParams {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            reserved_completion: DEFAULT_RESERVED_COMPLETION,
            pad: DEFAULT_PAD,
            max_turns: Some(DEFAULT_MAX_TURNS),
        }
    }
}
