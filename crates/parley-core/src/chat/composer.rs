//! Request payload assembly.

use parley_types::llm::Message;

use super::buffer::ConversationBuffer;
use super::turn::Turn;

/// Build the message list for a completion request.
///
/// Order is the system turn, then the buffer's turns oldest first, then the
/// reminder. Absent slots are skipped. The buffer is only read.
pub fn compose(
    buffer: &ConversationBuffer,
    system: Option<&Turn>,
    reminder: Option<&Turn>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(buffer.len() + 2);
    messages.extend(system.map(Turn::to_message));
    messages.extend(buffer.turns().map(Turn::to_message));
    messages.extend(reminder.map(Turn::to_message));
    messages
}
