//! Splitting replies into Discord-sized messages.

/// Largest piece sent in one Discord message, under the 2000-char limit.
pub const MAX_MESSAGE_CHARS: usize = 1990;

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Cuts after the last newline or space in the second half of a window when
/// there is one, otherwise at the character limit. Joining the pieces gives
/// back `text`. Empty input gives no pieces.
pub fn split_response(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some((hard, _)) = rest.char_indices().nth(max_chars) {
        let cut = rest[..hard]
            .rfind(['\n', ' '])
            .map(|i| i + 1)
            .filter(|&i| i > hard / 2)
            .unwrap_or(hard);
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}
