/// The maximum character length allowed for a single Discord message.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Splits `text` into consecutive pieces of at most `max_chars` characters each,
/// never cutting through a UTF-8 sequence.
pub fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut iter = text.chars();
    let mut pos = 0;

    while pos < text.len() {
        let len: usize = iter.by_ref().take(max_chars).map(char::len_utf8).sum();
        chunks.push(&text[pos..pos + len]);
        pos += len;
    }

    chunks
}
