//! Command-line tokenization.
//!
//! Tool invocations arrive as a single pre-joined string, not a pre-split
//! argument vector, so a naive whitespace split would break arguments like
//! `-top "my module"`. The splitter below honors double-quoted substrings
//! that span whitespace: a quoted argument is accumulated across tokens
//! until the closing quote token is found, and the quote characters are
//! stripped from the emitted argument.

/// Split a pre-joined command line into a program and its arguments.
///
/// Returns `None` when the line contains no tokens at all.
pub fn split_command_line(command_line: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = tokenize(command_line).into_iter();
    let program = tokens.next()?;
    Some((program, tokens.collect()))
}

/// Tokenize `command_line`, merging double-quoted spans.
pub fn tokenize(command_line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut pending: Option<String> = None;

    for token in command_line.split_whitespace() {
        match pending.take() {
            Some(mut accumulated) => {
                accumulated.push(' ');
                if let Some(stripped) = token.strip_suffix('"') {
                    accumulated.push_str(stripped);
                    result.push(accumulated);
                } else {
                    accumulated.push_str(token);
                    pending = Some(accumulated);
                }
            }
            None => {
                if let Some(rest) = token.strip_prefix('"') {
                    if let Some(inner) = rest.strip_suffix('"') {
                        // Fully quoted single token
                        result.push(inner.to_string());
                    } else {
                        pending = Some(rest.to_string());
                    }
                } else {
                    result.push(token.to_string());
                }
            }
        }
    }

    // Unterminated quote: emit what was accumulated rather than dropping it
    if let Some(accumulated) = pending {
        result.push(accumulated);
    }

    result
}
