use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no JSON object found in response")]
    NoObject,
    #[error("JSON object starting at byte {0} is never closed")]
    Unbalanced(usize),
}

/// Find the first balanced `{ ... }` block in free text.
///
/// Braces inside JSON string literals (including escaped quotes) do not
/// count towards nesting, so `{"comment": "use {braces}"}` is returned whole.
/// If the first opening brace never balances, the next one is tried.
pub fn extract_json_object(text: &str) -> Result<&str, ExtractError> {
    let bytes = text.as_bytes();
    let mut search_from = 0;
    let mut first_unbalanced = None;

    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        match balanced_end(bytes, start) {
            Some(end) => return Ok(&text[start..=end]),
            None => {
                first_unbalanced.get_or_insert(start);
                search_from = start + 1;
            }
        }
    }

    match first_unbalanced {
        Some(start) => Err(ExtractError::Unbalanced(start)),
        None => Err(ExtractError::NoObject),
    }
}

fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
