const MAX_DETAIL_LENGTH: usize = 300;

/// Shorten free text for status slots and log lines. Cuts on a char boundary.
pub fn truncate_detail(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_DETAIL_LENGTH) {
        None => text.to_string(),
        Some((cut, _)) => format!(
            "{}... [truncated {} chars]",
            &text[..cut],
            text[cut..].chars().count()
        ),
    }
}
