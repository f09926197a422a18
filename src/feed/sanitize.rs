use scraper::Html;

pub const MAX_CONTENT_CHARS: usize = 3000;

/// Strips markup from feed content: every text node is trimmed, empty nodes
/// are dropped, the rest joined by single spaces and cut to
/// [`MAX_CONTENT_CHARS`] characters. The HTML parser recovers from any
/// malformed input, so this never fails.
pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(raw);
    let text = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    truncate_chars(&text, MAX_CONTENT_CHARS)
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
