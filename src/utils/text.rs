/// First `max_chars` characters of `text`, with `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("Maison Margiela", 6), "Maison...");
        assert_eq!(preview("Hermès", 10), "Hermès");
        assert_eq!(preview("èèèè", 2), "èè...");
    }
}
