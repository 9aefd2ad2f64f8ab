/// Normalize a title for lookups and cache keys.
///
/// Lowercases, drops punctuation, and collapses runs of whitespace, so
/// "Dr. STONE " and "dr stone" produce the same key.
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a chapter number without a trailing ".0" for whole chapters.
pub fn format_chapter_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        format!("{number}")
    }
}
