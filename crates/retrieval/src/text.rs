//! Text normalization shared by matching, tools and memory.

use unicode_normalization::UnicodeNormalization;

/// Reduce text to an ASCII slug: `"Bảy Viên Ngọc Rồng"` -> `"bay-vien-ngoc-rong"`.
///
/// Performs:
/// - `đ`/`Đ` mapped to `d`, which has no decomposition
/// - Unicode NFKD decomposition, dropping everything non-ASCII (diacritics)
/// - Lowercase conversion
/// - Runs of non-alphanumerics collapsed into a single `-`, trimmed at both ends
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    let folded = text
        .chars()
        .map(|c| if matches!(c, 'đ' | 'Đ') { 'd' } else { c });
    for c in folded.nfkd().filter(|c| c.is_ascii()) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Cap text at `max_chars` characters.
///
/// Longer text keeps its first `max_chars - 3` characters followed by
/// `...`, so the result never exceeds the budget.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
