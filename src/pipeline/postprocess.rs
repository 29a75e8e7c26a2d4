//! Post-processing: deterministic cleanup of recognised text.
//!
//! OCR engines leave artefacts that confuse line-based analysis without
//! being content: Windows line endings from the remote provider, zero-width
//! characters around Vietnamese diacritics, trailing spaces from column
//! padding. The rules here remove them.
//!
//! Rules never add, drop, or reorder lines (blank lines included), so the
//! analyzer sees the same line structure the engine produced.

/// Apply all cleanup rules to reconciled OCR text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, joiners)
/// 3. Trim trailing whitespace per line
pub fn clean_ocr_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    trim_trailing_whitespace(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

/// Characters with no visible content that engines leak into their text.
pub(crate) const INVISIBLE_CHARS: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

fn remove_invisible_chars(input: &str) -> String {
    input.replace(INVISIBLE_CHARS, "")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

// `split('\n')` rather than `lines()` so a trailing empty line survives.
fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_vietnamese_text_untouched() {
        let input = "Câu 1: Thủ đô của Việt Nam là gì?";
        assert_eq!(clean_ocr_text(input), input);
    }

    #[test]
    fn test_line_count_preserved() {
        let input = "Câu 1?\r\n\r\nA. Hà Nội   \r\nB. Huế\u{200B}\n";
        let result = clean_ocr_text(input);
        assert_eq!(result, "Câu 1?\n\nA. Hà Nội\nB. Huế\n");
        assert_eq!(result.split('\n').count(), 5);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_ocr_text(""), "");
    }
}
