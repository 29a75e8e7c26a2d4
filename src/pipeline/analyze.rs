//! Quiz content analysis: recognised text → question, options, answer.
//!
//! Pure functions only. Nothing here touches I/O, so the heuristics can be
//! exercised directly on strings.
//!
//! ## Heuristics
//!
//! 1. Lines are trimmed and empty lines dropped; order is preserved.
//! 2. The question is the first line containing `?` or a word starting
//!    with `question` / `câu` (any case). First match wins.
//! 3. Every line whose start looks like `A.`, `b)`, `3.` … contributes one
//!    option (label stripped), in line order, duplicates kept. The question
//!    line is scanned too.
//! 4. The correct answer is the last option labelled `A` or `1`, else the
//!    first option. This is a placeholder guess for a human to correct, not
//!    answer-key detection.
//! 5. No question line → first line (or `""`). No options → four
//!    placeholders with the first marked correct.

use crate::output::QuizExtraction;
use once_cell::sync::Lazy;
use regex::Regex;

/// Options substituted when none are detected.
pub const PLACEHOLDER_OPTIONS: [&str; 4] = ["Option A", "Option B", "Option C", "Option D"];

static RE_QUESTION_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:question|câu)").unwrap());

static RE_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Da-d1-4])[.)]\s*(.*\S)").unwrap());

/// Analyse a block of recognised text.
///
/// ```rust
/// use quiz_ocr::analyze_quiz;
///
/// let quiz = analyze_quiz("Question: What is 2+2?\nA. 3\nB. 4\nC. 5\nD. 6");
/// assert_eq!(quiz.question, "Question: What is 2+2?");
/// assert_eq!(quiz.options, ["3", "4", "5", "6"]);
/// assert_eq!(quiz.correct_answer, "3");
/// ```
pub fn analyze_quiz(text: &str) -> QuizExtraction {
    let lines: Vec<&str> = text.lines().collect();
    analyze_lines(&lines)
}

/// Analyse text that has already been split into lines.
pub fn analyze_lines<S: AsRef<str>>(lines: &[S]) -> QuizExtraction {
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .collect();

    let question = lines
        .iter()
        .find(|l| is_question_line(l))
        .or_else(|| lines.first())
        .map(|l| l.to_string())
        .unwrap_or_default();

    let labelled: Vec<(char, String)> = lines.iter().filter_map(|l| parse_option(l)).collect();

    let (options, correct_answer) = if labelled.is_empty() {
        let options: Vec<String> = PLACEHOLDER_OPTIONS.iter().map(|s| s.to_string()).collect();
        let correct = options[0].clone();
        (options, correct)
    } else {
        // Each later `A` label overrides an earlier one.
        let correct = labelled
            .iter()
            .rev()
            .find(|(label, _)| matches!(label, 'A' | 'a' | '1'))
            .unwrap_or(&labelled[0])
            .1
            .clone();
        (labelled.into_iter().map(|(_, text)| text).collect(), correct)
    };

    QuizExtraction {
        question,
        options,
        correct_answer,
        total_lines: lines.len(),
    }
}

fn is_question_line(line: &str) -> bool {
    line.contains('?') || RE_QUESTION_KEYWORD.is_match(line)
}

/// Split an option line into its label and text, or `None` if the line is
/// not an option.
fn parse_option(line: &str) -> Option<(char, String)> {
    let caps = RE_OPTION.captures(line)?;
    let label = caps[1].chars().next()?;
    Some((label, caps[2].trim().to_string()))
}
