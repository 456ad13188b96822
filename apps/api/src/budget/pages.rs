//! Symbols-to-pages heuristics.
#![allow(dead_code)]
//!
//! A "page" here is the human-facing unit the customer orders in. The mapping
//! to generated text is empirical: an A4 page with 3/1.5/2/2 cm margins and
//! one-and-a-half line spacing holds roughly 1200–1300 characters once LaTeX
//! headings and paragraph breaks are accounted for. Page counts are estimated
//! on the *stripped* text — LaTeX control sequences and brace groups do not
//! occupy reader-visible space.

use serde::{Deserialize, Serialize};

/// Tunable knobs of the page-budget engine.
///
/// Defaults match the calibrated production values; override individual
/// fields only when recalibrating against a different document shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Characters of stripped text per rendered page.
    pub symbols_per_page: f32,
    /// Pages consumed by the title page.
    pub title_page_pages: f32,
    /// Base pages consumed by the table of contents.
    pub toc_base_pages: f32,
    /// Additional TOC pages per chapter.
    pub toc_per_chapter: f32,
    /// Hard ceiling multiplier — chapter generation stops once the running
    /// total reaches `content_target × overshoot_tolerance`.
    pub overshoot_tolerance: f32,
    /// A chapter below `target × subsection_threshold` pages gets subsections.
    pub subsection_threshold: f32,
    /// Fresh LLM attempts per chapter/subsection before keeping invalid output.
    pub max_validation_attempts: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            symbols_per_page: 1250.0,
            title_page_pages: 1.0,
            toc_base_pages: 0.5,
            toc_per_chapter: 0.05,
            overshoot_tolerance: 1.15,
            subsection_threshold: 0.7,
            max_validation_attempts: 3,
        }
    }
}

/// Estimates how many content pages a LaTeX fragment occupies.
///
/// Strips control sequences and brace groups first, so the estimate is
/// invariant to command syntax: `\section{X} plain text` counts the same
/// as `plain text`.
pub fn count_pages_in_text(text: &str, config: &BudgetConfig) -> f32 {
    let stripped = strip_latex_commands(text);
    stripped.chars().count() as f32 / config.symbols_per_page
}

/// Estimates the total page count of a complete document: content plus the
/// title page and the TOC (which grows slightly with the chapter count).
pub fn count_total_pages_in_document(
    content: &str,
    num_chapters: usize,
    config: &BudgetConfig,
) -> f32 {
    let toc_pages = config.toc_base_pages + num_chapters as f32 * config.toc_per_chapter;
    config.title_page_pages + toc_pages + count_pages_in_text(content, config)
}

/// How many *content* pages must be generated so the finished document
/// (title page + TOC + content) lands on `total_target_pages`. Floored at 1.0.
pub fn calculate_content_pages_for_target(
    total_target_pages: u32,
    num_chapters: usize,
    config: &BudgetConfig,
) -> f32 {
    let toc_pages = config.toc_base_pages + num_chapters as f32 * config.toc_per_chapter;
    let service_pages = config.title_page_pages + toc_pages;
    (total_target_pages as f32 - service_pages).max(1.0)
}

/// Removes LaTeX control sequences and brace groups, then collapses all
/// whitespace runs to single spaces.
///
/// Single forward pass; no nesting tracking — `{a{b}c}` drops up to the first
/// closing brace, which is enough for character counting. `\\` becomes a
/// space (it is a line break, not content), escaped symbols like `\%` count
/// as the symbol alone.
pub fn strip_latex_commands(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let next = chars.get(i + 1).copied();
                match next {
                    Some('\\') => {
                        out.push('\n');
                        i += 2;
                    }
                    Some(c) if c.is_ascii_alphabetic() => {
                        // Control word: consume letters, optional star, and one
                        // immediately following brace group.
                        i += 1;
                        while i < chars.len() && chars[i].is_ascii_alphabetic() {
                            i += 1;
                        }
                        if i < chars.len() && chars[i] == '*' {
                            i += 1;
                        }
                        if i < chars.len() && chars[i] == '{' {
                            i += 1;
                            while i < chars.len() && chars[i] != '}' {
                                i += 1;
                            }
                            i += 1; // past '}'
                        }
                    }
                    Some(c) => {
                        // Escaped symbol — the symbol itself is visible text.
                        out.push(c);
                        i += 2;
                    }
                    None => {
                        i += 1;
                    }
                }
            }
            '{' => {
                // Drop the brace group up to the first closing brace.
                i += 1;
                while i < chars.len() && chars[i] != '}' {
                    i += 1;
                }
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    collapse_whitespace(&out)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_ws = true;
        } else {
            if in_ws && !out.is_empty() {
                out.push(' ');
            }
            in_ws = false;
            out.push(c);
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> BudgetConfig {
        BudgetConfig::default()
    }

    #[test]
    fn test_default_knobs_match_calibration() {
        let c = cfg();
        assert_eq!(c.symbols_per_page, 1250.0);
        assert_eq!(c.title_page_pages, 1.0);
        assert_eq!(c.toc_base_pages, 0.5);
        assert_eq!(c.toc_per_chapter, 0.05);
        assert_eq!(c.overshoot_tolerance, 1.15);
        assert_eq!(c.subsection_threshold, 0.7);
        assert_eq!(c.max_validation_attempts, 3);
    }

    #[test]
    fn test_count_pages_invariant_to_command_syntax() {
        let plain = count_pages_in_text("plain text", &cfg());
        let with_command = count_pages_in_text("\\section{X} plain text", &cfg());
        assert!(
            (plain - with_command).abs() < 1e-6,
            "commands must not affect the estimate: {plain} vs {with_command}"
        );
    }

    #[test]
    fn test_count_pages_monotonic_in_stripped_length() {
        let short = count_pages_in_text("word ".repeat(10).as_str(), &cfg());
        let long = count_pages_in_text("word ".repeat(100).as_str(), &cfg());
        assert!(long > short);
    }

    #[test]
    fn test_count_pages_exact_division() {
        // 1250 'a' characters = exactly one page
        let text = "a".repeat(1250);
        let pages = count_pages_in_text(&text, &cfg());
        assert!((pages - 1.0).abs() < 1e-6, "expected 1.0 page, got {pages}");
    }

    #[test]
    fn test_strip_removes_command_with_argument() {
        assert_eq!(strip_latex_commands("\\section{Intro} body"), "body");
    }

    #[test]
    fn test_strip_removes_starred_command() {
        assert_eq!(strip_latex_commands("\\section*{Intro} body"), "body");
    }

    #[test]
    fn test_strip_bare_command_and_brace_group() {
        assert_eq!(strip_latex_commands("a \\noindent b {dropped} c"), "a b c");
    }

    #[test]
    fn test_strip_line_break_becomes_whitespace() {
        assert_eq!(strip_latex_commands("one\\\\two"), "one two");
    }

    #[test]
    fn test_strip_escaped_symbol_keeps_symbol() {
        assert_eq!(strip_latex_commands("50\\% of cases"), "50% of cases");
    }

    #[test]
    fn test_strip_collapses_whitespace_runs() {
        assert_eq!(strip_latex_commands("a\n\n\n  b\t c"), "a b c");
    }

    #[test]
    fn test_content_pages_for_target_subtracts_service_pages() {
        // 20 total, 4 chapters: 20 − 1.0 − (0.5 + 4×0.05) = 18.3
        let pages = calculate_content_pages_for_target(20, 4, &cfg());
        assert!((pages - 18.3).abs() < 1e-4, "got {pages}");
    }

    #[test]
    fn test_content_pages_for_target_floored_at_one() {
        let pages = calculate_content_pages_for_target(1, 2, &cfg());
        assert!((pages - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_total_pages_adds_title_and_toc() {
        let content = "a".repeat(2500); // 2 content pages
        let total = count_total_pages_in_document(&content, 2, &cfg());
        // 2.0 + 1.0 + (0.5 + 2×0.05) = 3.6
        assert!((total - 3.6).abs() < 1e-4, "got {total}");
    }
}
