//! Work-plan parser.
//!
//! Plans arrive as free-form numbered outlines from the LLM, in Russian or
//! English. The parser is line-oriented: a line matching a chapter pattern
//! opens a new chapter, a line matching a subsection pattern attaches to the
//! current chapter, everything else is ignored. An unparseable plan yields an
//! empty chapter list — the caller falls back to unstructured generation.

use regex::Regex;

/// One top-level unit of the generated work: a title plus the subsection
/// titles the plan listed under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub subsections: Vec<String>,
}

/// Pattern table for plan lines.
///
/// Subsection patterns are checked before chapter patterns: `"2.1 Foo"` must
/// attach to the open chapter, not open a chapter titled `"1 Foo"` (the bare
/// `"N. Title"` chapter pattern would otherwise swallow it).
pub struct PlanParser {
    /// (pattern, index of the capture group holding the title)
    chapter_patterns: Vec<(Regex, usize)>,
    subsection_patterns: Vec<Regex>,
}

impl PlanParser {
    pub fn new() -> Self {
        let chapter_patterns = vec![
            // "1. Introduction"
            (Regex::new(r"^(\d+)\.\s*(.+)$").unwrap(), 2),
            // "Глава 2. Методы" (Russian plans number chapters this way)
            (Regex::new(r"(?i)^глава\s*(\d+)\.?\s*(.+)$").unwrap(), 2),
            // "3) Analysis"
            (Regex::new(r"^(\d+)\)\s*(.+)$").unwrap(), 2),
            // "IV. Discussion"
            (Regex::new(r"^[IVX]+\.\s*(.+)$").unwrap(), 1),
        ];
        let subsection_patterns = vec![
            // "2.1 Background"
            Regex::new(r"^\d+\.\d+\.?\s*(.+)$").unwrap(),
            // "- Background"
            Regex::new(r"^-\s*(.+)$").unwrap(),
            // "* Background"
            Regex::new(r"^\*\s*(.+)$").unwrap(),
        ];
        Self {
            chapter_patterns,
            subsection_patterns,
        }
    }

    /// Parses the plan text into an ordered chapter list.
    pub fn parse(&self, plan_text: &str) -> Vec<Chapter> {
        let mut chapters: Vec<Chapter> = Vec::new();
        let mut current: Option<Chapter> = None;

        for line in plan_text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(title) = self.subsection_title(line) {
                // Subsections before any chapter are dropped.
                if let Some(chapter) = current.as_mut() {
                    chapter.subsections.push(title);
                }
                continue;
            }

            if let Some(title) = self.chapter_title(line) {
                if let Some(done) = current.take() {
                    chapters.push(done);
                }
                current = Some(Chapter {
                    title,
                    subsections: Vec::new(),
                });
            }
            // Non-matching lines are ignored.
        }

        if let Some(done) = current {
            chapters.push(done);
        }
        chapters
    }

    fn chapter_title(&self, line: &str) -> Option<String> {
        for (pattern, title_group) in &self.chapter_patterns {
            if let Some(caps) = pattern.captures(line) {
                if let Some(title) = caps.get(*title_group) {
                    let title = title.as_str().trim();
                    if !title.is_empty() {
                        return Some(title.to_string());
                    }
                }
            }
        }
        None
    }

    fn subsection_title(&self, line: &str) -> Option<String> {
        for pattern in &self.subsection_patterns {
            if let Some(caps) = pattern.captures(line) {
                if let Some(title) = caps.get(1) {
                    let title = title.as_str().trim();
                    if !title.is_empty() {
                        return Some(title.to_string());
                    }
                }
            }
        }
        None
    }
}

impl Default for PlanParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a work plan with the default pattern table.
pub fn parse_work_plan(plan_text: &str) -> Vec<Chapter> {
    PlanParser::new().parse(plan_text)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
