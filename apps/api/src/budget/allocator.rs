//! Per-chapter page allocation and plan validation.
#![allow(dead_code)]
//!
//! Service chapters (introduction, conclusion, bibliography) get fixed small
//! budgets; the remaining pages are split evenly across the body chapters.
//! Titles are classified by keyword — plans arrive in Russian or English, so
//! both keyword sets are recognized.

use std::collections::HashMap;

use crate::budget::plan::{parse_work_plan, Chapter};

/// Fixed allocation for an introduction or conclusion chapter.
const SERVICE_CHAPTER_PAGES: f32 = 1.5;
/// Fixed allocation for the bibliography chapter.
const BIBLIOGRAPHY_PAGES: f32 = 0.5;

/// What role a chapter plays in the document, inferred from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterKind {
    Introduction,
    Conclusion,
    Bibliography,
    Body,
}

/// Classifies a chapter title by keyword (case-insensitive substring match).
pub fn classify_chapter(title: &str) -> ChapterKind {
    let lower = title.to_lowercase();
    if lower.contains("введение") || lower.contains("introduction") {
        ChapterKind::Introduction
    } else if lower.contains("заключение") || lower.contains("conclusion") {
        ChapterKind::Conclusion
    } else if is_bibliography_chapter(&lower) {
        ChapterKind::Bibliography
    } else {
        ChapterKind::Body
    }
}

/// True if the title names the reference list.
pub fn is_bibliography_chapter(title: &str) -> bool {
    let lower = title.to_lowercase();
    [
        "список",
        "библиография",
        "источник",
        "литература",
        "bibliography",
        "references",
        "sources",
    ]
    .iter()
    .any(|kw| lower.contains(kw))
}

/// Splits `total_pages` across the chapters.
///
/// Service chapters take their fixed budgets first; the remainder is divided
/// evenly among body chapters. When the service chapters consume everything,
/// body chapters are budgeted at zero rather than negative.
pub fn calculate_pages_per_chapter(total_pages: f32, chapters: &[Chapter]) -> HashMap<String, f32> {
    let mut budgets = HashMap::new();
    if chapters.is_empty() {
        return budgets;
    }

    let mut special_pages = 0.0_f32;
    let mut body_titles: Vec<&str> = Vec::new();

    for chapter in chapters {
        let pages = match classify_chapter(&chapter.title) {
            ChapterKind::Introduction | ChapterKind::Conclusion => SERVICE_CHAPTER_PAGES,
            ChapterKind::Bibliography => BIBLIOGRAPHY_PAGES,
            ChapterKind::Body => {
                body_titles.push(&chapter.title);
                continue;
            }
        };
        budgets.insert(chapter.title.clone(), pages);
        special_pages += pages;
    }

    if !body_titles.is_empty() {
        let remaining = total_pages - special_pages;
        let per_chapter = if remaining > 0.0 {
            remaining / body_titles.len() as f32
        } else {
            0.0
        };
        for title in body_titles {
            budgets.insert(title.to_string(), per_chapter);
        }
    }

    budgets
}

/// True when the chapter is under-filled enough to warrant subsection
/// expansion: `current < target × threshold`.
pub fn should_generate_subsections(current_pages: f32, target_pages: f32, threshold: f32) -> bool {
    current_pages < target_pages * threshold
}

/// True when the chapter landed within `±tolerance` of its target.
pub fn is_chapter_complete(current_pages: f32, target_pages: f32, tolerance: f32) -> bool {
    let min = target_pages * (1.0 - tolerance);
    let max = target_pages * (1.0 + tolerance);
    (min..=max).contains(&current_pages)
}

/// Counts plan items: every chapter plus every subsection.
pub fn count_plan_items(chapters: &[Chapter]) -> usize {
    chapters
        .iter()
        .map(|c| 1 + c.subsections.len())
        .sum()
}

/// Validates that a plan is deep enough for the requested page count.
///
/// A usable outline needs at least one item per three pages; shallower plans
/// are rejected so the caller can ask the LLM again.
pub fn validate_work_plan(plan_text: &str, pages: u32) -> (bool, usize) {
    let chapters = parse_work_plan(plan_text);
    let items = count_plan_items(&chapters);
    let min_items = std::cmp::max(1, (pages / 3) as usize);
    (items >= min_items, items)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(title: &str) -> Chapter {
        Chapter {
            title: title.to_string(),
            subsections: Vec::new(),
        }
    }

    #[test]
    fn test_classify_recognizes_both_languages() {
        assert_eq!(classify_chapter("Введение"), ChapterKind::Introduction);
        assert_eq!(classify_chapter("Introduction"), ChapterKind::Introduction);
        assert_eq!(classify_chapter("Заключение"), ChapterKind::Conclusion);
        assert_eq!(classify_chapter("Conclusion"), ChapterKind::Conclusion);
        assert_eq!(
            classify_chapter("Список использованных источников"),
            ChapterKind::Bibliography
        );
        assert_eq!(classify_chapter("References"), ChapterKind::Bibliography);
        assert_eq!(classify_chapter("Data Analysis"), ChapterKind::Body);
    }

    #[test]
    fn test_allocation_splits_remainder_evenly() {
        let chapters = vec![
            chapter("Introduction"),
            chapter("Methods"),
            chapter("Results"),
            chapter("Bibliography"),
        ];
        let budgets = calculate_pages_per_chapter(20.0, &chapters);
        assert_eq!(budgets["Introduction"], 1.5);
        assert_eq!(budgets["Bibliography"], 0.5);
        // 20 − 1.5 − 0.5 = 18, split across 2 body chapters
        assert_eq!(budgets["Methods"], 9.0);
        assert_eq!(budgets["Results"], 9.0);
    }

    #[test]
    fn test_allocation_zero_when_specials_consume_everything() {
        let chapters = vec![
            chapter("Introduction"),
            chapter("Conclusion"),
            chapter("Body"),
        ];
        let budgets = calculate_pages_per_chapter(2.0, &chapters);
        assert_eq!(budgets["Body"], 0.0);
    }

    #[test]
    fn test_allocation_empty_chapters() {
        assert!(calculate_pages_per_chapter(10.0, &[]).is_empty());
    }

    #[test]
    fn test_should_generate_subsections_threshold() {
        assert!(should_generate_subsections(1.0, 2.0, 0.7)); // 1.0 < 1.4
        assert!(!should_generate_subsections(1.5, 2.0, 0.7)); // 1.5 ≥ 1.4
    }

    #[test]
    fn test_is_chapter_complete_band() {
        assert!(is_chapter_complete(2.0, 2.0, 0.2));
        assert!(is_chapter_complete(1.6, 2.0, 0.2));
        assert!(is_chapter_complete(2.4, 2.0, 0.2));
        assert!(!is_chapter_complete(1.5, 2.0, 0.2));
        assert!(!is_chapter_complete(2.5, 2.0, 0.2));
    }

    #[test]
    fn test_count_plan_items_includes_subsections() {
        let chapters = vec![
            Chapter {
                title: "A".to_string(),
                subsections: vec!["a1".to_string(), "a2".to_string()],
            },
            chapter("B"),
        ];
        assert_eq!(count_plan_items(&chapters), 4);
    }

    #[test]
    fn test_validate_work_plan_accepts_deep_outline() {
        let plan = "\
1. Introduction
2. Chapter One
   2.1 First
   2.2 Second
3. Chapter Two
   3.1 Third
4. Conclusion
5. References";
        let (valid, items) = validate_work_plan(plan, 20);
        assert_eq!(items, 8);
        assert!(valid, "8 items ≥ 20/3");
    }

    #[test]
    fn test_validate_work_plan_rejects_shallow_outline() {
        let (valid, items) = validate_work_plan("1. Everything", 30);
        assert_eq!(items, 1);
        assert!(!valid, "1 item < 30/3");
    }

    #[test]
    fn test_validate_work_plan_unparseable_is_invalid() {
        let (valid, items) = validate_work_plan("just prose", 10);
        assert_eq!(items, 0);
        assert!(!valid);
    }

    #[test]
    fn test_validate_work_plan_small_order_needs_one_item() {
        let (valid, _) = validate_work_plan("1. Short note", 2);
        assert!(valid, "pages/3 floors at 1 item");
    }
}
