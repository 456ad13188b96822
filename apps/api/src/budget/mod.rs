// Page-budget engine.
// Implements: symbols↔pages heuristics, work-plan parsing, per-chapter allocation.
// Everything here is pure — no I/O, no LLM calls.

pub mod allocator;
pub mod pages;
pub mod plan;

// Re-export the public API consumed by other modules (content, workgen, handlers).
pub use allocator::{
    calculate_pages_per_chapter, classify_chapter, is_bibliography_chapter, is_chapter_complete,
    should_generate_subsections, validate_work_plan, ChapterKind,
};
pub use pages::{calculate_content_pages_for_target, count_pages_in_text, BudgetConfig};
pub use plan::{parse_work_plan, Chapter};
