//! Stepwise content generation with page-budget control.
//!
//! Flow: parse plan → split off bibliography → budget chapters →
//!       per chapter: generate → measure → expand with subsections if thin →
//!       early-exit at the overshoot ceiling → bibliography → citation repair.
//!
//! The chapter loop is deliberately sequential: whether generation continues
//! depends on the measured size of everything produced so far, so chapters
//! cannot be fanned out without breaking the budget logic.
//!
//! Failure policy: a fragment that still fails tag validation after
//! `max_validation_attempts` fresh LLM calls is kept anyway and recorded as a
//! [`GenerationWarning`] — a degraded document beats no document. Transport
//! errors are the opposite: they abort the order via [`LlmError`].

use serde::Serialize;
use tracing::{info, warn};

use crate::budget::{
    calculate_content_pages_for_target, calculate_pages_per_chapter, classify_chapter,
    count_pages_in_text, parse_work_plan, should_generate_subsections, validate_work_plan,
    BudgetConfig, Chapter, ChapterKind,
};
use crate::content::citations::repair_citation_keys;
use crate::content::prompts::{
    BIBLIOGRAPHY_PROMPT_TEMPLATE, CHAPTER_PROMPT_TEMPLATE, CONCLUSION_PROMPT_TEMPLATE,
    INTRODUCTION_PROMPT_TEMPLATE, LEGACY_FULL_WORK_PROMPT_TEMPLATE, PLAN_PROMPT_TEMPLATE,
    SIMPLE_WORK_PROMPT_TEMPLATE, SUBSECTION_PROMPT_TEMPLATE, SUBSECTION_TITLES_PROMPT_TEMPLATE,
};
use crate::latex::{fix_section_commands, validate_latex_tags};
use crate::llm_client::{Conversation, LlmClient, LlmError};
use crate::progress::ProgressSink;

/// Orders at or below this size skip the plan/outline machinery entirely.
pub const SIMPLE_WORK_MAX_PAGES: u32 = 2;

/// Budget for a chapter the allocator produced no entry for.
const DEFAULT_CHAPTER_PAGES: f32 = 2.0;
/// Pages reserved for the bibliography, subtracted before the chapter split.
const BIBLIOGRAPHY_RESERVE_PAGES: f32 = 0.5;
/// Plan attempts before accepting a too-shallow outline.
const MAX_PLAN_ATTEMPTS: u32 = 3;

const SOURCE_RANGE_FULL: &str = "15-20";
const SOURCE_RANGE_SIMPLE: &str = "8-12";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// The order fields content generation needs.
#[derive(Debug, Clone, Copy)]
pub struct WorkParams<'a> {
    pub theme: &'a str,
    pub pages: u32,
    pub work_type: &'a str,
}

/// A fragment kept despite failing tag validation on every attempt.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationWarning {
    /// Chapter or subsection title the fragment belongs to.
    pub unit: String,
    pub attempts: u32,
    pub detail: String,
}

/// Generated body LaTeX plus the degradations that occurred along the way.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub latex: String,
    pub warnings: Vec<GenerationWarning>,
}

// ────────────────────────────────────────────────────────────────────────────
// Plan generation
// ────────────────────────────────────────────────────────────────────────────

/// Requests a numbered outline, retrying while [`validate_work_plan`] finds
/// it too shallow for the ordered page count. The last attempt is kept even
/// if still shallow.
pub async fn generate_work_plan(
    llm: &LlmClient,
    conversation: &mut Conversation,
    params: &WorkParams<'_>,
) -> Result<String, LlmError> {
    let prompt = PLAN_PROMPT_TEMPLATE
        .replace("{work_type}", &params.work_type.to_lowercase())
        .replace("{theme}", params.theme)
        .replace("{pages}", &params.pages.to_string());

    let mut plan = String::new();
    for attempt in 1..=MAX_PLAN_ATTEMPTS {
        plan = llm.ask(conversation, &prompt).await?;
        let (valid, items) = validate_work_plan(&plan, params.pages);
        if valid {
            return Ok(plan);
        }
        warn!(
            "plan attempt {attempt}/{MAX_PLAN_ATTEMPTS}: {items} items is too shallow for {} pages",
            params.pages
        );
    }
    Ok(plan)
}

// ────────────────────────────────────────────────────────────────────────────
// Stepwise driver
// ────────────────────────────────────────────────────────────────────────────

/// Generates the full work body chapter by chapter, keeping the running page
/// total inside the budget. Falls back to [`generate_full_work_content_legacy`]
/// when the plan yields no chapters — that path returns the single-call
/// output untouched.
pub async fn generate_work_content_stepwise(
    llm: &LlmClient,
    conversation: &mut Conversation,
    config: &BudgetConfig,
    params: &WorkParams<'_>,
    plan_text: &str,
    progress: &dyn ProgressSink,
) -> Result<GeneratedContent, LlmError> {
    let chapters = parse_work_plan(plan_text);
    if chapters.is_empty() {
        info!("work plan unparseable, falling back to single-call generation");
        let latex = generate_full_work_content_legacy(llm, conversation, params).await?;
        return Ok(GeneratedContent {
            latex,
            warnings: Vec::new(),
        });
    }

    let (main_chapters, bibliography_chapter) = split_chapters(chapters);
    let content_target =
        calculate_content_pages_for_target(params.pages, main_chapters.len(), config);
    let budgets = calculate_pages_per_chapter(
        content_target - BIBLIOGRAPHY_RESERVE_PAGES,
        &main_chapters,
    );

    let mut warnings = Vec::new();
    let mut full_content = String::new();
    let mut total_pages = 0.0_f32;

    for (index, chapter) in main_chapters.iter().enumerate() {
        let target = budgets
            .get(&chapter.title)
            .copied()
            .unwrap_or(DEFAULT_CHAPTER_PAGES);

        let percent = (index * 90 / main_chapters.len()) as u8;
        progress
            .update(
                percent,
                &format!("Generating chapter: {}", truncate_title(&chapter.title)),
            )
            .await;

        let mut body = generate_chapter_content(
            llm,
            conversation,
            config,
            &chapter.title,
            params,
            target,
            &mut warnings,
        )
        .await?;
        let mut current = count_pages_in_text(&body, config);

        if should_generate_subsections(current, target, config.subsection_threshold) {
            let subsections = generate_subsections_content(
                llm,
                conversation,
                config,
                chapter,
                target - current,
                params.theme,
                &mut warnings,
            )
            .await?;
            if !subsections.is_empty() {
                body.push_str("\n\n");
                body.push_str(&subsections);
                current = count_pages_in_text(&body, config);
            }
        }

        full_content.push_str(&body);
        full_content.push_str("\n\n\\newpage\n\n");
        total_pages += current;

        if total_pages >= content_target * config.overshoot_tolerance {
            // Hard ceiling: dropping later chapters beats wildly overshooting
            // the ordered length.
            let dropped = main_chapters.len() - index - 1;
            if dropped > 0 {
                info!(
                    "page ceiling reached at {total_pages:.1} pages, dropping {dropped} remaining chapters"
                );
            }
            break;
        }
    }

    progress.update(95, "Generating the reference list...").await;
    let bibliography_title = bibliography_chapter
        .as_ref()
        .map(|c| c.title.as_str())
        .unwrap_or("References");
    let bibliography = generate_chapter_content(
        llm,
        conversation,
        config,
        bibliography_title,
        params,
        BIBLIOGRAPHY_RESERVE_PAGES,
        &mut warnings,
    )
    .await?;
    full_content.push_str(&bibliography);

    let latex = repair_citation_keys(full_content.trim());
    Ok(GeneratedContent { latex, warnings })
}

/// Separates the bibliography chapter (at most one; the first match wins)
/// from the chapters that receive page budgets.
pub(crate) fn split_chapters(chapters: Vec<Chapter>) -> (Vec<Chapter>, Option<Chapter>) {
    let mut main_chapters = Vec::with_capacity(chapters.len());
    let mut bibliography = None;
    for chapter in chapters {
        if bibliography.is_none() && classify_chapter(&chapter.title) == ChapterKind::Bibliography {
            bibliography = Some(chapter);
        } else {
            main_chapters.push(chapter);
        }
    }
    (main_chapters, bibliography)
}

// ────────────────────────────────────────────────────────────────────────────
// Chapter generation
// ────────────────────────────────────────────────────────────────────────────

/// Builds the chapter prompt for the given title and character budget.
/// The template is chosen by keyword classification of the title.
fn build_chapter_prompt(chapter_title: &str, params: &WorkParams<'_>, target_chars: i64) -> String {
    let work_type = params.work_type.to_lowercase();
    let template = match classify_chapter(chapter_title) {
        ChapterKind::Introduction => INTRODUCTION_PROMPT_TEMPLATE,
        ChapterKind::Conclusion => CONCLUSION_PROMPT_TEMPLATE,
        ChapterKind::Bibliography => {
            return BIBLIOGRAPHY_PROMPT_TEMPLATE
                .replace("{work_type}", &work_type)
                .replace("{theme}", params.theme)
                .replace("{source_range}", SOURCE_RANGE_FULL);
        }
        ChapterKind::Body => {
            return CHAPTER_PROMPT_TEMPLATE
                .replace("{chapter_title}", chapter_title)
                .replace("{work_type}", &work_type)
                .replace("{theme}", params.theme)
                .replace("{target_chars}", &target_chars.to_string());
        }
    };
    template
        .replace("{work_type}", &work_type)
        .replace("{theme}", params.theme)
        .replace("{target_chars}", &target_chars.to_string())
}

/// Generates one chapter body, wrapped in the validation retry loop.
async fn generate_chapter_content(
    llm: &LlmClient,
    conversation: &mut Conversation,
    config: &BudgetConfig,
    chapter_title: &str,
    params: &WorkParams<'_>,
    target_pages: f32,
    warnings: &mut Vec<GenerationWarning>,
) -> Result<String, LlmError> {
    let target_chars = (target_pages * config.symbols_per_page) as i64;
    let prompt = build_chapter_prompt(chapter_title, params, target_chars);
    ask_validated(llm, conversation, config, &prompt, chapter_title, warnings).await
}

/// Generates subsections to fill an under-budget chapter.
///
/// When the plan listed no subsections, the LLM is asked to propose 2-3
/// titles first. Each subsection gets an even share of the remaining budget
/// and its own validation retry loop; wrong `\section` headings are repaired.
async fn generate_subsections_content(
    llm: &LlmClient,
    conversation: &mut Conversation,
    config: &BudgetConfig,
    chapter: &Chapter,
    target_pages: f32,
    theme: &str,
    warnings: &mut Vec<GenerationWarning>,
) -> Result<String, LlmError> {
    let mut subsections = chapter.subsections.clone();
    if subsections.is_empty() {
        let prompt = SUBSECTION_TITLES_PROMPT_TEMPLATE
            .replace("{chapter_title}", &chapter.title)
            .replace("{theme}", theme);
        let titles = llm.ask(conversation, &prompt).await?;
        subsections = titles
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
    }
    if subsections.is_empty() {
        return Ok(String::new());
    }

    let pages_per_subsection = target_pages / subsections.len() as f32;
    let target_chars = (pages_per_subsection * config.symbols_per_page) as i64;

    let mut out = String::new();
    for subsection in &subsections {
        let prompt = SUBSECTION_PROMPT_TEMPLATE
            .replace("{subsection}", subsection)
            .replace("{chapter_title}", &chapter.title)
            .replace("{theme}", theme)
            .replace("{target_chars}", &target_chars.to_string());

        let body = ask_validated(llm, conversation, config, &prompt, subsection, warnings).await?;
        let body = fix_section_commands(&body, subsection);
        out.push_str(&body);
        out.push_str("\n\n");
    }
    Ok(out.trim().to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Validation retry loop
// ────────────────────────────────────────────────────────────────────────────

/// Requests a fragment up to `max_validation_attempts` times, accepting the
/// first tag-balanced result. After exhaustion the last output is kept and
/// the failure recorded in `warnings`.
async fn ask_validated(
    llm: &LlmClient,
    conversation: &mut Conversation,
    config: &BudgetConfig,
    prompt: &str,
    unit: &str,
    warnings: &mut Vec<GenerationWarning>,
) -> Result<String, LlmError> {
    let mut last_content = String::new();
    let mut last_detail = String::new();

    for attempt in 1..=config.max_validation_attempts {
        let content = llm.ask(conversation, prompt).await?;
        match validate_latex_tags(&content) {
            Ok(()) => return Ok(content),
            Err(e) => {
                warn!(
                    "tag validation failed for \"{unit}\" (attempt {attempt}/{}): {e}",
                    config.max_validation_attempts
                );
                last_detail = e.to_string();
                last_content = content;
            }
        }
    }

    warnings.push(GenerationWarning {
        unit: unit.to_string(),
        attempts: config.max_validation_attempts,
        detail: last_detail,
    });
    Ok(last_content)
}

// ────────────────────────────────────────────────────────────────────────────
// Unstructured paths
// ────────────────────────────────────────────────────────────────────────────

/// Short-form path for 1-2 page orders: one call for the body, one for the
/// bibliography, no outline and no volume control.
pub async fn generate_simple_work_content(
    llm: &LlmClient,
    conversation: &mut Conversation,
    params: &WorkParams<'_>,
) -> Result<GeneratedContent, LlmError> {
    let work_type = params.work_type.to_lowercase();

    let body_prompt = SIMPLE_WORK_PROMPT_TEMPLATE
        .replace("{work_type}", &work_type)
        .replace("{theme}", params.theme);
    let body = llm.ask(conversation, &body_prompt).await?;

    let bibliography_prompt = BIBLIOGRAPHY_PROMPT_TEMPLATE
        .replace("{work_type}", &work_type)
        .replace("{theme}", params.theme)
        .replace("{source_range}", SOURCE_RANGE_SIMPLE);
    let bibliography = llm.ask(conversation, &bibliography_prompt).await?;

    let combined = format!("{body}\n\n{bibliography}");
    Ok(GeneratedContent {
        latex: repair_citation_keys(&combined),
        warnings: Vec::new(),
    })
}

/// Single monolithic call producing the whole body. Only used when plan
/// parsing comes up empty; no page control applies.
pub async fn generate_full_work_content_legacy(
    llm: &LlmClient,
    conversation: &mut Conversation,
    params: &WorkParams<'_>,
) -> Result<String, LlmError> {
    let prompt = LEGACY_FULL_WORK_PROMPT_TEMPLATE
        .replace("{work_type}", &params.work_type.to_lowercase())
        .replace("{theme}", params.theme)
        .replace("{pages}", &params.pages.to_string());
    llm.ask(conversation, &prompt).await
}

fn truncate_title(title: &str) -> String {
    title.chars().take(50).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
