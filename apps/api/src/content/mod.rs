// Content generation engine.
// Implements: plan generation, the stepwise page-budget driver, the
// per-fragment validation retry loop, subsection fill, citation key repair.
// All LLM calls go through llm_client — no direct HTTP calls here.

pub mod citations;
pub mod generator;
pub mod prompts;

// Re-export the public API consumed by workgen and handlers.
pub use citations::repair_citation_keys;
pub use generator::{
    generate_full_work_content_legacy, generate_simple_work_content, generate_work_content_stepwise,
    generate_work_plan, GeneratedContent, GenerationWarning, WorkParams,
};
