// LaTeX sanitation and templating.
// Implements: markdown-fence stripping, money/math dollar escaping, bibliography
// ampersand repair, environment tag balance validation, the document shell.
// Escaping is done with single-pass scanners, not regex chains — the output
// must be idempotent under re-application.

pub mod escape;
pub mod template;
pub mod validate;

// Re-export the public API consumed by other modules (content, workgen).
pub use escape::{clean_latex_content, fix_bibliography_ampersands, smart_escape_dollars};
pub use template::create_latex_document;
pub use validate::{fix_section_commands, validate_latex_tags, TagBalanceError};
