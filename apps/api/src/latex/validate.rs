//! Environment tag balance validation and sectioning repair.
//!
//! LLMs drop closing tags often enough that every generated fragment is
//! checked before it is accepted. The check is a single-pass stack scan over
//! `\begin{X}` / `\end{X}` markers — any environment name, any nesting depth,
//! order-sensitive.

use thiserror::Error;

/// A tag balance violation, reporting the first mismatch found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagBalanceError {
    #[error("\\end{{{tag}}} has no matching \\begin{{{tag}}}")]
    ClosingWithoutOpen { tag: String },

    #[error("\\end{{{found}}} closes \\begin{{{expected}}}")]
    WrongClosingTag { expected: String, found: String },

    #[error("unclosed environments: {}", .tags.join(", "))]
    UnclosedTags { tags: Vec<String> },
}

/// Validates that every `\begin{X}` has a correctly nested `\end{X}`.
pub fn validate_latex_tags(content: &str) -> Result<(), TagBalanceError> {
    let mut events: Vec<(usize, bool, &str)> = Vec::new();

    for (idx, _) in content.match_indices("\\begin{") {
        if let Some(name) = env_name(&content[idx + 7..]) {
            events.push((idx, true, name));
        }
    }
    for (idx, _) in content.match_indices("\\end{") {
        if let Some(name) = env_name(&content[idx + 5..]) {
            events.push((idx, false, name));
        }
    }
    events.sort_by_key(|(idx, _, _)| *idx);

    let mut stack: Vec<&str> = Vec::new();
    for (_, is_open, name) in events {
        if is_open {
            stack.push(name);
            continue;
        }
        match stack.pop() {
            None => {
                return Err(TagBalanceError::ClosingWithoutOpen {
                    tag: name.to_string(),
                })
            }
            Some(open) if open != name => {
                return Err(TagBalanceError::WrongClosingTag {
                    expected: open.to_string(),
                    found: name.to_string(),
                })
            }
            Some(_) => {}
        }
    }

    if stack.is_empty() {
        Ok(())
    } else {
        Err(TagBalanceError::UnclosedTags {
            tags: stack.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// Reads the environment name up to the closing brace; `None` if malformed.
fn env_name(rest: &str) -> Option<&str> {
    let close = rest.find('}')?;
    let name = rest[..close].trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Repairs sectioning commands in generated *subsection* content.
///
/// The LLM is told to start with `\subsection{…}` but sometimes emits
/// `\section{…}` (which would open a new chapter) or no heading at all.
/// The first line-leading `\section` is downgraded in place; a missing
/// heading is prepended from `expected_title`. Leading `\newpage` commands
/// are dropped — page breaks belong to the chapter assembly, not fragments.
pub fn fix_section_commands(content: &str, expected_title: &str) -> String {
    let mut text = content.trim().to_string();

    while let Some(rest) = text.strip_prefix("\\newpage") {
        text = rest.trim_start().to_string();
    }

    let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    for line in lines.iter_mut() {
        if line.starts_with("\\subsection{") {
            break;
        }
        if line.starts_with("\\section{") {
            let rewritten = line.replacen("\\section{", "\\subsection{", 1);
            *line = rewritten;
            break;
        }
    }

    let has_heading = lines
        .iter()
        .any(|l| l.starts_with("\\subsection{") || l.starts_with("\\section{"));
    let body = lines.join("\n");

    if has_heading {
        body
    } else {
        format!("\\subsection{{{expected_title}}}\n\n{body}")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── validate_latex_tags ─────────────────────────────────────────────────

    #[test]
    fn test_balanced_figure_is_valid() {
        let content = "\\section{A}\n\\begin{figure}\n\\caption{X}\n\\end{figure}\ntext";
        assert_eq!(validate_latex_tags(content), Ok(()));
    }

    #[test]
    fn test_nested_same_environment_is_valid() {
        let content = "\\begin{figure}\\begin{figure}x\\end{figure}\\end{figure}";
        assert_eq!(validate_latex_tags(content), Ok(()));
    }

    #[test]
    fn test_multiple_different_environments_valid() {
        let content = "\
\\begin{itemize}\\item a\\end{itemize}
\\begin{table}x\\end{table}
\\begin{equation}y = x\\end{equation}
\\begin{thebibliography}{99}\\bibitem{source1} A.\\end{thebibliography}";
        assert_eq!(validate_latex_tags(content), Ok(()));
    }

    #[test]
    fn test_wrong_closing_tag_reports_both_names() {
        let content = "\\begin{figure}x\\end{table}";
        let err = validate_latex_tags(content).unwrap_err();
        assert_eq!(
            err,
            TagBalanceError::WrongClosingTag {
                expected: "figure".to_string(),
                found: "table".to_string(),
            }
        );
        let message = err.to_string();
        assert!(message.contains("figure") && message.contains("table"));
    }

    #[test]
    fn test_closing_without_open() {
        let err = validate_latex_tags("text\\end{figure}").unwrap_err();
        assert_eq!(
            err,
            TagBalanceError::ClosingWithoutOpen {
                tag: "figure".to_string()
            }
        );
    }

    #[test]
    fn test_unclosed_tags_lists_all_open_names() {
        let content = "\\begin{figure}\\begin{itemize}\\item a";
        let err = validate_latex_tags(content).unwrap_err();
        assert_eq!(
            err,
            TagBalanceError::UnclosedTags {
                tags: vec!["figure".to_string(), "itemize".to_string()]
            }
        );
    }

    #[test]
    fn test_empty_and_tagless_content_valid() {
        assert_eq!(validate_latex_tags(""), Ok(()));
        assert_eq!(validate_latex_tags("\\section{A}\nplain text"), Ok(()));
    }

    #[test]
    fn test_interleaved_environments_invalid() {
        // \begin{a}\begin{b}\end{a}\end{b} is not properly nested
        let content = "\\begin{figure}\\begin{table}\\end{figure}\\end{table}";
        let err = validate_latex_tags(content).unwrap_err();
        assert!(matches!(err, TagBalanceError::WrongClosingTag { .. }));
    }

    // ── fix_section_commands ────────────────────────────────────────────────

    #[test]
    fn test_downgrades_leading_section() {
        let out = fix_section_commands("\\section{Background}\ntext", "Background");
        assert!(out.starts_with("\\subsection{Background}"));
        assert!(!out.contains("\\section{Background}"));
    }

    #[test]
    fn test_existing_subsection_untouched() {
        let input = "\\subsection{Background}\ntext";
        assert_eq!(fix_section_commands(input, "Background"), input);
    }

    #[test]
    fn test_missing_heading_prepended() {
        let out = fix_section_commands("just prose here", "Expected");
        assert!(out.starts_with("\\subsection{Expected}\n\n"));
        assert!(out.ends_with("just prose here"));
    }

    #[test]
    fn test_leading_newpage_dropped() {
        let out = fix_section_commands("\\newpage\n\\subsection{A}\ntext", "A");
        assert!(out.starts_with("\\subsection{A}"));
    }

    #[test]
    fn test_only_first_section_downgraded() {
        let input = "\\section{First}\ntext\n\\section{Second}";
        let out = fix_section_commands(input, "First");
        assert!(out.contains("\\subsection{First}"));
        assert!(out.contains("\\section{Second}"));
    }
}
