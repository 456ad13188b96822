//! The fixed document shell.
//!
//! Generated content is body-only (`\section` fragments); this module wraps
//! it in a compilable document. The preamble keeps T2A font encoding and
//! bilingual babel so Cyrillic themes and plans compile unchanged. Geometry
//! and line spacing here are what the `BudgetConfig::symbols_per_page`
//! constant was calibrated against — change them together.

use crate::latex::escape::{clean_latex_content, fix_bibliography_ampersands};

/// Placeholders: `{theme}`, `{toc}`, `{content}`.
const DOCUMENT_TEMPLATE: &str = r"\documentclass[12pt,a4paper]{article}
\usepackage[utf8]{inputenc}
\usepackage[T2A]{fontenc}
\usepackage[russian,english]{babel}
\usepackage{geometry}
\usepackage{setspace}
\usepackage{indentfirst}
\usepackage{amsmath}
\usepackage{amsfonts}
\usepackage{amssymb}
\usepackage{graphicx}
\usepackage[hidelinks]{hyperref}

\geometry{left=3cm,right=1.5cm,top=2cm,bottom=2cm}
\onehalfspacing
\setlength{\parindent}{1.25cm}

\begin{document}

\begin{titlepage}
\centering
\vspace*{2cm}
{\Large\textbf{MINISTRY OF SCIENCE AND HIGHER EDUCATION}}\\[0.5cm]
{\large Federal State Budgetary Educational Institution\\
of Higher Education}\\[0.5cm]
{\Large\textbf{STATE UNIVERSITY}}\\[2cm]

{\large Faculty of Information Technology}\\[0.5cm]
{\large Department of Software Engineering}\\[3cm]

{\Large\textbf{COURSE PAPER}}\\[1cm]

{\Large\textbf{Topic: {theme}}}\\[3cm]

\begin{flushright}
Author: student of group SE-21\\[1cm]
Supervisor: assoc. prof.
\end{flushright}

\vfill
{\large Moscow 2025}
\end{titlepage}

{toc}{content}

\end{document}
";

const TOC_BLOCK: &str = "\\tableofcontents\n\\newpage\n\n";

/// Builds the complete `.tex` source: sanitized content inside the shell,
/// with the table of contents included for structured (multi-chapter) works.
pub fn create_latex_document(theme: &str, content: &str, include_toc: bool) -> String {
    let content = clean_latex_content(content);
    let content = fix_bibliography_ampersands(&content);
    let toc = if include_toc { TOC_BLOCK } else { "" };

    DOCUMENT_TEMPLATE
        .replace("{theme}", theme)
        .replace("{toc}", toc)
        .replace("{content}", &content)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_is_complete() {
        let doc = create_latex_document("Graph Databases", "\\section{Intro}\ntext", true);
        assert!(doc.starts_with("\\documentclass"));
        assert!(doc.contains("Topic: Graph Databases"));
        assert!(doc.contains("\\section{Intro}"));
        assert!(doc.trim_end().ends_with("\\end{document}"));
    }

    #[test]
    fn test_toc_included_when_requested() {
        let with = create_latex_document("T", "\\section{A}", true);
        let without = create_latex_document("T", "\\section{A}", false);
        assert!(with.contains("\\tableofcontents"));
        assert!(!without.contains("\\tableofcontents"));
    }

    #[test]
    fn test_content_is_sanitized() {
        let doc = create_latex_document("T", "```latex\nfee is $5\n```", false);
        assert!(doc.contains("fee is \\$5"));
        assert!(!doc.contains("```"));
    }

    #[test]
    fn test_no_placeholders_left() {
        let doc = create_latex_document("T", "body", true);
        assert!(!doc.contains("{theme}"));
        assert!(!doc.contains("{toc}"));
        assert!(!doc.contains("{content}"));
    }

    #[test]
    fn test_shell_tags_are_balanced() {
        let doc = create_latex_document("T", "\\section{A}\ntext", true);
        assert_eq!(crate::latex::validate::validate_latex_tags(&doc), Ok(()));
    }
}
