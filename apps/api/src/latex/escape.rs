//! LaTeX-safety passes over LLM output.
//!
//! Generated fragments arrive with markdown fences, unescaped money dollars,
//! bare ampersands in bibliography entries, and stray empty commands. Each
//! pass here is a single forward scan and idempotent: re-cleaning already
//! clean text must change nothing, because fragments are re-processed when a
//! chapter is regenerated.

use crate::budget::is_bibliography_chapter;

/// Strips a leading ```` ```latex ```` / ```` ``` ```` fence line and a
/// trailing ```` ``` ```` fence, if present.
pub fn strip_markdown_fences(content: &str) -> String {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string ("latex") through the end of the fence line.
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        };
    }
    let trimmed = text.trim_end();
    let text = trimmed.strip_suffix("```").unwrap_or(trimmed);
    text.trim().to_string()
}

/// Escapes `$` used as a currency sign while leaving math spans intact.
///
/// Recognized math spans are copied verbatim: `$$…$$`, `\(…\)`, `\[…\]`, and
/// single-`$` spans whose content looks like an expression (contains an
/// operator, identifier, or bracket and is not purely numeric). Every other
/// unescaped `$` is turned into `\$`. Already-escaped `\$` is never doubled.
pub fn smart_escape_dollars(text: &str) -> String {
    // Undo accidental double escaping from earlier passes.
    let text = text.replace("\\\\$", "\\$");
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                let next = chars[i + 1];
                if next == '(' || next == '[' {
                    let closer = if next == '(' { ')' } else { ']' };
                    if let Some(end) = find_escaped_close(&chars, i + 2, closer) {
                        out.extend(chars[i..end + 2].iter());
                        i = end + 2;
                        continue;
                    }
                }
                // Escaped character (includes \$) — copy untouched.
                out.push('\\');
                out.push(next);
                i += 2;
            }
            '$' => {
                if chars.get(i + 1) == Some(&'$') {
                    if let Some(end) = find_display_close(&chars, i + 2) {
                        out.extend(chars[i..end + 2].iter());
                        i = end + 2;
                        continue;
                    }
                    // Unpaired $$ — both dollars are literal.
                    out.push_str("\\$\\$");
                    i += 2;
                    continue;
                }
                match find_inline_close(&chars, i + 1) {
                    Some(end) if span_is_math(&chars[i + 1..end]) => {
                        out.extend(chars[i..end + 1].iter());
                        i = end + 1;
                    }
                    Some(end) => {
                        // Paired dollars around non-math content: both literal.
                        out.push_str("\\$");
                        out.extend(chars[i + 1..end].iter());
                        out.push_str("\\$");
                        i = end + 1;
                    }
                    None => {
                        out.push_str("\\$");
                        i += 1;
                    }
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Finds the backslash of `\<closer>` at or after `from`.
fn find_escaped_close(chars: &[char], from: usize, closer: char) -> Option<usize> {
    let mut j = from;
    while j + 1 < chars.len() {
        if chars[j] == '\\' && chars[j + 1] == closer {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Finds the first `$` of a closing `$$` at or after `from`.
fn find_display_close(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j + 1 < chars.len() {
        if chars[j] == '$' && chars[j + 1] == '$' {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Finds the closing `$` of an inline span starting after `from − 1`.
///
/// Inline content cannot contain `$`, so the first `$` closes the span —
/// unless it begins a `$$`, in which case the span cannot be closed.
fn find_inline_close(chars: &[char], from: usize) -> Option<usize> {
    let j = (from..chars.len()).find(|&j| chars[j] == '$')?;
    if chars.get(j + 1) == Some(&'$') {
        None
    } else {
        Some(j)
    }
}

/// True when the span content reads as a math expression rather than a
/// number with units.
fn span_is_math(content: &[char]) -> bool {
    let has_math_chars = content.iter().any(|&c| {
        c.is_ascii_alphabetic()
            || matches!(
                c,
                '_' | '^' | '{' | '}' | '(' | ')' | '[' | ']' | '+' | '-' | '*' | '/' | '=' | '<'
                    | '>'
            )
    });
    let trimmed: String = content.iter().collect::<String>().trim().to_string();
    let is_just_number = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || c == '.' || c == ',');
    has_math_chars && !is_just_number
}

/// Escapes unescaped `&`, undoing accidental `\\&` double escaping first.
pub fn smart_escape_ampersands(text: &str) -> String {
    let text = text.replace("\\\\&", "\\&");
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev = '\0';
    for c in text.chars() {
        if c == '&' && prev != '\\' {
            out.push_str("\\&");
        } else {
            out.push(c);
        }
        prev = c;
    }
    out
}

/// Escapes `&` inside the bibliography section only.
///
/// Reference entries routinely contain publisher names like `Wiley & Sons`;
/// ampersands elsewhere may be tabular alignment and are left alone.
pub fn fix_bibliography_ampersands(content: &str) -> String {
    let Some(start) = find_bibliography_heading(content) else {
        return content.to_string();
    };
    let end = content[start + 8..]
        .find("\\section")
        .map(|offset| start + 8 + offset)
        .unwrap_or(content.len());

    let mut out = String::with_capacity(content.len() + 8);
    out.push_str(&content[..start]);
    out.push_str(&smart_escape_ampersands(&content[start..end]));
    out.push_str(&content[end..]);
    out
}

/// Byte offset of the `\section`/`\section*` heading that opens the
/// bibliography, located by title keyword.
fn find_bibliography_heading(content: &str) -> Option<usize> {
    for (idx, _) in content.match_indices("\\section") {
        let rest = &content[idx + 8..];
        let rest = rest.strip_prefix('*').unwrap_or(rest);
        if let Some(body) = rest.strip_prefix('{') {
            if let Some(close) = body.find('}') {
                if is_bibliography_chapter(&body[..close]) {
                    return Some(idx);
                }
            }
        }
    }
    None
}

/// Escapes `#`, `%`, `^`, `_`, `~` on plain-text lines.
///
/// Lines carrying any backslash are left untouched: they either hold a LaTeX
/// command whose argument must not be mangled, or were already escaped.
fn escape_specials_outside_commands(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            if line.contains('\\') {
                line.to_string()
            } else {
                line.replace('#', "\\#")
                    .replace('%', "\\%")
                    .replace('^', "\\textasciicircum{}")
                    .replace('_', "\\_")
                    .replace('~', "\\textasciitilde{}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops empty commands (`\emph{ }`), empty brace groups, and collapses runs
/// of `\\` line breaks to a single one.
fn strip_empty_constructs(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' {
            let mut run = 0;
            while i + run < chars.len() && chars[i + run] == '\\' {
                run += 1;
            }
            if run >= 2 {
                out.push_str("\\\\");
                i += run;
                continue;
            }
            // \command{   } with nothing but whitespace inside → drop.
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_alphabetic() {
                j += 1;
            }
            if j > i + 1 && j < chars.len() && chars[j] == '{' {
                if let Some(close) = find_group_close(&chars, j + 1) {
                    if chars[j + 1..close].iter().all(|c| c.is_whitespace()) {
                        i = close + 1;
                        continue;
                    }
                }
            }
            out.push('\\');
            i += 1;
            continue;
        }
        if chars[i] == '{' {
            if let Some(close) = find_group_close(&chars, i + 1) {
                if chars[i + 1..close].iter().all(|c| c.is_whitespace()) {
                    i = close + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn find_group_close(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len()).find(|&j| chars[j] == '}')
}

/// Collapses runs of blank lines to one and trims trailing whitespace.
fn normalize_blank_lines(content: &str) -> String {
    let mut out_lines: Vec<&str> = Vec::new();
    let mut blanks = 0;
    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blanks += 1;
            if blanks <= 1 {
                out_lines.push("");
            }
        } else {
            blanks = 0;
            out_lines.push(line);
        }
    }
    out_lines.join("\n")
}

/// The full sanitation pipeline applied to every generated fragment before it
/// enters the document shell.
pub fn clean_latex_content(content: &str) -> String {
    let content = strip_markdown_fences(content);
    let content = smart_escape_dollars(&content);
    let content = escape_specials_outside_commands(&content);
    let content = strip_empty_constructs(&content);
    normalize_blank_lines(&content)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── strip_markdown_fences ───────────────────────────────────────────────

    #[test]
    fn test_strip_fences_with_latex_tag() {
        let input = "```latex\n\\section{A}\ntext\n```";
        assert_eq!(strip_markdown_fences(input), "\\section{A}\ntext");
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let input = "```\ntext\n```";
        assert_eq!(strip_markdown_fences(input), "text");
    }

    #[test]
    fn test_strip_fences_no_fences() {
        assert_eq!(strip_markdown_fences("plain text"), "plain text");
    }

    // ── smart_escape_dollars ────────────────────────────────────────────────

    #[test]
    fn test_dollars_money_and_math_mixed() {
        let out = smart_escape_dollars("$C(t)$ costs $5");
        assert_eq!(out, "$C(t)$ costs \\$5");
    }

    #[test]
    fn test_dollars_display_math_preserved() {
        let input = "before $$x = y^2$$ after, price $10";
        let out = smart_escape_dollars(input);
        assert_eq!(out, "before $$x = y^2$$ after, price \\$10");
    }

    #[test]
    fn test_dollars_bracket_syntax_preserved() {
        let input = "\\(a+b\\) and \\[c=d\\] cost $3";
        let out = smart_escape_dollars(input);
        assert_eq!(out, "\\(a+b\\) and \\[c=d\\] cost \\$3");
    }

    #[test]
    fn test_dollars_paired_around_plain_number_is_money() {
        // "$100$" has no math characters → both dollars are literal.
        assert_eq!(smart_escape_dollars("fee of $100$ total"), "fee of \\$100\\$ total");
    }

    #[test]
    fn test_dollars_idempotent() {
        let inputs = [
            "$C(t)$ costs $5",
            "already \\$5 escaped",
            "$$x$$ and $y_i$ and $7",
            "no dollars at all",
        ];
        for input in inputs {
            let once = smart_escape_dollars(input);
            let twice = smart_escape_dollars(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_dollars_already_escaped_not_doubled() {
        assert_eq!(smart_escape_dollars("pay \\$5 now"), "pay \\$5 now");
    }

    #[test]
    fn test_dollars_double_escape_normalized() {
        assert_eq!(smart_escape_dollars("pay \\\\$5 now"), "pay \\$5 now");
    }

    #[test]
    fn test_dollars_inline_math_with_subscript() {
        assert_eq!(smart_escape_dollars("value $x_i$ here"), "value $x_i$ here");
    }

    // ── ampersands ──────────────────────────────────────────────────────────

    #[test]
    fn test_ampersand_escape_and_idempotence() {
        assert_eq!(smart_escape_ampersands("Wiley & Sons"), "Wiley \\& Sons");
        assert_eq!(smart_escape_ampersands("Wiley \\& Sons"), "Wiley \\& Sons");
        assert_eq!(smart_escape_ampersands("Wiley \\\\& Sons"), "Wiley \\& Sons");
    }

    #[test]
    fn test_bibliography_ampersands_scoped_to_section() {
        let content = "\
\\section{Analysis}
Smith & Jones disagree.

\\section{References}
\\begin{thebibliography}{99}
\\bibitem{source1} Wiley & Sons, 2020.
\\end{thebibliography}";
        let out = fix_bibliography_ampersands(content);
        assert!(
            out.contains("Smith & Jones"),
            "main text ampersand must stay raw"
        );
        assert!(out.contains("Wiley \\& Sons"), "bibliography ampersand escaped");
    }

    #[test]
    fn test_bibliography_ampersands_no_bibliography() {
        let content = "\\section{Body}\nA & B";
        assert_eq!(fix_bibliography_ampersands(content), content);
    }

    // ── clean_latex_content ─────────────────────────────────────────────────

    #[test]
    fn test_clean_escapes_specials_on_plain_lines() {
        let out = clean_latex_content("growth of 50% was seen\nitem #3");
        assert!(out.contains("50\\%"));
        assert!(out.contains("\\#3"));
    }

    #[test]
    fn test_clean_leaves_command_lines_alone() {
        let input = "\\section{Results & Discussion}";
        assert_eq!(clean_latex_content(input), input);
    }

    #[test]
    fn test_clean_drops_empty_commands_and_groups() {
        let out = clean_latex_content("a \\emph{ } b { } c");
        assert_eq!(out, "a  b  c");
    }

    #[test]
    fn test_clean_collapses_line_break_runs() {
        let out = clean_latex_content("one\\\\\\\\two");
        assert_eq!(out, "one\\\\two");
    }

    #[test]
    fn test_clean_collapses_blank_lines() {
        let out = clean_latex_content("a\n\n\n\nb");
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn test_clean_full_fragment() {
        let input = "```latex\n\\section{Costs}\nThe fee is $20 per month.\n```";
        let out = clean_latex_content(input);
        assert!(out.starts_with("\\section{Costs}"));
        assert!(out.contains("\\$20"));
        assert!(!out.contains("```"));
    }
}
