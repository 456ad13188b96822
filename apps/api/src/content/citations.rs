//! Citation key repair.
//!
//! The LLM invents citation keys freely (`\cite{smith2019}`, `\cite{ref4}`);
//! the bibliography it generates only defines `source1..sourceN`. After the
//! body and bibliography are assembled, every foreign key is remapped onto
//! the real key space: the first N foreign occurrences (document order, one
//! counter across all chapters) become `source1..sourceN`, overflow reuses a
//! uniformly random valid key. With an empty bibliography the markers are
//! stripped instead. Keys inside the bibliography block itself are never
//! rewritten.

use rand::Rng;
use regex::Regex;

const BIB_BEGIN: &str = "\\begin{thebibliography}";
const BIB_END: &str = "\\end{thebibliography}";

/// Rewrites `\cite{…}` keys in the main text to match the generated
/// bibliography. See the module docs for the full policy.
pub fn repair_citation_keys(content: &str) -> String {
    let max_source = max_bibitem_index(content);
    let bib_span = bibliography_span(content);

    let cite_re = Regex::new(r"\\cite\{([^}]*)\}").unwrap();
    let mut next_sequential = 1usize;
    let mut rng = rand::thread_rng();

    let mut rewrite = |segment: &str| -> String {
        cite_re
            .replace_all(segment, |caps: &regex::Captures| {
                let key = caps[1].trim();
                if is_valid_source_key(key, max_source) {
                    return caps[0].to_string();
                }
                if max_source == 0 {
                    // Nothing to point at — drop the marker entirely.
                    return String::new();
                }
                let index = if next_sequential <= max_source {
                    let index = next_sequential;
                    next_sequential += 1;
                    index
                } else {
                    rng.gen_range(1..=max_source)
                };
                format!("\\cite{{source{index}}}")
            })
            .into_owned()
    };

    match bib_span {
        Some((start, end)) => {
            let mut out = String::with_capacity(content.len());
            out.push_str(&rewrite(&content[..start]));
            out.push_str(&content[start..end]);
            out.push_str(&rewrite(&content[end..]));
            out
        }
        None => rewrite(content),
    }
}

/// Highest N across all `\bibitem{sourceN}` entries; 0 when none exist.
fn max_bibitem_index(content: &str) -> usize {
    let bibitem_re = Regex::new(r"\\bibitem\{source(\d+)\}").unwrap();
    bibitem_re
        .captures_iter(content)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}

/// Byte span of the `thebibliography` block, if present.
fn bibliography_span(content: &str) -> Option<(usize, usize)> {
    let start = content.find(BIB_BEGIN)?;
    let end = content[start..]
        .find(BIB_END)
        .map(|offset| start + offset + BIB_END.len())
        .unwrap_or(content.len());
    Some((start, end))
}

/// A key is valid iff it is `sourceK` with `1 ≤ K ≤ max_source` — a key
/// above the bibliography size is just as dangling as a foreign one.
fn is_valid_source_key(key: &str, max_source: usize) -> bool {
    key.strip_prefix("source")
        .and_then(|digits| digits.parse::<usize>().ok())
        .map(|k| k >= 1 && k <= max_source)
        .unwrap_or(false)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
