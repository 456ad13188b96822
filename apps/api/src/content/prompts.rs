// All LLM prompt constants for the content generation module.
// Placeholders are filled with `str::replace` before sending; every template
// pins the LaTeX fragment contract (sectioning command, \cite{sourceN} keys,
// thebibliography shape) so downstream sanitation has a stable input.

/// Work-plan request. Replace `{work_type}`, `{theme}`, `{pages}`.
pub const PLAN_PROMPT_TEMPLATE: &str = "\
Compose a detailed outline for a {work_type} on the topic \"{theme}\", \
targeting {pages} pages. The outline must consist of:
1. Introduction
2. 3-4 main chapters (each with 2-3 subsections)
3. Conclusion
4. References

Answer format:
1. Introduction
2. Title of the first chapter
   2.1 Subsection
   2.2 Subsection
3. Title of the second chapter
   3.1 Subsection
   3.2 Subsection
And so on.";

/// Introduction chapter. Replace `{work_type}`, `{theme}`, `{target_chars}`.
pub const INTRODUCTION_PROMPT_TEMPLATE: &str = "\
Write the introduction for a {work_type} on the topic \"{theme}\".

The introduction must cover:
- Relevance of the topic
- Goal and objectives of the work
- Object and subject of the study
- Research methods
- Structure of the work

Length: approximately {target_chars} characters.
Format: LaTeX (start with \\section{Introduction}).
Do NOT use long lines - break paragraphs into short lines (up to 80 characters).
Reference sources with \\cite{source1}, \\cite{source2} etc. where appropriate.";

/// Conclusion chapter. Replace `{work_type}`, `{theme}`, `{target_chars}`.
pub const CONCLUSION_PROMPT_TEMPLATE: &str = "\
Write the conclusion for a {work_type} on the topic \"{theme}\".

The conclusion must cover:
- Brief findings for each chapter
- Whether the stated goal and objectives were achieved
- Practical significance of the results
- Directions for further research

Length: approximately {target_chars} characters.
Format: LaTeX (start with \\section{Conclusion}).
Do NOT use long lines - break paragraphs into short lines (up to 80 characters).
Reference sources with \\cite{source1}, \\cite{source2} etc. where appropriate.";

/// Bibliography chapter. Replace `{work_type}`, `{theme}`, `{source_range}`.
pub const BIBLIOGRAPHY_PROMPT_TEMPLATE: &str = "\
Create the list of references for a {work_type} on the topic \"{theme}\".

Include {source_range} sources:
- Journal articles
- Monographs
- Textbooks
- Online resources
- Regulatory documents (if applicable)

IMPORTANT: use the LaTeX thebibliography format so citations resolve!

The format must be:
\\section{References}

\\begin{thebibliography}{99}
\\bibitem{source1} Smith, J. Foundations of Information Systems. London: Routledge, 2018. 432 p.
\\bibitem{source2} The next source...
\\end{thebibliography}

Every source must have a unique key (source1, source2, source3 and so on) in its \\bibitem{key} command.
Do NOT use long lines - break entries into short lines (up to 80 characters).";

/// Generic body chapter. Replace `{chapter_title}`, `{work_type}`, `{theme}`,
/// `{target_chars}`.
pub const CHAPTER_PROMPT_TEMPLATE: &str = "\
Write the chapter \"{chapter_title}\" for a {work_type} on the topic \"{theme}\".

The chapter must be substantive and academic, covering:
- Theoretical foundations
- Analysis of existing approaches
- Practical aspects
- Examples and illustrations

Length: approximately {target_chars} characters.
Format: LaTeX (start with \\section{{chapter_title}}).
Do NOT use long lines - break paragraphs into short lines (up to 80 characters).
You may include formulas, tables or figures where appropriate.
Reference sources with \\cite{source1}, \\cite{source2} etc. where appropriate.";

/// Asks the LLM to invent subsection titles when the plan gave none.
/// Replace `{chapter_title}`, `{theme}`.
pub const SUBSECTION_TITLES_PROMPT_TEMPLATE: &str = "\
Suggest 2-3 subsections for the chapter \"{chapter_title}\" in a work on the topic \"{theme}\".
Answer with the subsection titles only, one per line, without numbering.";

/// Single subsection body. Replace `{subsection}`, `{chapter_title}`,
/// `{theme}`, `{target_chars}`.
pub const SUBSECTION_PROMPT_TEMPLATE: &str = "\
Write the subsection \"{subsection}\" for the chapter \"{chapter_title}\" in a work on the topic \"{theme}\".

IMPORTANT: this is a subsection, NOT a standalone chapter!

The subsection must be detailed and substantive.
Length: approximately {target_chars} characters.

Format: LaTeX
- You MUST start with \\subsection{{subsection}} (NOT \\section!)
- Do NOT use long lines - break paragraphs into short lines (up to 80 characters)
- Write academic prose with examples and analysis
- Reference sources with \\cite{source1}, \\cite{source2} etc. where appropriate

Start with the command \\subsection{{subsection}} and continue with the content.";

/// Short-form work body (1-2 pages, no outline). Replace `{work_type}`, `{theme}`.
pub const SIMPLE_WORK_PROMPT_TEMPLATE: &str = "\
Write a {work_type} on the topic \"{theme}\", approximately 1-2 pages long.

The text must be brief but substantive and include:
- A short introduction (2-3 paragraphs)
- A main part analyzing the topic (3-4 paragraphs)
- A short conclusion (1-2 paragraphs)

IMPORTANT formatting requirements:
- The text must be LaTeX (no preamble, no \\begin{document})
- Start with \\section{Introduction}
- Use \\section{Main Part} for the main part
- Use \\section{Conclusion} for the conclusion
- Do NOT use long lines - break paragraphs into short lines (at most 80 characters)
- The text must be academic
- Reference sources with \\cite{source1}, \\cite{source2} etc. where appropriate

Start directly with the introduction:";

/// Legacy fallback: the whole document in one call, no volume control.
/// Replace `{work_type}`, `{theme}`, `{pages}`.
pub const LEGACY_FULL_WORK_PROMPT_TEMPLATE: &str = "\
Write a complete {work_type} on the topic \"{theme}\", approximately {pages} pages long.

The structure must include:
1. Introduction (1-2 pages)
2. Main part (3-4 chapters, 2-3 pages each)
3. Conclusion (1-2 pages)
4. References

IMPORTANT formatting requirements:
- The text must be LaTeX (no preamble, no \\begin{document})
- Use \\section{} for chapters and \\subsection{} for subsections
- Do NOT use long lines - break paragraphs into short lines (at most 80 characters)
- Include formulas, tables or figures where appropriate
- The text must be academic and well structured
- Add real sources to the reference list

Start directly with the introduction:";
