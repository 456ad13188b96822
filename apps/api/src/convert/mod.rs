//! Document conversion via external compilers.
//!
//! pdflatex runs twice so the TOC and cross-references resolve. Success is
//! judged by the output file existing with a plausible size, NOT by exit
//! code — pdflatex exits non-zero on mere warnings. Failures carry the full
//! stdout/stderr of every pass so the operator can read the actual log.
//!
//! All commands run with the per-order temp directory as working directory;
//! the caller owns that directory's lifetime.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// A PDF smaller than this is a pdflatex stub, not a document.
const MIN_PDF_SIZE_BYTES: u64 = 1000;
/// Same heuristic for DOCX output.
const MIN_DOCX_SIZE_BYTES: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdflatex produced no usable PDF (last exit code {exit_code:?})\n{log}")]
    PdfNotProduced {
        exit_code: Option<i32>,
        log: String,
    },

    #[error("DOCX conversion failed with every available tool\n{log}")]
    DocxNotProduced { log: String },
}

/// Compiles LaTeX source to a PDF inside `work_dir`, returning the PDF path.
pub async fn compile_latex_to_pdf(
    tex_content: &str,
    work_dir: &Path,
    stem: &str,
) -> Result<PathBuf, ConvertError> {
    let tex_path = work_dir.join(format!("{stem}.tex"));
    let pdf_path = work_dir.join(format!("{stem}.pdf"));
    tokio::fs::write(&tex_path, tex_content).await?;

    let mut log = String::new();
    let mut last_exit_code = None;

    // Two passes: the first writes the .aux/.toc files the second reads.
    for pass in 1..=2 {
        let output = Command::new("pdflatex")
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(work_dir)
            .arg(&tex_path)
            .current_dir(work_dir)
            .output()
            .await
            .map_err(|source| ConvertError::Spawn {
                tool: "pdflatex",
                source,
            })?;

        last_exit_code = output.status.code();
        append_pass_log(&mut log, &format!("pdflatex pass {pass}"), &output);
    }

    if file_is_usable(&pdf_path, MIN_PDF_SIZE_BYTES).await {
        info!("pdflatex produced {}", pdf_path.display());
        return Ok(pdf_path);
    }

    Err(ConvertError::PdfNotProduced {
        exit_code: last_exit_code,
        log,
    })
}

/// Converts LaTeX source to DOCX inside `work_dir`: pandoc first, then
/// LibreOffice as fallback. Returns the DOCX path.
pub async fn convert_tex_to_docx(
    tex_content: &str,
    work_dir: &Path,
    stem: &str,
) -> Result<PathBuf, ConvertError> {
    let tex_path = work_dir.join(format!("{stem}.tex"));
    let docx_path = work_dir.join(format!("{stem}.docx"));
    tokio::fs::write(&tex_path, tex_content).await?;

    let mut log = String::new();

    match Command::new("pandoc")
        .arg(&tex_path)
        .arg("-o")
        .arg(&docx_path)
        .current_dir(work_dir)
        .output()
        .await
    {
        Ok(output) => {
            append_pass_log(&mut log, "pandoc", &output);
            if file_is_usable(&docx_path, MIN_DOCX_SIZE_BYTES).await {
                return Ok(docx_path);
            }
        }
        Err(e) => {
            warn!("pandoc unavailable: {e}");
            log.push_str(&format!("=== pandoc ===\nfailed to spawn: {e}\n"));
        }
    }

    // LibreOffice names the output after the input stem in --outdir.
    match Command::new("soffice")
        .arg("--headless")
        .arg("--convert-to")
        .arg("docx")
        .arg("--outdir")
        .arg(work_dir)
        .arg(&tex_path)
        .current_dir(work_dir)
        .output()
        .await
    {
        Ok(output) => {
            append_pass_log(&mut log, "soffice", &output);
            if file_is_usable(&docx_path, MIN_DOCX_SIZE_BYTES).await {
                return Ok(docx_path);
            }
        }
        Err(e) => {
            warn!("soffice unavailable: {e}");
            log.push_str(&format!("=== soffice ===\nfailed to spawn: {e}\n"));
        }
    }

    Err(ConvertError::DocxNotProduced { log })
}

/// True when the file exists and exceeds `min_bytes`.
async fn file_is_usable(path: &Path, min_bytes: u64) -> bool {
    matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.len() > min_bytes)
}

fn append_pass_log(log: &mut String, label: &str, output: &std::process::Output) {
    log.push_str(&format!(
        "=== {label} (exit {:?}) ===\n--- stdout ---\n{}\n--- stderr ---\n{}\n",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    ));
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_is_usable_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!file_is_usable(&dir.path().join("absent.pdf"), 1000).await);
    }

    #[tokio::test]
    async fn test_file_is_usable_too_small() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.pdf");
        tokio::fs::write(&path, b"stub").await.unwrap();
        assert!(!file_is_usable(&path, 1000).await);
    }

    #[tokio::test]
    async fn test_file_is_usable_large_enough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.pdf");
        tokio::fs::write(&path, vec![0u8; 2000]).await.unwrap();
        assert!(file_is_usable(&path, 1000).await);
    }

    #[test]
    fn test_pdf_error_carries_full_log() {
        let err = ConvertError::PdfNotProduced {
            exit_code: Some(1),
            log: "=== pdflatex pass 1 ===\n! Undefined control sequence.".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Undefined control sequence"));
        assert!(message.contains("exit code Some(1)"));
    }

    #[test]
    fn test_append_pass_log_includes_streams() {
        use std::os::unix::process::ExitStatusExt;
        let output = std::process::Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout: b"all good".to_vec(),
            stderr: b"minor warning".to_vec(),
        };
        let mut log = String::new();
        append_pass_log(&mut log, "pdflatex pass 1", &output);
        assert!(log.contains("all good"));
        assert!(log.contains("minor warning"));
        assert!(log.contains("pdflatex pass 1"));
    }
}
