//! Work generation pipeline — ties plan, content, templating, and the
//! external compilers together for one order.
//!
//! Flow: status→generating → plan → stepwise content (or the short-form
//! path) → document shell → persist tex → compile PDF → best-effort DOCX →
//! deliver artifacts → status→completed. Any error flips the order to
//! `failed` and notifies the admin channel with the full detail.
//!
//! Resource lifetimes are scoped to this function: the LLM [`Conversation`]
//! and the compiler scratch [`tempfile::TempDir`] are both dropped on every
//! exit path — success, error, or panic.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::budget::count_pages_in_text;
use crate::content::generator::SIMPLE_WORK_MAX_PAGES;
use crate::content::{
    generate_simple_work_content, generate_work_content_stepwise, generate_work_plan,
    GenerationWarning, WorkParams,
};
use crate::convert::{compile_latex_to_pdf, convert_tex_to_docx};
use crate::errors::AppError;
use crate::latex::create_latex_document;
use crate::llm_client::Conversation;
use crate::orders::{get_order, save_full_tex, update_order_status, OrderRow, OrderStatus};
use crate::progress::ProgressSink;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Admin notification seam
// ────────────────────────────────────────────────────────────────────────────

/// Out-of-band channel for degradations the user never sees in the response
/// body: kept-invalid fragments and fatal pipeline failures.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify_warning(&self, order_id: i64, warning: &GenerationWarning);
    async fn notify_failure(&self, order_id: i64, detail: &str);
}

/// Default notifier: the structured log is the admin channel.
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify_warning(&self, order_id: i64, warning: &GenerationWarning) {
        warn!(
            order_id,
            unit = %warning.unit,
            attempts = warning.attempts,
            "fragment kept despite failed validation: {}",
            warning.detail
        );
    }

    async fn notify_failure(&self, order_id: i64, detail: &str) {
        error!(order_id, "order generation failed: {detail}");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of a completed generation run.
#[derive(Debug, Serialize)]
pub struct WorkReport {
    pub order_id: i64,
    pub status: OrderStatus,
    pub pages_generated: f32,
    pub pdf_path: String,
    pub docx_path: Option<String>,
    pub warnings: Vec<GenerationWarning>,
}

/// Runs the full pipeline for an order, managing its status transitions.
pub async fn generate_work(
    state: &AppState,
    order_id: i64,
    progress: &dyn ProgressSink,
) -> Result<WorkReport, AppError> {
    let order = get_order(&state.db, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

    update_order_status(&state.db, order_id, OrderStatus::Generating).await?;

    match run_pipeline(state, &order, progress).await {
        Ok(report) => {
            update_order_status(&state.db, order_id, OrderStatus::Completed).await?;
            Ok(report)
        }
        Err(e) => {
            update_order_status(&state.db, order_id, OrderStatus::Failed).await?;
            state.notifier.notify_failure(order_id, &e.to_string()).await;
            Err(e)
        }
    }
}

async fn run_pipeline(
    state: &AppState,
    order: &OrderRow,
    progress: &dyn ProgressSink,
) -> Result<WorkReport, AppError> {
    let mut conversation = Conversation::new(&order.model);
    info!(
        "order {}: generation started with model {}",
        order.id,
        conversation.model()
    );
    let params = WorkParams {
        theme: &order.theme,
        pages: order.pages as u32,
        work_type: &order.work_type,
    };

    // Tiny orders skip the outline machinery and the TOC.
    let (content, include_toc) = if params.pages <= SIMPLE_WORK_MAX_PAGES {
        progress.update(10, "Generating short-form content...").await;
        let content = generate_simple_work_content(&state.llm, &mut conversation, &params).await?;
        (content, false)
    } else {
        progress.update(5, "Drafting the work plan...").await;
        let plan = generate_work_plan(&state.llm, &mut conversation, &params).await?;

        progress
            .update(10, "Generating content chapter by chapter...")
            .await;
        let content = generate_work_content_stepwise(
            &state.llm,
            &mut conversation,
            &state.budget,
            &params,
            &plan,
            progress,
        )
        .await?;
        (content, true)
    };

    for warning in &content.warnings {
        state.notifier.notify_warning(order.id, warning).await;
    }

    let pages_generated = count_pages_in_text(&content.latex, &state.budget);
    info!(
        "order {}: generated {pages_generated:.1} content pages (target {})",
        order.id, order.pages
    );

    progress.update(96, "Assembling the LaTeX document...").await;
    let full_tex = create_latex_document(&order.theme, &content.latex, include_toc);
    save_full_tex(&state.db, order.id, &full_tex).await?;

    // Compiler scratch space; removed on drop whatever happens below.
    let temp_dir = tempfile::tempdir()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create temp dir: {e}")))?;
    let stem = format!("work_{}", order.id);

    progress.update(97, "Compiling PDF...").await;
    let pdf_path = compile_latex_to_pdf(&full_tex, temp_dir.path(), &stem).await?;

    progress.update(99, "Converting to DOCX...").await;
    let docx_path = match convert_tex_to_docx(&full_tex, temp_dir.path(), &stem).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(
                "order {}: DOCX conversion failed, delivering PDF only: {e}",
                order.id
            );
            None
        }
    };

    // Move artifacts out of the scratch dir before it is dropped.
    let artifacts_dir = state.config.artifacts_dir.join(order.id.to_string());
    tokio::fs::create_dir_all(&artifacts_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create artifacts dir: {e}")))?;

    let delivered_pdf = artifacts_dir.join(format!("{stem}.pdf"));
    tokio::fs::copy(&pdf_path, &delivered_pdf)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to deliver PDF: {e}")))?;

    let mut delivered_docx = None;
    if let Some(path) = docx_path {
        let target = artifacts_dir.join(format!("{stem}.docx"));
        match tokio::fs::copy(&path, &target).await {
            Ok(_) => delivered_docx = Some(target),
            Err(e) => warn!("order {}: failed to deliver DOCX: {e}", order.id),
        }
    }

    progress.update(100, "Generation finished").await;
    info!(
        "order {}: pipeline complete after {} LLM messages",
        order.id,
        conversation.turns()
    );

    Ok(WorkReport {
        order_id: order.id,
        status: OrderStatus::Completed,
        pages_generated,
        pdf_path: delivered_pdf.display().to_string(),
        docx_path: delivered_docx.map(|p| p.display().to_string()),
        warnings: content.warnings,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
