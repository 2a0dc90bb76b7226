//! Single company processor - orchestration layer
//!
//! The company-task boundary: whatever happens inside the flow, including a
//! panic, ends here as exactly one persisted run record.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use tracing::{error, info};

use crate::services::RunMetadataRecorder;
use crate::workflow::{CompanyCtx, CompanyFlow, CompanyOutcome};

/// What the batch needs to know about one finished company
#[derive(Debug, Clone)]
pub struct CompanyResult {
    pub company: String,
    pub success: bool,
    /// First-level error message of a failed run
    pub error: Option<String>,
    pub outcome: CompanyOutcome,
    pub metadata_path: Option<PathBuf>,
}

/// Run one company end to end and persist its record
pub async fn process_company(flow: &CompanyFlow, ctx: CompanyCtx, metadata_dir: &Path) -> CompanyResult {
    info!("{} ▶️ start", ctx);
    let mut recorder = RunMetadataRecorder::new(&ctx.company, metadata_dir);

    let result = AssertUnwindSafe(flow.run(&ctx, &mut recorder))
        .catch_unwind()
        .await;

    let (outcome, error) = match result {
        Ok(Ok(outcome)) => (outcome, None),
        Ok(Err(e)) => {
            error!("{} ❌ {}", ctx, e);
            (CompanyOutcome::default(), Some(e.to_string()))
        }
        Err(panic) => {
            let message = format!("task panicked: {}", panic_message(panic.as_ref()));
            error!("{} ❌ {}", ctx, message);
            (CompanyOutcome::default(), Some(message))
        }
    };

    let success = error.is_none();
    let metadata_path = recorder.complete(success, error.clone()).await;

    CompanyResult {
        company: ctx.company.name.clone(),
        success,
        error,
        outcome,
        metadata_path,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
