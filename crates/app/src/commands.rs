use anyhow::{Context, Result};
use bankin_core::ClassifiedTransaction;
use bankin_import::{FormatHint, StagingBatch, Upload};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::AppState;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A commit accepts either a whole preview batch or just its payload array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommitInput {
    Batch(StagingBatch),
    Payload(Vec<ClassifiedTransaction>),
}

impl CommitInput {
    fn into_payload(self) -> Vec<ClassifiedTransaction> {
        match self {
            CommitInput::Batch(batch) => batch.payload,
            CommitInput::Payload(payload) => payload,
        }
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Copies the user's file into the uploads directory; the import consumes
/// the copy, never the file the user pointed at.
fn stage_upload(state: &AppState, file: &Path, sheet: Option<String>) -> Result<Upload> {
    let name = file
        .file_name()
        .context("Input path has no file name")?
        .to_string_lossy();
    let staged: PathBuf = state
        .uploads_dir
        .join(format!("{}-{}", std::process::id(), name));
    std::fs::copy(file, &staged)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    Ok(if is_spreadsheet(file) {
        Upload::spreadsheet(staged, sheet)
    } else {
        Upload::csv(staged)
    })
}

pub async fn preview(
    state: &AppState,
    file: &Path,
    format: FormatHint,
    sheet: Option<String>,
    out: Option<&Path>,
) -> Result<()> {
    let upload = stage_upload(state, file, sheet)?;
    let batch = state
        .coordinator
        .preview_upload(state.owner, upload, format)
        .await
        .with_context(|| format!("Failed to preview {}", file.display()))?;

    let json = serde_json::to_string_pretty(&batch)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(
                "{} new, {} duplicates; batch written to {}",
                batch.new_count,
                batch.duplicate_count,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn commit(state: &AppState, batch: &Path) -> Result<()> {
    let mut raw = String::new();
    if batch == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read batch from stdin")?;
    } else {
        raw = std::fs::read_to_string(batch)
            .with_context(|| format!("Failed to read {}", batch.display()))?;
    }

    let input: CommitInput = serde_json::from_str(&raw).context("Batch is not valid JSON")?;
    let payload = input.into_payload();

    let receipt = state
        .coordinator
        .commit(state.owner, &payload)
        .await
        .context("Commit failed")?;
    println!("{}", serde_json::to_string(&receipt)?);
    Ok(())
}
