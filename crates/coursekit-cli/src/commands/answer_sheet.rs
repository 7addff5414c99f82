//! The `coursekit answer-sheet` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use coursekit_core::answersheet::reconcile;
use coursekit_core::model::{AttemptId, UserId};
use coursekit_report::{to_markdown, to_text, write_html_report};

use super::Session;

pub async fn execute(
    config_path: Option<PathBuf>,
    attempt_id: AttemptId,
    user: Option<UserId>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open(config_path)?;
    let user_id = session.user_id(user)?;

    let sheet = reconcile(&session.backend, user_id, attempt_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let rendered = match format.as_str() {
        "text" => to_text(&sheet),
        "markdown" | "md" => to_markdown(&sheet),
        "json" => serde_json::to_string_pretty(&sheet)?,
        "html" => {
            let path = output.unwrap_or_else(|| {
                session
                    .config
                    .output_dir
                    .join(format!("answer-sheet-{attempt_id}.html"))
            });
            write_html_report(&sheet, &path)?;
            println!("Report written to {}", path.display());
            return Ok(());
        }
        other => anyhow::bail!("unknown format '{other}' (expected text, markdown, html or json)"),
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
