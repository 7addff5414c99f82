//! The `coursekit attempts` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use coursekit_core::model::{display_score, UserId};
use coursekit_core::traits::AttemptApi;
use coursekit_report::attempts_markdown;

use super::Session;

pub async fn execute(config_path: Option<PathBuf>, user: Option<UserId>, format: String) -> Result<()> {
    let session = Session::open(config_path)?;
    let user_id = session.user_id(user)?;

    let mut attempts = session
        .backend
        .attempts_for_user(user_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    attempts.sort_by_key(|a| std::cmp::Reverse(a.submitted_at()));

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&attempts)?),
        "markdown" | "md" => print!("{}", attempts_markdown(&attempts)),
        "text" => {
            if attempts.is_empty() {
                println!("No attempts found for user {user_id}.");
                return Ok(());
            }
            let mut table = Table::new();
            table.set_header(vec!["Attempt", "Exam", "Submitted", "Score"]);
            for attempt in &attempts {
                let exam = attempt
                    .exam_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let submitted = attempt
                    .submitted_at()
                    .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![
                    Cell::new(attempt.id),
                    Cell::new(exam),
                    Cell::new(submitted),
                    Cell::new(display_score(attempt.score())),
                ]);
            }
            println!("{table}");
        }
        other => anyhow::bail!("unknown format '{other}' (expected text, markdown or json)"),
    }

    Ok(())
}
