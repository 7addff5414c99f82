//! HTML answer-sheet report.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use coursekit_core::answersheet::{Outcome, ReconciledSheet};

use crate::{format_timestamp, outcome_label};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn outcome_class(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Correct => "correct",
        Outcome::Incorrect => "incorrect",
        Outcome::Unanswered | Outcome::Ungraded => "neutral",
    }
}

/// Generate an HTML page reviewing one attempt.
pub fn generate_html(sheet: &ReconciledSheet) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>Folha de respostas #{}</title>\n",
        sheet.attempt.id
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>Folha de respostas: tentativa #{}</h1>\n",
        sheet.attempt.id
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Avaliação <strong>{}</strong> | {} | Nota registrada: <strong>{}</strong> | Acertos conferidos: <strong>{}</strong></p>\n",
        sheet.exam_id,
        html_escape(&format_timestamp(&sheet.attempt)),
        html_escape(&sheet.recorded_display()),
        html_escape(&sheet.accuracy_display()),
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"questions\">\n");
    if sheet.items.is_empty() {
        html.push_str("<p class=\"empty\">Nenhuma questão nesta folha de respostas.</p>\n");
    }
    for item in &sheet.items {
        html.push_str(&format!(
            "<article class=\"question {}\">\n<h2>{}. {} <span class=\"badge\">{}</span></h2>\n<ul>\n",
            outcome_class(item.outcome),
            item.position,
            html_escape(&item.text),
            outcome_label(item.outcome),
        ));
        for option in &item.options {
            let mut classes = Vec::new();
            if option.correct {
                classes.push("right");
            }
            if option.chosen {
                classes.push("chosen");
            }
            let mut label = html_escape(&option.text);
            if option.chosen {
                label.push_str(" <em>(sua resposta)</em>");
            }
            if option.correct {
                label.push_str(" <strong>(correta)</strong>");
            }
            html.push_str(&format!(
                "<li class=\"{}\">{}</li>\n",
                classes.join(" "),
                label
            ));
        }
        html.push_str("</ul>\n</article>\n");
    }
    html.push_str("</section>\n");

    html.push_str(&format!(
        "<footer>Gerado em {}</footer>\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(sheet: &ReconciledSheet, path: &Path) -> Result<()> {
    let html = generate_html(sheet);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --right: #dcfce7; --wrong: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --right: #064e3b; --wrong: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
.meta { color: #6b7280; }
.question { border: 1px solid var(--border); border-radius: 8px; padding: 0 1rem; margin: 1rem 0; }
.question.correct { border-left: 6px solid #22c55e; }
.question.incorrect { border-left: 6px solid #ef4444; }
.question.neutral { border-left: 6px solid #9ca3af; }
.badge { font-size: 0.8rem; font-weight: normal; color: #6b7280; }
li { padding: 0.25rem 0.5rem; margin: 0.25rem 0; list-style: none; border-radius: 4px; }
li.right { background: var(--right); }
li.chosen:not(.right) { background: var(--wrong); }
footer { margin-top: 2rem; color: #6b7280; font-size: 0.8rem; }
"#;
