//! Markdown rendering, for pasting into issues and course notes.

use std::fmt::Write;

use coursekit_core::answersheet::ReconciledSheet;
use coursekit_core::model::{display_score, Attempt};

use crate::{format_timestamp, outcome_label};

/// Escape characters that would break a table cell or inline formatting.
fn md_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '|' | '*' | '_' | '`' | '[' | ']' | '\\') {
            out.push('\\');
        }
        if c == '\n' {
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_markdown(sheet: &ReconciledSheet) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Folha de respostas: tentativa #{}\n", sheet.attempt.id);
    let _ = writeln!(md, "| Avaliação | Data | Nota registrada | Acertos conferidos |");
    let _ = writeln!(md, "|---|---|---|---|");
    let _ = writeln!(
        md,
        "| {} | {} | {} | {} |\n",
        sheet.exam_id,
        md_escape(&format_timestamp(&sheet.attempt)),
        sheet.recorded_display(),
        sheet.accuracy_display()
    );

    for item in &sheet.items {
        let _ = writeln!(
            md,
            "## {}. {} ({})\n",
            item.position,
            md_escape(&item.text),
            outcome_label(item.outcome)
        );
        for option in &item.options {
            let mut line = format!("- {}", md_escape(&option.text));
            if option.correct {
                line.push_str(" **(correta)**");
            }
            if option.chosen {
                line.push_str(" _(sua resposta)_");
            }
            let _ = writeln!(md, "{line}");
        }
        let _ = writeln!(md);
    }
    md
}

/// A user's attempt history as a Markdown table.
pub fn attempts_markdown(attempts: &[Attempt]) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "| Tentativa | Avaliação | Data | Nota |");
    let _ = writeln!(md, "|---|---|---|---|");
    for attempt in attempts {
        let exam = attempt
            .exam_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} |",
            attempt.id,
            exam,
            md_escape(&format_timestamp(attempt)),
            display_score(attempt.score())
        );
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn sheet_markdown() {
        let md = to_markdown(&fixtures::sheet());
        assert!(md.starts_with("# Folha de respostas: tentativa #11"));
        assert!(md.contains("| 4 | 01/03/2024 10:30 | 1/2 | 1/2 |"));
        assert!(md.contains("## 2. Cor do extintor de CO2? (Incorreta)"));
        assert!(md.contains("- Preto **(correta)**"));
        assert!(md.contains("- Azul _(sua resposta)_"));
    }

    #[test]
    fn attempts_table_uses_canonical_score() {
        let mut empty = fixtures::attempt();
        empty.id = 12;
        empty.correct_count = Some(0);
        empty.total_count = Some(0);
        let mut unknown = fixtures::attempt();
        unknown.id = 13;
        unknown.total_count = None;
        unknown.exam_id = None;

        let md = attempts_markdown(&[fixtures::attempt(), empty, unknown]);
        assert!(md.contains("| 11 | 4 | 01/03/2024 10:30 | 1/2 |"));
        assert!(md.contains("| 12 | 4 | 01/03/2024 10:30 | Sem respostas |"));
        assert!(md.contains("| 13 | - | 01/03/2024 10:30 | — |"));
    }

    #[test]
    fn escapes_table_breakers() {
        assert_eq!(md_escape("a|b*c\nd"), "a\\|b\\*c d");
    }
}
