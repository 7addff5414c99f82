//! Plain-text rendering for the terminal.

use std::fmt::Write;

use coursekit_core::answersheet::ReconciledSheet;

use crate::{format_timestamp, outcome_label};

pub fn to_text(sheet: &ReconciledSheet) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Tentativa #{} | avaliação {} | {}",
        sheet.attempt.id,
        sheet.exam_id,
        format_timestamp(&sheet.attempt)
    );
    let _ = writeln!(
        out,
        "Nota registrada: {} | acertos conferidos: {}",
        sheet.recorded_display(),
        sheet.accuracy_display()
    );

    for item in &sheet.items {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}. {} [{}]",
            item.position,
            item.text,
            outcome_label(item.outcome)
        );
        for option in &item.options {
            let marker = match (option.chosen, option.correct) {
                (true, true) => "[x]",
                (true, false) => "[!]",
                (false, true) => "[*]",
                (false, false) => "[ ]",
            };
            let _ = writeln!(out, "   {marker} {}", option.text);
        }
    }
    out
}
