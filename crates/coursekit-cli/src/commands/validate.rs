//! The `coursekit validate` command.

use std::path::PathBuf;

use anyhow::Result;

use coursekit_core::parser::parse_exam_file;

pub fn execute(exam_path: PathBuf) -> Result<()> {
    let builder = parse_exam_file(&exam_path)?;

    let mode = match builder.exam_id() {
        Some(id) => format!("updates exam #{id}"),
        None => "creates a new exam".to_string(),
    };
    println!(
        "Exam file for course {} ({} questions) {mode}.",
        builder.course_id(),
        builder.questions().len()
    );

    if let Err(e) = builder.validate() {
        anyhow::bail!("{}: {e}", exam_path.display());
    }

    println!("Exam file valid.");
    Ok(())
}
