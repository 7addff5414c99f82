//! The `coursekit exam` subcommands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use coursekit_core::builder::SaveOutcome;
use coursekit_core::deletion::{delete_exam, force_delete_exam, force_prompt, DeleteOutcome};
use coursekit_core::model::{CourseId, ExamId};
use coursekit_core::parser::{exam_to_toml, parse_exam_file};
use coursekit_core::traits::ExamApi;

use super::Session;

pub async fn show(config_path: Option<PathBuf>, course_id: CourseId, as_toml: bool) -> Result<()> {
    let session = Session::open(config_path)?;
    let exam = session
        .backend
        .exam_by_course(course_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let Some(exam) = exam else {
        println!("Course {course_id} has no exam yet.");
        return Ok(());
    };

    if as_toml {
        print!("{}", exam_to_toml(&exam)?);
        return Ok(());
    }

    println!(
        "Exam #{} for course {} (minimum score {:.1})\n",
        exam.id, exam.course_id, exam.min_score
    );

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Alternatives", "Correct"]);
    for question in &exam.questions {
        let alternatives = question
            .ordered_alternatives()
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}) {}", i + 1, a.text))
            .collect::<Vec<_>>()
            .join("\n");
        let correct = question
            .correct_index
            .map(|i| (i + 1).to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(question.number),
            Cell::new(&question.text),
            Cell::new(alternatives),
            Cell::new(correct),
        ]);
    }
    println!("{table}");

    Ok(())
}

pub async fn publish(config_path: Option<PathBuf>, file: PathBuf) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let mut builder = parse_exam_file(&file)?.with_events(session.events.clone());

    let outcome = builder.save(&session.backend).await;
    session.flush_notices();

    match outcome.map_err(|e| anyhow::anyhow!(e.user_message()))? {
        SaveOutcome::Created(saved) => match saved.id {
            Some(id) => println!("Created exam #{id} for course {}.", builder.course_id()),
            None => println!("Created exam for course {}.", builder.course_id()),
        },
        SaveOutcome::Updated(saved) => {
            let id = saved.id.or(builder.exam_id()).unwrap_or_default();
            println!("Updated exam #{id}.");
        }
    }

    Ok(())
}

pub async fn delete(config_path: Option<PathBuf>, exam_id: ExamId, force: bool) -> Result<()> {
    let mut session = Session::open(config_path)?;

    if force {
        let result = force_delete_exam(&session.backend, exam_id, Some(&session.events)).await;
        session.flush_notices();
        result.map_err(|e| anyhow::anyhow!(e.user_message()))?;
        println!("Deleted exam #{exam_id} and its responses.");
        return Ok(());
    }

    let outcome = delete_exam(&session.backend, exam_id, Some(&session.events))
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    session.flush_notices();

    match outcome {
        DeleteOutcome::Deleted => {
            println!("Deleted exam #{exam_id}.");
            Ok(())
        }
        DeleteOutcome::NeedsForce { responses } => {
            anyhow::bail!("{} Re-run with --force to confirm.", force_prompt(responses))
        }
    }
}
