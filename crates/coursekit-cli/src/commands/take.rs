//! The `coursekit take` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use coursekit_core::model::{display_score, AlternativeId, ExamId, QuestionId, UserId};
use coursekit_core::submission::SubmitError;
use coursekit_core::taker::ExamTaker;
use coursekit_core::traits::TakingApi;

use super::Session;

/// Parse `12=40` into `(question 12, alternative 40)`.
fn parse_answer(raw: &str) -> Result<(QuestionId, AlternativeId)> {
    let (question, alternative) = raw
        .split_once('=')
        .with_context(|| format!("invalid answer '{raw}', expected <questionId>=<alternativeId>"))?;
    let question = question
        .trim()
        .parse()
        .with_context(|| format!("invalid question id in '{raw}'"))?;
    let alternative = alternative
        .trim()
        .parse()
        .with_context(|| format!("invalid alternative id in '{raw}'"))?;
    Ok((question, alternative))
}

pub async fn execute(
    config_path: Option<PathBuf>,
    exam_id: ExamId,
    answers: Vec<String>,
    user: Option<UserId>,
) -> Result<()> {
    let answers = answers
        .iter()
        .map(|raw| parse_answer(raw))
        .collect::<Result<Vec<_>>>()?;

    let mut session = Session::open(config_path)?;
    let exam = session
        .backend
        .exam_for_taking(exam_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if answers.is_empty() {
        println!("Exam #{} ({} questions)\n", exam.id, exam.questions.len());
        for (position, question) in exam.questions.iter().enumerate() {
            println!("{}. {} [id {}]", position + 1, question.text, question.id);
            for alternative in &question.alternatives {
                println!("   - {} [id {}]", alternative.text, alternative.id);
            }
        }
        println!("\nAnswer with: coursekit take --exam {exam_id} --answer <questionId>=<alternativeId> ...");
        return Ok(());
    }

    let user_id = session.user_id(user)?;
    let mut taker = ExamTaker::new(exam).with_events(session.events.clone());
    for (question, alternative) in answers {
        taker.answer(question, alternative)?;
    }

    let result = taker.submit(&session.backend, user_id).await;
    session.flush_notices();

    let result = match result {
        Ok(result) => result,
        Err(e @ SubmitError::Incomplete { .. }) => {
            let missing = taker
                .unanswered_positions()
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            anyhow::bail!("{} Sem resposta: questão(ões) {missing}.", e.user_message());
        }
        Err(e) => {
            tracing::debug!(error = %e, "submit failed");
            anyhow::bail!(e.user_message());
        }
    };

    println!("Acertos: {}", display_score(result.score_counts()));
    if let Some(score) = result.score {
        println!("Nota: {score:.1}");
    }
    match result.passed {
        Some(true) => println!("Aprovado!"),
        Some(false) => println!("Reprovado."),
        None => {}
    }
    if let Some(message) = &result.message {
        println!("{message}");
    }

    Ok(())
}
