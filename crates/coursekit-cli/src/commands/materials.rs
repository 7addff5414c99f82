//! The `coursekit materials` subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use coursekit_core::enrollment::EnrollmentSession;
use coursekit_core::materials::{load_course_materials, set_hidden, CompletionTracker, ReorderSession};
use coursekit_core::model::{CourseId, Material, MaterialId, MaterialKey, MaterialKind, NewMaterial, UserId};
use coursekit_core::traits::MaterialApi;

use super::Session;

fn print_materials(materials: &[Material]) {
    if materials.is_empty() {
        println!("No materials.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Pos", "Item", "Title", "Order", "Hidden"]);
    for (position, material) in materials.iter().enumerate() {
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(material.key()),
            Cell::new(&material.title),
            Cell::new(material.order),
            Cell::new(if material.hidden { "yes" } else { "" }),
        ]);
    }
    println!("{table}");
}

async fn load(session: &Session, course_id: CourseId) -> Result<Vec<Material>> {
    load_course_materials(&session.backend, course_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("failed to load materials for course {course_id}"))
}

pub async fn list(config_path: Option<PathBuf>, course_id: CourseId) -> Result<()> {
    let session = Session::open(config_path)?;
    let materials = load(&session, course_id).await?;
    print_materials(&materials);
    Ok(())
}

pub async fn move_item(
    config_path: Option<PathBuf>,
    course_id: CourseId,
    from: usize,
    to: usize,
) -> Result<()> {
    if from == 0 || to == 0 {
        anyhow::bail!("positions start at 1");
    }

    let mut session = Session::open(config_path)?;
    let materials = load(&session, course_id).await?;

    let outcome = ReorderSession::new(&session.backend, course_id)
        .with_events(session.events.clone())
        .apply(materials, from - 1, to - 1)
        .await?;
    session.flush_notices();

    let report = &outcome.report;
    println!("Saved order for {} material(s).", report.applied.len());
    for (key, error) in &report.failed {
        println!("  failed: {key}: {error}");
    }
    print_materials(&outcome.materials);

    if let Some(alert) = report.alert_message() {
        anyhow::bail!(alert);
    }
    Ok(())
}

pub async fn hide(
    config_path: Option<PathBuf>,
    course_id: CourseId,
    key: MaterialKey,
    hidden: bool,
) -> Result<()> {
    let session = Session::open(config_path)?;
    let mut materials = load(&session, course_id).await?;
    let material = materials
        .iter_mut()
        .find(|m| m.key() == key)
        .with_context(|| format!("material {key} not found in course {course_id}"))?;

    set_hidden(&session.backend, material, hidden)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let state = if hidden { "hidden" } else { "visible" };
    println!("{key} is now {state}.");
    Ok(())
}

pub async fn add(config_path: Option<PathBuf>, material: NewMaterial) -> Result<()> {
    let session = Session::open(config_path)?;
    session
        .backend
        .create_material(&material)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    println!(
        "Added {} '{}' to course {}.",
        material.kind, material.title, material.course_id
    );
    Ok(())
}

pub async fn delete(config_path: Option<PathBuf>, kind: MaterialKind, id: MaterialId) -> Result<()> {
    let session = Session::open(config_path)?;
    session
        .backend
        .delete_material(kind, id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    println!("Deleted {}.", MaterialKey { kind, id });
    Ok(())
}

pub async fn complete(
    config_path: Option<PathBuf>,
    course_id: CourseId,
    items: Vec<MaterialKey>,
    user: Option<UserId>,
) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let user_id = session.user_id(user)?;

    let enrollment = EnrollmentSession::new(Arc::new(session.backend.clone()));
    if let Err(e) = enrollment.open_course(user_id, course_id).await {
        eprintln!("Warning: could not update enrollment: {}", e.user_message());
    }

    let materials = load(&session, course_id).await?;
    let mut tracker = CompletionTracker::new(user_id).with_events(session.events.clone());
    tracker
        .load(&session.backend, course_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    for key in &items {
        let material = materials
            .iter()
            .find(|m| m.key() == *key)
            .with_context(|| format!("material {key} not found in course {course_id}"))?;
        let newly = tracker
            .mark_completed(&session.backend, material)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))?;
        if !newly {
            println!("{key} already marked.");
        }
    }
    session.flush_notices();

    let progress = tracker.progress(course_id, &materials);
    println!(
        "Progresso: {}/{} ({}%)",
        progress.completed,
        progress.total,
        progress.percent()
    );
    Ok(())
}
