//! Course materials: listing, drag-and-drop reordering, visibility and
//! completion tracking.
//!
//! Reordering has no batch endpoint. The new order is written one material
//! at a time and the list is then reloaded from the server. A failed write
//! is reported but earlier writes are not undone.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::error::ApiError;
use crate::events::{EventBus, PortalEvent, ToastLevel};
use crate::model::{CourseId, Material, MaterialKey, MaterialKind, UserId};
use crate::traits::MaterialApi;

#[derive(Debug, Clone, Error)]
pub enum ReorderError {
    #[error("position {index} is out of range for {len} materials")]
    OutOfRange { index: usize, len: usize },

    #[error("failed to load materials: {0}")]
    Load(#[from] ApiError),
}

/// Result of persisting a new order.
#[derive(Debug, Clone, Default)]
pub struct ReorderReport {
    pub applied: Vec<MaterialKey>,
    pub failed: Vec<(MaterialKey, ApiError)>,
}

impl ReorderReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Alert text for a partial failure.
    pub fn alert_message(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        Some(format!(
            "Erro ao salvar a nova ordem de {} material(is). Recarregue a página e tente novamente.",
            self.failed.len()
        ))
    }
}

/// The reloaded list plus the persistence report.
#[derive(Debug, Clone)]
pub struct ReorderOutcome {
    pub report: ReorderReport,
    pub materials: Vec<Material>,
}

/// Load videos and PDFs of a course as one list sorted by `order`.
pub async fn load_course_materials(
    api: &dyn MaterialApi,
    course_id: CourseId,
) -> Result<Vec<Material>, ApiError> {
    let mut materials = Vec::new();
    for kind in MaterialKind::all() {
        materials.extend(api.list_materials(course_id, kind).await?);
    }
    materials.sort_by_key(|m| (m.order, m.kind, m.id));
    Ok(materials)
}

/// Assign `order` 1..n following the current list position.
pub fn renumber(materials: &mut [Material]) {
    for (material, order) in materials.iter_mut().zip(1..) {
        material.order = order;
    }
}

/// Move the item at `from` to position `to`, then renumber everything.
pub fn move_material(
    materials: &mut Vec<Material>,
    from: usize,
    to: usize,
) -> Result<(), ReorderError> {
    let len = materials.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderError::OutOfRange { index, len });
        }
    }
    let moved = materials.remove(from);
    materials.insert(to, moved);
    renumber(materials);
    Ok(())
}

/// Write every material's current order, one request at a time.
pub async fn persist_order(api: &dyn MaterialApi, materials: &[Material]) -> ReorderReport {
    let mut report = ReorderReport::default();
    for material in materials {
        match api.update_material(material).await {
            Ok(()) => report.applied.push(material.key()),
            Err(e) => {
                tracing::warn!(material = %material.key(), order = material.order, error = %e, "failed to persist material order");
                report.failed.push((material.key(), e));
            }
        }
    }
    report
}

/// Drives one drag-and-drop reorder of a course's materials.
pub struct ReorderSession<'a> {
    api: &'a dyn MaterialApi,
    course_id: CourseId,
    events: Option<EventBus>,
}

impl<'a> ReorderSession<'a> {
    pub fn new(api: &'a dyn MaterialApi, course_id: CourseId) -> Self {
        Self {
            api,
            course_id,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Drop the item at `from` onto position `to` of `materials`, persist
    /// the new order and reload the list from the server.
    pub async fn apply(
        &self,
        mut materials: Vec<Material>,
        from: usize,
        to: usize,
    ) -> Result<ReorderOutcome, ReorderError> {
        move_material(&mut materials, from, to)?;
        let report = persist_order(self.api, &materials).await;

        if let Some(events) = &self.events {
            events.publish(PortalEvent::MaterialsReordered {
                course_id: self.course_id,
                failed: report.failed.len(),
            });
            if let Some(alert) = report.alert_message() {
                events.toast(ToastLevel::Error, alert);
            }
        }

        let materials = load_course_materials(self.api, self.course_id).await?;
        Ok(ReorderOutcome { report, materials })
    }
}

/// Flip a material's visibility and persist it. The local copy only changes
/// when the server accepts.
pub async fn set_hidden(
    api: &dyn MaterialApi,
    material: &mut Material,
    hidden: bool,
) -> Result<(), ApiError> {
    let mut updated = material.clone();
    updated.hidden = hidden;
    api.update_material(&updated).await?;
    material.hidden = hidden;
    Ok(())
}

/// Completion counts for one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

/// A user's finished materials. Backed by the server: [`load`] seeds it and
/// every new completion is written through before it is recorded.
///
/// [`load`]: CompletionTracker::load
#[derive(Debug)]
pub struct CompletionTracker {
    user_id: UserId,
    completed: HashMap<CourseId, BTreeSet<MaterialKey>>,
    events: Option<EventBus>,
}

impl CompletionTracker {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            completed: HashMap::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Replace what is known for `course_id` with the server's record.
    pub async fn load(&mut self, api: &dyn MaterialApi, course_id: CourseId) -> Result<(), ApiError> {
        let keys = api.completed_materials(self.user_id, course_id).await?;
        tracing::debug!(user_id = self.user_id, course_id, completed = keys.len(), "loaded completions");
        self.completed.insert(course_id, keys.into_iter().collect());
        Ok(())
    }

    /// Persist a completion. Returns `false`, without a request, when it was
    /// already recorded; only a new completion is published.
    pub async fn mark_completed(
        &mut self,
        api: &dyn MaterialApi,
        material: &Material,
    ) -> Result<bool, ApiError> {
        if self.is_completed(material) {
            return Ok(false);
        }
        match api.mark_completed(self.user_id, material).await {
            Err(e) if e.is_conflict() => {}
            other => other?,
        }

        self.completed
            .entry(material.course_id)
            .or_default()
            .insert(material.key());
        if let Some(events) = &self.events {
            events.publish(PortalEvent::MaterialCompleted {
                course_id: material.course_id,
                material: material.key(),
            });
        }
        Ok(true)
    }

    pub fn is_completed(&self, material: &Material) -> bool {
        self.completed
            .get(&material.course_id)
            .is_some_and(|set| set.contains(&material.key()))
    }

    /// Progress over the visible materials of a course.
    pub fn progress(&self, course_id: CourseId, materials: &[Material]) -> Progress {
        let visible: Vec<&Material> = materials
            .iter()
            .filter(|m| m.course_id == course_id && !m.hidden)
            .collect();
        let completed = visible.iter().filter(|m| self.is_completed(m)).count();
        Progress {
            completed,
            total: visible.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MaterialId, NewMaterial};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn material(id: u64, kind: MaterialKind, order: u32) -> Material {
        Material {
            id,
            course_id: 1,
            kind,
            title: format!("{kind} {id}"),
            description: String::new(),
            url: format!("https://cdn.example/{id}"),
            order,
            hidden: false,
        }
    }

    fn keys(materials: &[Material]) -> Vec<String> {
        materials.iter().map(|m| m.key().to_string()).collect()
    }

    #[test]
    fn move_down_and_renumber() {
        let mut list = vec![
            material(1, MaterialKind::Video, 1),
            material(2, MaterialKind::Video, 2),
            material(1, MaterialKind::Pdf, 3),
        ];
        move_material(&mut list, 0, 2).unwrap();
        assert_eq!(keys(&list), vec!["video#2", "pdf#1", "video#1"]);
        let orders: Vec<u32> = list.iter().map(|m| m.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn move_up() {
        let mut list = vec![
            material(1, MaterialKind::Video, 5),
            material(2, MaterialKind::Video, 9),
            material(3, MaterialKind::Video, 12),
        ];
        move_material(&mut list, 2, 0).unwrap();
        assert_eq!(keys(&list), vec!["video#3", "video#1", "video#2"]);
        assert_eq!(list[0].order, 1);
        assert_eq!(list[2].order, 3);
    }

    #[test]
    fn move_out_of_range() {
        let mut list = vec![material(1, MaterialKind::Video, 1)];
        assert!(matches!(
            move_material(&mut list, 0, 1),
            Err(ReorderError::OutOfRange { index: 1, len: 1 })
        ));
    }

    /// Keeps completions per user like the server does.
    #[derive(Default)]
    struct CompletionStore {
        saved: Mutex<BTreeSet<(UserId, MaterialKey)>>,
        writes: AtomicU32,
        failing: bool,
    }

    #[async_trait]
    impl MaterialApi for CompletionStore {
        async fn list_materials(&self, _: CourseId, _: MaterialKind) -> Result<Vec<Material>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_material(&self, _: &NewMaterial) -> Result<(), ApiError> {
            Ok(())
        }

        async fn update_material(&self, _: &Material) -> Result<(), ApiError> {
            Ok(())
        }

        async fn delete_material(&self, _: MaterialKind, _: MaterialId) -> Result<(), ApiError> {
            Ok(())
        }

        async fn completed_materials(
            &self,
            user_id: UserId,
            _: CourseId,
        ) -> Result<Vec<MaterialKey>, ApiError> {
            let saved = self.saved.lock().unwrap();
            Ok(saved.iter().filter(|(u, _)| *u == user_id).map(|(_, k)| *k).collect())
        }

        async fn mark_completed(&self, user_id: UserId, material: &Material) -> Result<(), ApiError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(ApiError::Network("reset".into()));
            }
            if !self.saved.lock().unwrap().insert((user_id, material.key())) {
                return Err(ApiError::from_status(409, r#"{"message":"já concluído"}"#));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn progress_ignores_hidden_and_other_courses() {
        let mut hidden = material(3, MaterialKind::Pdf, 3);
        hidden.hidden = true;
        let mut other = material(4, MaterialKind::Video, 1);
        other.course_id = 2;
        let list = vec![
            material(1, MaterialKind::Video, 1),
            material(2, MaterialKind::Video, 2),
            hidden,
            other,
        ];

        let store = CompletionStore::default();
        let mut tracker = CompletionTracker::new(42);
        assert!(tracker.mark_completed(&store, &list[0]).await.unwrap());
        assert!(!tracker.mark_completed(&store, &list[0]).await.unwrap());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let progress = tracker.progress(1, &list);
        assert_eq!(progress, Progress { completed: 1, total: 2 });
        assert_eq!(progress.percent(), 50);
    }

    #[tokio::test]
    async fn completions_survive_a_new_tracker() {
        let store = CompletionStore::default();
        let video = material(1, MaterialKind::Video, 1);
        let pdf = material(2, MaterialKind::Pdf, 2);

        let mut first = CompletionTracker::new(42);
        first.mark_completed(&store, &video).await.unwrap();

        let mut second = CompletionTracker::new(42);
        assert_eq!(second.progress(1, &[video.clone(), pdf.clone()]).completed, 0);
        second.load(&store, 1).await.unwrap();
        assert!(second.is_completed(&video));
        assert!(!second.is_completed(&pdf));
        assert!(!second.mark_completed(&store, &video).await.unwrap());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let mut stranger = CompletionTracker::new(7);
        stranger.load(&store, 1).await.unwrap();
        assert!(!stranger.is_completed(&video));
    }

    #[tokio::test]
    async fn server_conflict_counts_as_completed() {
        let store = CompletionStore::default();
        let video = material(1, MaterialKind::Video, 1);
        CompletionTracker::new(42).mark_completed(&store, &video).await.unwrap();

        // Not loaded, so the tracker asks the server and gets a 409.
        let mut tracker = CompletionTracker::new(42);
        assert!(tracker.mark_completed(&store, &video).await.unwrap());
        assert!(tracker.is_completed(&video));
    }

    #[tokio::test]
    async fn failed_write_is_not_recorded() {
        let store = CompletionStore {
            failing: true,
            ..Default::default()
        };
        let video = material(1, MaterialKind::Video, 1);
        let mut tracker = CompletionTracker::new(42);

        assert!(tracker.mark_completed(&store, &video).await.is_err());
        assert!(!tracker.is_completed(&video));
    }

    #[tokio::test]
    async fn completion_publishes_once() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let store = CompletionStore::default();
        let mut tracker = CompletionTracker::new(42).with_events(bus);
        let video = material(1, MaterialKind::Video, 1);

        tracker.mark_completed(&store, &video).await.unwrap();
        tracker.mark_completed(&store, &video).await.unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            PortalEvent::MaterialCompleted {
                course_id: 1,
                material: video.key()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn report_alert_only_on_failure() {
        let mut report = ReorderReport::default();
        assert!(report.alert_message().is_none());
        report.failed.push((
            material(1, MaterialKind::Video, 1).key(),
            ApiError::Network("reset".into()),
        ));
        assert!(report.alert_message().unwrap().contains('1'));
        assert!(!report.is_complete());
    }
}
