//! Session-scoped enrollment bookkeeping.
//!
//! Opening a course's materials makes sure the user is enrolled and stamps
//! their last access. Both writes are idempotent, so each runs at most once
//! per `(user, course)` for the life of the session.

use std::sync::Arc;

use crate::error::ApiError;
use crate::inflight::InflightCache;
use crate::model::{CourseId, UserId};
use crate::traits::EnrollmentApi;

pub struct EnrollmentSession {
    api: Arc<dyn EnrollmentApi>,
    enrolled: InflightCache<(UserId, CourseId)>,
    accessed: InflightCache<(UserId, CourseId)>,
}

impl std::fmt::Debug for EnrollmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentSession")
            .field("enrolled", &self.enrolled)
            .field("accessed", &self.accessed)
            .finish_non_exhaustive()
    }
}

impl EnrollmentSession {
    pub fn new(api: Arc<dyn EnrollmentApi>) -> Self {
        Self {
            api,
            enrolled: InflightCache::new(),
            accessed: InflightCache::new(),
        }
    }

    /// Enroll the user unless already enrolled. A 409 means the enrollment
    /// exists and counts as success.
    pub async fn ensure_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError> {
        let api = Arc::clone(&self.api);
        self.enrolled
            .run((user_id, course_id), move || async move {
                match api.ensure_enrollment(user_id, course_id).await {
                    Err(e) if e.is_conflict() => Ok(()),
                    other => other,
                }
            })
            .await
    }

    pub async fn update_last_access(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<(), ApiError> {
        let api = Arc::clone(&self.api);
        self.accessed
            .run((user_id, course_id), move || async move {
                api.update_last_access(user_id, course_id).await
            })
            .await
    }

    /// Enrollment then last access, as done when a course page opens.
    /// A failure is logged and returned; the page itself still loads.
    pub async fn open_course(&self, user_id: UserId, course_id: CourseId) -> Result<(), ApiError> {
        let result = async {
            self.ensure_enrollment(user_id, course_id).await?;
            self.update_last_access(user_id, course_id).await
        }
        .await;
        if let Err(e) = &result {
            tracing::warn!(user_id, course_id, error = %e, "enrollment bookkeeping failed");
        }
        result
    }
}
