//! Video and PDF material endpoints.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use coursekit_core::model::{
    CourseId, Material, MaterialId, MaterialKey, MaterialKind, NewMaterial, UserId,
};
use coursekit_core::traits::MaterialApi;
use coursekit_core::wire::{CompletionPayload, CompletionRecord, MaterialPayload, MaterialRecord};
use coursekit_core::ApiError;

use crate::http::HttpBackend;

#[async_trait]
impl MaterialApi for HttpBackend {
    #[instrument(skip(self), fields(kind = %kind))]
    async fn list_materials(
        &self,
        course_id: CourseId,
        kind: MaterialKind,
    ) -> Result<Vec<Material>, ApiError> {
        let records: Option<Vec<MaterialRecord>> = self
            .get_optional(&format!("{}/curso/{course_id}", kind.collection()))
            .await?;
        Ok(records
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.into_material(kind))
            .collect())
    }

    #[instrument(skip(self, material), fields(kind = %material.kind, course_id = material.course_id))]
    async fn create_material(&self, material: &NewMaterial) -> Result<(), ApiError> {
        let body = MaterialPayload::from(material);
        self.send_json(Method::POST, material.kind.collection(), &body)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, material), fields(key = %material.key(), order = material.order))]
    async fn update_material(&self, material: &Material) -> Result<(), ApiError> {
        let body = MaterialPayload::from(material);
        let path = format!("{}/update-dados/{}", material.kind.collection(), material.id);
        self.send_json(Method::PUT, &path, &body).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn delete_material(&self, kind: MaterialKind, id: MaterialId) -> Result<(), ApiError> {
        let path = format!("{}/{id}", kind.collection());
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn completed_materials(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<MaterialKey>, ApiError> {
        let records: Option<Vec<CompletionRecord>> = self
            .get_optional(&format!("progresso/usuario/{user_id}/curso/{course_id}"))
            .await?;
        Ok(records
            .unwrap_or_default()
            .iter()
            .filter_map(CompletionRecord::key)
            .collect())
    }

    #[instrument(skip(self, material), fields(key = %material.key()))]
    async fn mark_completed(&self, user_id: UserId, material: &Material) -> Result<(), ApiError> {
        let body = CompletionPayload::new(user_id, material);
        self.send_json(Method::POST, "progresso", &body).await?;
        Ok(())
    }
}
