use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::Gift,
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftDto {
    id: Uuid,
    wedding_id: Uuid,
    name: String,
    target_amount: f64,
    total_contributed: f64,
    percent_funded: f64,
    is_fully_funded: bool,
    image_ref: Option<String>,
}

impl From<Gift> for GiftDto {
    fn from(gift: Gift) -> Self {
        let progress = gift.progress();
        Self {
            id: gift.id,
            wedding_id: gift.wedding_id,
            name: gift.name,
            target_amount: gift.target_amount,
            total_contributed: gift.total_contributed,
            percent_funded: progress.percent,
            is_fully_funded: gift.is_fully_funded,
            image_ref: gift.image_ref,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    gifts: Vec<GiftDto>,
    total: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Path(wedding_id): Path<Uuid>,
) -> Result<Json<ListResponse>> {
    let gifts = state.service_context.gift_repo.list(wedding_id).await?;

    let total = gifts.len();
    let gifts: Vec<GiftDto> = gifts.into_iter().map(Into::into).collect();

    Ok(Json(ListResponse { gifts, total }))
}

pub async fn get(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<GiftDto>> {
    let gift = state
        .service_context
        .gift_repo
        .find(wedding_id, gift_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Gift not found".to_string()))?;

    Ok(Json(gift.into()))
}

/// Maintenance endpoint: recomputes the gift's running total from its
/// contribution records. Safe to call repeatedly.
pub async fn reconcile(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<GiftDto>> {
    let gift = state
        .service_context
        .contribution_service
        .reconcile_gift(wedding_id, gift_id)
        .await?;

    Ok(Json(gift.into()))
}
