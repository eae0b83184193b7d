use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::{Contribution, ContributionRail, FundingProgress, NewContribution},
    error::{AppError, Result},
    payments::swish,
    service::{CardSessionRequest, ContributionOutcome},
};

fn validated<T: Validate>(dto: &T) -> Result<()> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutDto {
    #[validate(range(min = 0.01, message = "amount must be positive"))]
    amount: f64,
    #[validate(length(min = 1, max = 500, message = "returnUrl is required"))]
    return_url: String,
    #[validate(length(max = 120))]
    donor_name: Option<String>,
    #[validate(length(max = 280))]
    message: Option<String>,
    #[validate(length(max = 60))]
    donor_contact: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    session_id: String,
    client_secret: String,
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
    Json(dto): Json<CreateCheckoutDto>,
) -> Result<Json<CheckoutResponse>> {
    validated(&dto)?;

    let session = state
        .service_context
        .contribution_service
        .create_card_session(
            wedding_id,
            gift_id,
            CardSessionRequest {
                amount: dto.amount,
                return_url: dto.return_url,
                donor_name: dto.donor_name,
                message: dto.message,
                donor_contact: dto.donor_contact,
            },
        )
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.session_id,
        client_secret: session.client_secret,
    }))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SwishCodeDto {
    #[validate(range(min = 0.01, message = "amount must be positive"))]
    amount: f64,
    #[validate(length(max = 120))]
    donor_name: Option<String>,
    #[validate(length(max = 280))]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SwishCodeResponse {
    code: String,
}

pub async fn swish_code(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
    Json(dto): Json<SwishCodeDto>,
) -> Result<Json<SwishCodeResponse>> {
    validated(&dto)?;

    let code = state
        .service_context
        .contribution_service
        .build_swish_code(
            wedding_id,
            gift_id,
            dto.amount,
            dto.donor_name.as_deref(),
            dto.message.as_deref(),
        )
        .await?;

    Ok(Json(SwishCodeResponse { code }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwishQrParams {
    amount: f64,
    donor_name: Option<String>,
    message: Option<String>,
}

/// The code is deterministic, so the QR can be re-rendered on every page
/// load without side effects.
pub async fn swish_qr(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<SwishQrParams>,
) -> Result<Response> {
    let code = state
        .service_context
        .contribution_service
        .build_swish_code(
            wedding_id,
            gift_id,
            params.amount,
            params.donor_name.as_deref(),
            params.message.as_deref(),
        )
        .await?;

    let svg = swish::qr_svg(&code)?;

    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttestContributionDto {
    #[validate(range(min = 0.01, message = "amount must be positive"))]
    amount: f64,
    #[validate(length(max = 120))]
    donor_name: Option<String>,
    #[validate(length(max = 280))]
    message: Option<String>,
    #[validate(length(max = 60))]
    donor_contact: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionOutcomeDto {
    contribution_id: Uuid,
    created_at: String,
    /// False means the contribution was saved but the gift's funding bar is
    /// stale until reconciled. Still a success from the guest's view.
    gift_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<ProgressDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    total_contributed: f64,
    target_amount: f64,
    percent: f64,
    is_fully_funded: bool,
}

impl From<FundingProgress> for ProgressDto {
    fn from(p: FundingProgress) -> Self {
        Self {
            total_contributed: p.total_contributed,
            target_amount: p.target_amount,
            percent: p.percent,
            is_fully_funded: p.is_fully_funded,
        }
    }
}

impl From<ContributionOutcome> for ContributionOutcomeDto {
    fn from(outcome: ContributionOutcome) -> Self {
        Self {
            contribution_id: outcome.contribution.id,
            created_at: outcome.contribution.created_at.to_rfc3339(),
            gift_updated: outcome.gift_updated,
            progress: outcome.progress.map(Into::into),
        }
    }
}

/// Swish attestation: the guest self-reports that the transfer was made in
/// their banking app. There is no proof of payment; this trust gap is a
/// deliberate product decision, inherited and documented, not a bug.
pub async fn attest(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
    Json(dto): Json<AttestContributionDto>,
) -> Result<(StatusCode, Json<ContributionOutcomeDto>)> {
    validated(&dto)?;

    let mut new = NewContribution::new(wedding_id, gift_id, dto.amount, ContributionRail::Swish);
    new.donor_name = dto.donor_name;
    new.message = dto.message;
    new.donor_contact = dto.donor_contact;

    let outcome = state
        .service_context
        .contribution_service
        .record_contribution(new)
        .await?;

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDto {
    id: Uuid,
    amount: f64,
    rail: ContributionRail,
    donor_name: Option<String>,
    message: Option<String>,
    created_at: String,
}

impl From<Contribution> for ContributionDto {
    fn from(c: Contribution) -> Self {
        Self {
            id: c.id,
            amount: c.amount,
            rail: c.rail,
            donor_name: c.donor_name,
            message: c.message,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContributionListResponse {
    contributions: Vec<ContributionDto>,
    total: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Path((wedding_id, gift_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ContributionListResponse>> {
    let contributions = state
        .service_context
        .contribution_repo
        .list_by_gift(wedding_id, gift_id)
        .await?;

    let total = contributions.len();
    let contributions: Vec<ContributionDto> = contributions.into_iter().map(Into::into).collect();

    Ok(Json(ContributionListResponse {
        contributions,
        total,
    }))
}
