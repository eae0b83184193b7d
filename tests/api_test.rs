use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use gavobord::{
    api,
    config::Settings,
    domain::NewGift,
    repository::{
        GiftRepository, SqliteContributionRepository, SqliteGiftRepository,
        SqlitePaymentSettingsRepository,
    },
    service::ServiceContext,
};

async fn test_app() -> anyhow::Result<(Router, Arc<SqliteGiftRepository>, Uuid)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let gift_repo = Arc::new(SqliteGiftRepository::new(pool.clone()));
    let service_context = Arc::new(ServiceContext::new(
        gift_repo.clone(),
        Arc::new(SqliteContributionRepository::new(pool.clone())),
        Arc::new(SqlitePaymentSettingsRepository::new(pool.clone())),
        None,
        pool,
    ));

    let app = api::create_app(service_context, Arc::new(Settings::default()));
    Ok((app, gift_repo, Uuid::new_v4()))
}

async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_endpoint_responds() -> anyhow::Result<()> {
    let (app, _, _) = test_app().await?;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn attesting_a_contribution_returns_created_with_progress() -> anyhow::Result<()> {
    let (app, gift_repo, wedding_id) = test_app().await?;

    let gift = gift_repo
        .create(NewGift {
            wedding_id,
            name: "Honeymoon".to_string(),
            target_amount: 1000.0,
            image_ref: None,
        })
        .await?;

    let request = Request::builder()
        .method("POST")
        .uri(format!(
            "/api/weddings/{}/gifts/{}/contributions",
            wedding_id, gift.id
        ))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "amount": 400.0,
                "donorName": "Anna",
                "message": "Congrats!"
            })
            .to_string(),
        ))?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await?;
    assert!(body["contributionId"].is_string());
    assert_eq!(body["giftUpdated"], json!(true));
    assert_eq!(body["progress"]["totalContributed"], json!(400.0));
    assert_eq!(body["progress"]["isFullyFunded"], json!(false));

    Ok(())
}

#[tokio::test]
async fn non_positive_amount_is_rejected_with_invalid_input() -> anyhow::Result<()> {
    let (app, gift_repo, wedding_id) = test_app().await?;

    let gift = gift_repo
        .create(NewGift {
            wedding_id,
            name: "Vase".to_string(),
            target_amount: 500.0,
            image_ref: None,
        })
        .await?;

    let request = Request::builder()
        .method("POST")
        .uri(format!(
            "/api/weddings/{}/gifts/{}/contributions",
            wedding_id, gift.id
        ))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "amount": 0.0 }).to_string()))?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await?;
    assert_eq!(body["kind"], json!("invalid_input"));

    Ok(())
}

#[tokio::test]
async fn checkout_without_card_rail_reports_provider_error() -> anyhow::Result<()> {
    let (app, gift_repo, wedding_id) = test_app().await?;

    let gift = gift_repo
        .create(NewGift {
            wedding_id,
            name: "Stand mixer".to_string(),
            target_amount: 6500.0,
            image_ref: None,
        })
        .await?;

    let request = Request::builder()
        .method("POST")
        .uri(format!(
            "/api/weddings/{}/gifts/{}/checkout",
            wedding_id, gift.id
        ))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "amount": 500.0,
                "returnUrl": "https://example.com/return"
            })
            .to_string(),
        ))?;

    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    Ok(())
}

#[tokio::test]
async fn listing_gifts_includes_funding_progress() -> anyhow::Result<()> {
    let (app, gift_repo, wedding_id) = test_app().await?;

    gift_repo
        .create(NewGift {
            wedding_id,
            name: "China set".to_string(),
            target_amount: 4800.0,
            image_ref: None,
        })
        .await?;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/weddings/{}/gifts", wedding_id))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["gifts"][0]["percentFunded"], json!(0.0));
    assert_eq!(body["gifts"][0]["isFullyFunded"], json!(false));

    Ok(())
}
