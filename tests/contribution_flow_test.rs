use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use gavobord::{
    config::FeePolicy,
    domain::{ContributionRail, Gift, NewContribution, NewGift, PaymentSettings, PayoutRail},
    error::AppError,
    payments::{
        fake::GatewayCall, stripe_client::CardConfirmation, CardSessionBuilder,
        FakePaymentGateway, PaymentGateway,
    },
    repository::{
        ContributionRepository, GiftRepository, PaymentSettingsRepository,
        SqliteContributionRepository, SqliteGiftRepository, SqlitePaymentSettingsRepository,
    },
    service::{CardSessionRequest, ContributionService},
};

struct Fixture {
    gift_repo: Arc<SqliteGiftRepository>,
    contribution_repo: Arc<SqliteContributionRepository>,
    settings_repo: Arc<SqlitePaymentSettingsRepository>,
    gateway: Arc<FakePaymentGateway>,
    service: ContributionService,
    wedding_id: Uuid,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let gift_repo = Arc::new(SqliteGiftRepository::new(pool.clone()));
    let contribution_repo = Arc::new(SqliteContributionRepository::new(pool.clone()));
    let settings_repo = Arc::new(SqlitePaymentSettingsRepository::new(pool.clone()));

    let gateway = Arc::new(FakePaymentGateway::new());
    let builder = CardSessionBuilder::new(
        gateway.clone() as Arc<dyn PaymentGateway>,
        FeePolicy {
            version: 1,
            percent: 0.10,
            fixed: 5.0,
        },
        "sek".to_string(),
    );

    let service = ContributionService::new(
        gift_repo.clone(),
        contribution_repo.clone(),
        settings_repo.clone(),
        Some(builder),
    );

    Ok(Fixture {
        gift_repo,
        contribution_repo,
        settings_repo,
        gateway,
        service,
        wedding_id: Uuid::new_v4(),
    })
}

impl Fixture {
    async fn create_gift(&self, name: &str, target: f64) -> anyhow::Result<Gift> {
        Ok(self
            .gift_repo
            .create(NewGift {
                wedding_id: self.wedding_id,
                name: name.to_string(),
                target_amount: target,
                image_ref: None,
            })
            .await?)
    }

    async fn configure_both_rails(&self) -> anyhow::Result<()> {
        self.settings_repo
            .upsert(&PaymentSettings {
                wedding_id: self.wedding_id,
                rails: vec![
                    PayoutRail::Card {
                        account_id: "acct_test_couple".to_string(),
                    },
                    PayoutRail::Swish {
                        handle: "0701234567".to_string(),
                    },
                ],
                updated_at: chrono::Utc::now(),
            })
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn swish_then_card_fund_the_gift_end_to_end() -> anyhow::Result<()> {
    let fx = fixture().await?;
    fx.configure_both_rails().await?;
    let gift = fx.create_gift("Honeymoon", 1000.0).await?;

    // Swish rail: 400 SEK from Anna.
    let code = fx
        .service
        .build_swish_code(
            fx.wedding_id,
            gift.id,
            400.0,
            Some("Anna"),
            Some("Congrats!"),
        )
        .await?;
    assert!(code.starts_with("C46"));
    assert!(code.starts_with("C46701234567;400;"));
    assert!(code.contains(";400;"));

    let mut attested =
        NewContribution::new(fx.wedding_id, gift.id, 400.0, ContributionRail::Swish);
    attested.donor_name = Some("Anna".to_string());
    attested.message = Some("Congrats!".to_string());
    let outcome = fx.service.record_contribution(attested).await?;
    assert!(outcome.gift_updated);
    let progress = outcome.progress.unwrap();
    assert_eq!(progress.total_contributed, 400.0);
    assert!(!progress.is_fully_funded);

    // Card rail: 600 SEK, fee = round((600 * 0.10 + 5) * 100) = 6500 öre.
    let session = fx
        .service
        .create_card_session(
            fx.wedding_id,
            gift.id,
            CardSessionRequest {
                amount: 600.0,
                return_url: "https://example.com/return".to_string(),
                donor_name: Some("Björn".to_string()),
                message: None,
                donor_contact: None,
            },
        )
        .await?;
    assert!(!session.client_secret.is_empty());

    let calls = fx.gateway.calls();
    assert_eq!(calls.len(), 3, "product, price, session, in that order");
    match &calls[1] {
        GatewayCall::Price {
            unit_amount_minor,
            currency,
            ..
        } => {
            assert_eq!(*unit_amount_minor, 60000);
            assert_eq!(currency, "sek");
        }
        other => panic!("expected price call, got {:?}", other),
    }
    match &calls[2] {
        GatewayCall::Session {
            destination_account,
            application_fee_minor,
            ..
        } => {
            assert_eq!(destination_account, "acct_test_couple");
            assert_eq!(*application_fee_minor, 6500);
        }
        other => panic!("expected session call, got {:?}", other),
    }

    // The session alone records nothing; the webhook confirmation does.
    assert_eq!(
        fx.contribution_repo
            .list_by_gift(fx.wedding_id, gift.id)
            .await?
            .len(),
        1
    );

    let outcome = fx
        .service
        .confirm_card_payment(CardConfirmation {
            session_id: session.session_id.clone(),
            wedding_id: fx.wedding_id,
            gift_id: gift.id,
            amount: 600.0,
            donor_name: Some("Björn".to_string()),
            message: None,
            donor_contact: None,
        })
        .await?;
    assert!(outcome.gift_updated);
    let progress = outcome.progress.unwrap();
    assert_eq!(progress.total_contributed, 1000.0);
    assert!(progress.is_fully_funded);

    let updated = fx.gift_repo.find(fx.wedding_id, gift.id).await?.unwrap();
    assert!(updated.is_fully_funded);

    Ok(())
}

#[tokio::test]
async fn card_session_requires_a_payout_account() -> anyhow::Result<()> {
    let fx = fixture().await?;
    // No payment settings for this wedding at all.
    let gift = fx.create_gift("Stand mixer", 6500.0).await?;

    let err = fx
        .service
        .create_card_session(
            fx.wedding_id,
            gift.id,
            CardSessionRequest {
                amount: 500.0,
                return_url: "https://example.com/return".to_string(),
                donor_name: None,
                message: None,
                donor_contact: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PayoutNotConfigured(_)));
    // Nothing was created on the processor side.
    assert_eq!(fx.gateway.call_count(), 0);

    Ok(())
}

#[tokio::test]
async fn webhook_redelivery_records_only_one_contribution() -> anyhow::Result<()> {
    let fx = fixture().await?;
    fx.configure_both_rails().await?;
    let gift = fx.create_gift("China set", 1000.0).await?;

    let confirmation = CardConfirmation {
        session_id: "cs_test_replayed".to_string(),
        wedding_id: fx.wedding_id,
        gift_id: gift.id,
        amount: 300.0,
        donor_name: Some("Cecilia".to_string()),
        message: None,
        donor_contact: None,
    };

    let first = fx.service.confirm_card_payment(confirmation.clone()).await?;
    let second = fx.service.confirm_card_payment(confirmation).await?;
    assert_eq!(first.contribution.id, second.contribution.id);

    let recorded = fx
        .contribution_repo
        .list_by_gift(fx.wedding_id, gift.id)
        .await?;
    assert_eq!(recorded.len(), 1);

    let updated = fx.gift_repo.find(fx.wedding_id, gift.id).await?.unwrap();
    assert_eq!(updated.total_contributed, 300.0);

    Ok(())
}

#[tokio::test]
async fn swish_code_requires_a_swish_handle() -> anyhow::Result<()> {
    let fx = fixture().await?;
    // Card-only couple: no Swish handle configured.
    fx.settings_repo
        .upsert(&PaymentSettings {
            wedding_id: fx.wedding_id,
            rails: vec![PayoutRail::Card {
                account_id: "acct_test_couple".to_string(),
            }],
            updated_at: chrono::Utc::now(),
        })
        .await?;
    let gift = fx.create_gift("Vase", 500.0).await?;

    let err = fx
        .service
        .build_swish_code(fx.wedding_id, gift.id, 100.0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayoutNotConfigured(_)));

    Ok(())
}

#[tokio::test]
async fn provider_failure_surfaces_without_recording_anything() -> anyhow::Result<()> {
    let fx = fixture().await?;
    fx.configure_both_rails().await?;
    let gift = fx.create_gift("Espresso machine", 700.0).await?;

    fx.gateway.fail_next("card_declined backend outage");

    let err = fx
        .service
        .create_card_session(
            fx.wedding_id,
            gift.id,
            CardSessionRequest {
                amount: 200.0,
                return_url: "https://example.com/return".to_string(),
                donor_name: None,
                message: None,
                donor_contact: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentProvider(_)));

    assert!(fx
        .contribution_repo
        .list_by_gift(fx.wedding_id, gift.id)
        .await?
        .is_empty());

    Ok(())
}
