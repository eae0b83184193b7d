pub mod contribution_service;

pub use contribution_service::{CardSessionRequest, ContributionOutcome, ContributionService};

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::payments::CardSessionBuilder;
use crate::repository::*;

pub struct ServiceContext {
    pub gift_repo: Arc<dyn GiftRepository>,
    pub contribution_repo: Arc<dyn ContributionRepository>,
    pub settings_repo: Arc<dyn PaymentSettingsRepository>,
    pub contribution_service: Arc<ContributionService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        gift_repo: Arc<dyn GiftRepository>,
        contribution_repo: Arc<dyn ContributionRepository>,
        settings_repo: Arc<dyn PaymentSettingsRepository>,
        card_builder: Option<CardSessionBuilder>,
        db_pool: SqlitePool,
    ) -> Self {
        let contribution_service = Arc::new(ContributionService::new(
            gift_repo.clone(),
            contribution_repo.clone(),
            settings_repo.clone(),
            card_builder,
        ));

        Self {
            gift_repo,
            contribution_repo,
            settings_repo,
            contribution_service,
            db_pool,
        }
    }
}
