use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod contribution_repository;
pub mod gift_repository;
pub mod settings_repository;

pub use contribution_repository::SqliteContributionRepository;
pub use gift_repository::SqliteGiftRepository;
pub use settings_repository::SqlitePaymentSettingsRepository;

/// Append-only store for contributions. Recording is a pure insert with no
/// read-check; callers are responsible for not recording the same guest
/// action twice (the webhook path de-duplicates via `find_by_session`).
#[async_trait]
pub trait ContributionRepository: Send + Sync {
    async fn record(&self, new: NewContribution) -> Result<Contribution>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contribution>>;
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Contribution>>;
    async fn list_by_gift(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Vec<Contribution>>;
    async fn sum_for_gift(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<f64>;
}

#[async_trait]
pub trait GiftRepository: Send + Sync {
    async fn create(&self, gift: NewGift) -> Result<Gift>;
    async fn find(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Option<Gift>>;
    async fn list(&self, wedding_id: Uuid) -> Result<Vec<Gift>>;

    /// Atomically adds `amount` to the gift's running total and recomputes
    /// the fully-funded flag in the same write. Never a read-then-write:
    /// concurrent contributions to the same gift must not lose updates.
    async fn apply_contribution(
        &self,
        wedding_id: Uuid,
        gift_id: Uuid,
        amount: f64,
    ) -> Result<Gift>;

    /// Idempotent repair path: resets the running total to the sum of all
    /// recorded contributions for the gift.
    async fn recompute_totals(&self, wedding_id: Uuid, gift_id: Uuid) -> Result<Gift>;
}

/// Read side of the settings collaborator. The upsert exists for the
/// seeder and tests; the settings UI lives outside this service.
#[async_trait]
pub trait PaymentSettingsRepository: Send + Sync {
    async fn find(&self, wedding_id: Uuid) -> Result<Option<PaymentSettings>>;
    async fn upsert(&self, settings: &PaymentSettings) -> Result<()>;
}
