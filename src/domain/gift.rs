use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A funding goal on a wedding's registry. `total_contributed` is mutated
/// exclusively through the atomic increment in the gift repository; it must
/// always equal the sum of recorded contributions for the gift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gift {
    pub id: Uuid,
    pub wedding_id: Uuid,
    pub name: String,
    /// Target in major currency units (SEK). Zero means "no target":
    /// such a gift can never become fully funded.
    pub target_amount: f64,
    pub total_contributed: f64,
    pub is_fully_funded: bool,
    /// Opaque pointer to a photo owned by the object-storage collaborator.
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGift {
    pub wedding_id: Uuid,
    pub name: String,
    pub target_amount: f64,
    pub image_ref: Option<String>,
}

/// Funding state derived from a gift's running total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FundingProgress {
    pub total_contributed: f64,
    pub target_amount: f64,
    /// 0..=100, clamped so an over-funded gift renders a full bar.
    pub percent: f64,
    pub is_fully_funded: bool,
}

impl FundingProgress {
    pub fn compute(total_contributed: f64, target_amount: f64) -> Self {
        // A gift without a positive target is never "fully funded" and has
        // no meaningful percentage (avoids dividing by zero).
        if target_amount <= 0.0 {
            return Self {
                total_contributed,
                target_amount,
                percent: 0.0,
                is_fully_funded: false,
            };
        }

        let percent = (total_contributed / target_amount * 100.0).clamp(0.0, 100.0);
        Self {
            total_contributed,
            target_amount,
            percent,
            is_fully_funded: total_contributed >= target_amount,
        }
    }
}

impl Gift {
    pub fn progress(&self) -> FundingProgress {
        FundingProgress::compute(self.total_contributed, self.target_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_target_is_never_fully_funded() {
        let progress = FundingProgress::compute(5000.0, 0.0);
        assert!(!progress.is_fully_funded);
        assert_eq!(progress.percent, 0.0);
    }

    #[test]
    fn negative_target_is_never_fully_funded() {
        let progress = FundingProgress::compute(100.0, -1.0);
        assert!(!progress.is_fully_funded);
    }

    #[test]
    fn funded_exactly_at_target() {
        let progress = FundingProgress::compute(1000.0, 1000.0);
        assert!(progress.is_fully_funded);
        assert_eq!(progress.percent, 100.0);
    }

    #[test]
    fn partial_funding_percentage() {
        let progress = FundingProgress::compute(400.0, 1000.0);
        assert!(!progress.is_fully_funded);
        assert!((progress.percent - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn over_funding_clamps_to_one_hundred() {
        let progress = FundingProgress::compute(1500.0, 1000.0);
        assert!(progress.is_fully_funded);
        assert_eq!(progress.percent, 100.0);
    }
}
