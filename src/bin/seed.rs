use std::sync::Arc;

use clap::Parser;
use fake::{faker::name::en::Name, Fake};
use rand::Rng;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use gavobord::{
    domain::{ContributionRail, NewContribution, NewGift, PaymentSettings, PayoutRail},
    repository::{
        ContributionRepository, GiftRepository, PaymentSettingsRepository,
        SqliteContributionRepository, SqliteGiftRepository, SqlitePaymentSettingsRepository,
    },
    service::ContributionService,
};

#[derive(Parser)]
#[command(about = "Seeds a demo wedding with gifts and contributions")]
struct Args {
    /// SQLite database URL; falls back to DATABASE_URL, then a local file.
    #[arg(long)]
    database_url: Option<String>,

    /// Number of random contributions to spread across the gifts.
    #[arg(long, default_value_t = 12)]
    contributions: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:gavobord.db".to_string());

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let gift_repo = Arc::new(SqliteGiftRepository::new(db_pool.clone()));
    let contribution_repo = Arc::new(SqliteContributionRepository::new(db_pool.clone()));
    let settings_repo = Arc::new(SqlitePaymentSettingsRepository::new(db_pool.clone()));

    let service = ContributionService::new(
        gift_repo.clone(),
        contribution_repo.clone(),
        settings_repo.clone(),
        None,
    );

    let wedding_id = Uuid::new_v4();
    println!("💒 Created wedding {}", wedding_id);

    settings_repo
        .upsert(&PaymentSettings {
            wedding_id,
            rails: vec![
                PayoutRail::Card {
                    account_id: "acct_demo_wedding".to_string(),
                },
                PayoutRail::Swish {
                    handle: "0701234567".to_string(),
                },
            ],
            updated_at: chrono::Utc::now(),
        })
        .await?;
    println!("  ✅ Payout settings (card + Swish)");

    println!("🎁 Creating gifts...");
    let mut gifts = Vec::new();
    for (name, target) in [
        ("Honeymoon in Kyoto", 25000.0),
        ("KitchenAid stand mixer", 6500.0),
        ("China set for twelve", 4800.0),
        ("Contribution to our first home", 0.0),
    ] {
        let gift = gift_repo
            .create(NewGift {
                wedding_id,
                name: name.to_string(),
                target_amount: target,
                image_ref: None,
            })
            .await?;
        println!("  ✅ {} (target {} SEK)", gift.name, gift.target_amount);
        gifts.push(gift);
    }

    println!("💝 Recording {} contributions...", args.contributions);
    let mut rng = rand::thread_rng();
    for _ in 0..args.contributions {
        let gift = &gifts[rng.gen_range(0..gifts.len())];
        let amount = f64::from(rng.gen_range(1..40)) * 50.0;
        let donor: String = Name().fake();

        let mut new = NewContribution::new(wedding_id, gift.id, amount, ContributionRail::Swish);
        new.donor_name = Some(donor.clone());
        new.message = Some("Congratulations!".to_string());

        let outcome = service.record_contribution(new).await?;
        println!(
            "  ✅ {} gave {} SEK toward {} ({}% funded)",
            donor,
            amount,
            gift.name,
            outcome
                .progress
                .map(|p| p.percent.round() as i64)
                .unwrap_or(0)
        );
    }

    println!("🎉 Seeding complete for wedding {}", wedding_id);
    Ok(())
}
