//! Shared test utilities for the marketplace core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    auth::Claims,
    core::{game, trade, xp},
    entities::{
        Game, Profile,
        game::{ListingStatus, ListingType},
        profile,
        trade::TradeStatus,
        transaction::{EscrowStatus, PaymentMethod, TransactionStatus},
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

/// Secret used to sign tokens in tests.
pub const TEST_JWT_SECRET: &str = "test-secret";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Signs a one-hour access token for `user_id` with [`TEST_JWT_SECRET`].
pub fn issue_test_token(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        aud: "authenticated".to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap_or_default()
}

/// Creates a profile whose display name is its id.
///
/// A non-zero `xp` is granted through the ledger, so the balance invariant holds.
pub async fn create_test_profile(
    db: &DatabaseConnection,
    user_id: &str,
    xp: i64,
) -> Result<entities::profile::Model> {
    let profile = crate::core::profile::create_profile(
        db,
        user_id.to_string(),
        user_id.to_string(),
    )
    .await?;
    if xp == 0 {
        return Ok(profile);
    }
    xp::award_xp(db, user_id, xp, "test_seed").await?;
    crate::core::profile::require_profile(db, user_id).await
}

/// Changes a profile's display name behind any cache's back.
pub async fn rename_profile(db: &DatabaseConnection, user_id: &str, name: &str) -> Result<()> {
    Profile::update_many()
        .set(profile::ActiveModel {
            display_name: Set(name.to_string()),
            ..Default::default()
        })
        .filter(profile::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Stores a connected payment account id on a profile.
pub async fn link_payment_account(
    db: &DatabaseConnection,
    user_id: &str,
    account_id: &str,
) -> Result<()> {
    Profile::update_many()
        .set(profile::ActiveModel {
            stripe_account_id: Set(Some(account_id.to_string())),
            ..Default::default()
        })
        .filter(profile::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Creates an available sale listing titled "Catan".
pub async fn create_test_game(
    db: &DatabaseConnection,
    owner_id: &str,
    price_cents: i64,
) -> Result<entities::game::Model> {
    game::create_game(
        db,
        owner_id.to_string(),
        "Catan".to_string(),
        ListingType::Sale,
        price_cents,
    )
    .await
}

/// Creates an exchange-only listing.
pub async fn create_trade_listing(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<entities::game::Model> {
    game::create_game(
        db,
        owner_id.to_string(),
        "Carcassonne".to_string(),
        ListingType::Trade,
        0,
    )
    .await
}

/// Forces a listing's status.
pub async fn mark_listing(
    db: &DatabaseConnection,
    game_id: i64,
    status: ListingStatus,
) -> Result<()> {
    Game::update_many()
        .set(entities::game::ActiveModel {
            status: Set(status),
            ..Default::default()
        })
        .filter(entities::game::Column::Id.eq(game_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Sets up profiles "seller" and "buyer" and a 20.00 sale listing owned by the seller.
/// Returns (db, listing).
pub async fn setup_with_listing() -> Result<(DatabaseConnection, entities::game::Model)> {
    let db = setup_test_db().await?;
    create_test_profile(&db, "seller", 0).await?;
    create_test_profile(&db, "buyer", 0).await?;
    let game = create_test_game(&db, "seller", 2000).await?;
    Ok((db, game))
}

/// Sets up a pending trade between "seller" (user1) and "buyer" (user2).
/// Returns (db, trade).
pub async fn setup_with_trade() -> Result<(DatabaseConnection, entities::trade::Model)> {
    let (db, game) = setup_with_listing().await?;
    let trade = trade::create_trade(&db, game.id, "seller".to_string(), "buyer".to_string())
        .await?;
    Ok((db, trade))
}

async fn insert_trade(
    db: &DatabaseConnection,
    user1_id: &str,
    user2_id: &str,
    completed: bool,
) -> Result<entities::trade::Model> {
    let trade = entities::trade::ActiveModel {
        listing_id: Set(0),
        user1_id: Set(user1_id.to_string()),
        user2_id: Set(user2_id.to_string()),
        status: Set(if completed {
            TradeStatus::Completed
        } else {
            TradeStatus::Pending
        }),
        user1_confirmed: Set(completed),
        user2_confirmed: Set(completed),
        created_at: Set(Utc::now()),
        completed_at: Set(completed.then(Utc::now)),
        ..Default::default()
    };
    trade.insert(db).await.map_err(Into::into)
}

/// Inserts a trade both users already confirmed.
pub async fn create_completed_trade(
    db: &DatabaseConnection,
    user1_id: &str,
    user2_id: &str,
) -> Result<entities::trade::Model> {
    insert_trade(db, user1_id, user2_id, true).await
}

/// Inserts a trade nobody confirmed yet.
pub async fn create_pending_trade(
    db: &DatabaseConnection,
    user1_id: &str,
    user2_id: &str,
) -> Result<entities::trade::Model> {
    insert_trade(db, user1_id, user2_id, false).await
}

/// Inserts a pending remote payment request for `listing` with the given deadline.
pub async fn insert_remote_request(
    db: &DatabaseConnection,
    listing: &entities::game::Model,
    buyer_id: &str,
    expires_at: DateTime<Utc>,
) -> Result<entities::transaction::Model> {
    let request = entities::transaction::ActiveModel {
        post_id: Set(listing.id),
        seller_id: Set(listing.owner_id.clone()),
        buyer_id: Set(buyer_id.to_string()),
        amount_cents: Set(listing.price_cents),
        platform_fee_cents: Set(crate::core::pricing::platform_fee(listing.price_cents)),
        method: Set(PaymentMethod::Remote),
        status: Set(TransactionStatus::Pending),
        escrow_status: Set(EscrowStatus::NoEscrow),
        escrow_release_at: Set(None),
        expires_at: Set(Some(expires_at)),
        stripe_checkout_session_id: Set(None),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    };
    request.insert(db).await.map_err(Into::into)
}
