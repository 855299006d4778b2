//! Listing lookups and creation.

use crate::{
    entities::{
        Game, game,
        game::{ListingStatus, ListingType},
    },
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

/// Lists a game. Sale listings must carry a positive price.
pub async fn create_game(
    db: &DatabaseConnection,
    owner_id: String,
    title: String,
    listing_type: ListingType,
    price_cents: i64,
) -> Result<game::Model> {
    if title.trim().is_empty() {
        return Err(Error::validation("Title cannot be empty"));
    }
    if price_cents < 0 || (listing_type.is_for_sale() && price_cents == 0) {
        return Err(Error::validation(format!("Invalid price: {price_cents}")));
    }

    let game = game::ActiveModel {
        owner_id: Set(owner_id),
        title: Set(title.trim().to_string()),
        listing_type: Set(listing_type),
        price_cents: Set(price_cents),
        status: Set(ListingStatus::Available),
        is_boosted: Set(false),
        boost_expires_at: Set(None),
        boost_type: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    game.insert(db).await.map_err(Into::into)
}

/// Finds a listing by id.
pub async fn get_game<C>(db: &C, game_id: i64) -> Result<Option<game::Model>>
where
    C: ConnectionTrait,
{
    Game::find_by_id(game_id).one(db).await.map_err(Into::into)
}

/// Finds a listing by id, failing with `NotFound` when absent.
pub async fn require_game<C>(db: &C, game_id: i64) -> Result<game::Model>
where
    C: ConnectionTrait,
{
    get_game(db, game_id)
        .await?
        .ok_or_else(|| Error::not_found("Game", game_id))
}
