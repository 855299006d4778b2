//! Database configuration module.
//!
//! This module handles database connections and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`; the composite unique indexes that back the
//! idempotency guarantees (one rating per rater and trade, one award per reference)
//! are created explicitly since entity attributes cannot express them.

use crate::entities::{
    Game, Profile, Rating, Trade, Transaction, XpAwardLog, XpTransaction, rating, xp_award_log,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/meeple_exchange.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!(url = %database_url, "Connecting to database");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and unique indexes if they do not exist yet.
///
/// Parents are created before children so foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let tables = [
        schema.create_table_from_entity(Profile).if_not_exists().to_owned(),
        schema.create_table_from_entity(Game).if_not_exists().to_owned(),
        schema.create_table_from_entity(Trade).if_not_exists().to_owned(),
        schema.create_table_from_entity(Rating).if_not_exists().to_owned(),
        schema.create_table_from_entity(Transaction).if_not_exists().to_owned(),
        schema.create_table_from_entity(XpTransaction).if_not_exists().to_owned(),
        schema.create_table_from_entity(XpAwardLog).if_not_exists().to_owned(),
    ];
    for table in &tables {
        db.execute(builder.build(table)).await?;
    }

    let one_rating_per_rater = Index::create()
        .name("idx_ratings_trade_rater")
        .table(Rating)
        .col(rating::Column::TradeId)
        .col(rating::Column::RaterId)
        .unique()
        .if_not_exists()
        .to_owned();
    let one_award_per_reference = Index::create()
        .name("idx_xp_awards_log_unique")
        .table(XpAwardLog)
        .col(xp_award_log::Column::UserId)
        .col(xp_award_log::Column::AwardType)
        .col(xp_award_log::Column::ReferenceId)
        .unique()
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&one_rating_per_rater)).await?;
    db.execute(builder.build(&one_award_per_reference)).await?;

    Ok(())
}
