//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod game;
pub mod profile;
pub mod rating;
pub mod trade;
pub mod transaction;
pub mod xp_award_log;
pub mod xp_transaction;

// Re-export specific types to avoid conflicts
pub use game::{Column as GameColumn, Entity as Game, Model as GameModel};
pub use profile::{Column as ProfileColumn, Entity as Profile, Model as ProfileModel};
pub use rating::{Column as RatingColumn, Entity as Rating, Model as RatingModel};
pub use trade::{Column as TradeColumn, Entity as Trade, Model as TradeModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use xp_award_log::{Column as XpAwardLogColumn, Entity as XpAwardLog, Model as XpAwardLogModel};
pub use xp_transaction::{
    Column as XpTransactionColumn, Entity as XpTransaction, Model as XpTransactionModel,
};
