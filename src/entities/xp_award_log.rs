//! XP award log entity - Idempotency record for one-time XP grants.
//! Unique on `(user_id, award_type, reference_id)`; a failed insert means the
//! award was already granted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Award log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "xp_awards_log")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Profile that received the award
    pub user_id: String,
    /// Kind of award, e.g. `"sale"`
    pub award_type: String,
    /// Entity the award is tied to, e.g. the listing id
    pub reference_id: String,
    /// When the award was granted
    pub created_at: DateTimeUtc,
}

/// `XpAwardLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
