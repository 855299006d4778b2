//! Profile lookups and the profile cache.
//!
//! Listing owners and buyer names are looked up on nearly every workflow call. The
//! [`ProfileCache`] keeps recently fetched rows for a fixed TTL measured against an
//! injected [`Clock`], so staleness is deterministic under test.

use crate::{
    core::clock::Clock,
    entities::{Profile, profile},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{Set, prelude::*};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Creates a profile with a zero XP balance.
pub async fn create_profile(
    db: &DatabaseConnection,
    user_id: String,
    display_name: String,
) -> Result<profile::Model> {
    if user_id.trim().is_empty() {
        return Err(Error::validation("User id cannot be empty"));
    }
    if display_name.trim().is_empty() {
        return Err(Error::validation("Display name cannot be empty"));
    }

    let profile = profile::ActiveModel {
        id: Set(user_id),
        display_name: Set(display_name.trim().to_string()),
        xp: Set(0),
        stripe_account_id: Set(None),
        created_at: Set(Utc::now()),
    };

    profile.insert(db).await.map_err(Into::into)
}

/// Finds a profile by user id.
pub async fn get_profile<C>(db: &C, user_id: &str) -> Result<Option<profile::Model>>
where
    C: ConnectionTrait,
{
    Profile::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a profile by user id, failing with `NotFound` when absent.
pub async fn require_profile<C>(db: &C, user_id: &str) -> Result<profile::Model>
where
    C: ConnectionTrait,
{
    get_profile(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("Profile", user_id))
}

#[derive(Debug, Clone)]
struct CachedProfile {
    profile: profile::Model,
    fetched_at: DateTime<Utc>,
}

/// Read-through cache of profile rows with a fixed time-to-live.
pub struct ProfileCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CachedProfile>>,
}

impl ProfileCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached profile if still fresh, otherwise fetches and caches it.
    ///
    /// Missing profiles are not cached.
    pub async fn get(
        &self,
        db: &DatabaseConnection,
        user_id: &str,
    ) -> Result<Option<profile::Model>> {
        if let Some(profile) = self.lookup(user_id).await {
            trace!(user_id, "Profile cache hit");
            return Ok(Some(profile));
        }

        debug!(user_id, "Profile cache miss");
        let fetched = get_profile(db, user_id).await?;
        if let Some(profile) = &fetched {
            let mut entries = self.entries.write().await;
            entries.insert(
                user_id.to_string(),
                CachedProfile {
                    profile: profile.clone(),
                    fetched_at: self.clock.now(),
                },
            );
        }
        Ok(fetched)
    }

    /// Drops the entry for `user_id`, forcing the next read to hit the store.
    pub async fn invalidate(&self, user_id: &str) {
        self.entries.write().await.remove(user_id);
    }

    async fn lookup(&self, user_id: &str) -> Option<profile::Model> {
        let entries = self.entries.read().await;
        let cached = entries.get(user_id)?;
        (self.clock.now() - cached.fetched_at < self.ttl).then(|| cached.profile.clone())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_profile_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_profile(&db, String::new(), "Alice".to_string()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let result = create_profile(&db, "u1".to_string(), "   ".to_string()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_get_profile() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_profile(&db, "u1".to_string(), " Alice ".to_string()).await?;
        assert_eq!(created.display_name, "Alice");
        assert_eq!(created.xp, 0);

        let found = get_profile(&db, "u1").await?.unwrap();
        assert_eq!(found.id, "u1");
        assert!(get_profile(&db, "nobody").await?.is_none());

        let missing = require_profile(&db, "nobody").await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_serves_stale_until_ttl() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "seller", 0).await?;

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ProfileCache::new(Duration::minutes(5), clock.clone());

        let first = cache.get(&db, "seller").await?.unwrap();
        assert_eq!(first.display_name, "seller");

        rename_profile(&db, "seller", "Renamed").await?;

        clock.advance(Duration::minutes(4));
        let cached = cache.get(&db, "seller").await?.unwrap();
        assert_eq!(cached.display_name, "seller");

        clock.advance(Duration::minutes(1));
        let refreshed = cache.get(&db, "seller").await?.unwrap();
        assert_eq!(refreshed.display_name, "Renamed");
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_invalidate_forces_refetch() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "buyer", 0).await?;

        let cache = ProfileCache::new(Duration::hours(1), Arc::new(ManualClock::new(Utc::now())));
        cache.get(&db, "buyer").await?;
        rename_profile(&db, "buyer", "Bob").await?;

        cache.invalidate("buyer").await;
        let refreshed = cache.get(&db, "buyer").await?.unwrap();
        assert_eq!(refreshed.display_name, "Bob");
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_does_not_store_missing_profiles() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = ProfileCache::new(Duration::hours(1), Arc::new(ManualClock::new(Utc::now())));

        assert!(cache.get(&db, "late").await?.is_none());
        create_test_profile(&db, "late", 0).await?;
        assert!(cache.get(&db, "late").await?.is_some());
        Ok(())
    }
}
