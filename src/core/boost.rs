//! Listing boost purchases.
//!
//! XP boosts take effect immediately through [`spend_xp_boost`]. Paid boosts only open
//! a checkout session; the boost is applied by payment fulfillment once the gateway
//! confirms the charge, using the metadata attached here.

use crate::{
    config::settings::PaymentSettings,
    core::{
        game::require_game,
        pricing::{PaidBoost, XpBoost},
        xp::{BoostApplied, spend_xp_boost},
    },
    errors::{Error, Result},
    gateway::{CheckoutRequest, CheckoutSession, PaymentGateway},
};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use tracing::info;

/// The two ways to pay for a boost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostPurchase {
    /// Paid from the XP balance
    Xp(XpBoost),
    /// Paid by card through checkout
    Paid(PaidBoost),
}

impl BoostPurchase {
    /// Parses a boost key. XP keys are upper case (`48H`, `7D`), paid keys lower case.
    pub fn parse(key: &str) -> Result<Self> {
        match key {
            "48H" => Ok(Self::Xp(XpBoost::Hours48)),
            "7D" => Ok(Self::Xp(XpBoost::Days7)),
            "24h" => Ok(Self::Paid(PaidBoost::Hours24)),
            "72h" => Ok(Self::Paid(PaidBoost::Hours72)),
            "7d" => Ok(Self::Paid(PaidBoost::Days7)),
            other => Err(Error::validation(format!("Unknown boost type: {other}"))),
        }
    }
}

/// What a boost purchase produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoostOutcome {
    /// XP boost, already live on the listing
    Applied(BoostApplied),
    /// Paid boost, waiting for the buyer to pay
    Checkout(CheckoutSession),
}

/// Buys a boost for a listing the caller owns.
pub async fn purchase_boost(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    settings: &PaymentSettings,
    user_id: &str,
    game_id: i64,
    purchase: BoostPurchase,
) -> Result<BoostOutcome> {
    match purchase {
        BoostPurchase::Xp(boost) => spend_xp_boost(db, user_id, game_id, boost)
            .await
            .map(BoostOutcome::Applied),
        BoostPurchase::Paid(boost) => {
            create_boost_payment(db, gateway, settings, user_id, game_id, boost)
                .await
                .map(BoostOutcome::Checkout)
        }
    }
}

/// Opens a checkout session for a paid boost. The listing is not modified.
pub async fn create_boost_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    settings: &PaymentSettings,
    user_id: &str,
    game_id: i64,
    boost: PaidBoost,
) -> Result<CheckoutSession> {
    let listing = require_game(db, game_id).await?;
    if listing.owner_id != user_id {
        return Err(Error::forbidden("Only the owner can boost this listing"));
    }

    let metadata = BTreeMap::from([
        ("type".to_string(), "boost".to_string()),
        ("gameId".to_string(), game_id.to_string()),
        ("boostType".to_string(), boost.key().to_string()),
        ("userId".to_string(), user_id.to_string()),
        ("duration".to_string(), boost.hours().to_string()),
    ]);
    let site = settings.site_url.trim_end_matches('/');

    let session = gateway
        .create_checkout_session(CheckoutRequest {
            currency: settings.currency.clone(),
            unit_amount: boost.price_cents(),
            product_name: boost.label().to_string(),
            description: Some(listing.title),
            success_url: format!("{site}/games/{game_id}?boost=success"),
            cancel_url: format!("{site}/games/{game_id}?boost=cancelled"),
            metadata,
            destination: None,
        })
        .await?;

    info!(user_id, game_id, boost = boost.key(), session_id = %session.id, "Boost checkout created");
    Ok(session)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]
    use super::*;
    use crate::{core::game::get_game, gateway::MockPaymentGateway};

    use crate::test_utils::*;

    fn session() -> CheckoutSession {
        CheckoutSession {
            id: "cs_boost".to_string(),
            url: "https://checkout.example/cs_boost".to_string(),
        }
    }

    #[test]
    fn test_parse_boost_keys() {
        assert_eq!(
            BoostPurchase::parse("48H").unwrap(),
            BoostPurchase::Xp(XpBoost::Hours48)
        );
        assert_eq!(
            BoostPurchase::parse("7D").unwrap(),
            BoostPurchase::Xp(XpBoost::Days7)
        );
        assert_eq!(
            BoostPurchase::parse("7d").unwrap(),
            BoostPurchase::Paid(PaidBoost::Days7)
        );
        assert!(matches!(
            BoostPurchase::parse("1y").unwrap_err(),
            Error::Validation { message: _ }
        ));
    }

    #[tokio::test]
    async fn test_paid_boost_metadata_and_no_listing_change() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let expected_game = game.id.to_string();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .withf(move |request| {
                request.unit_amount == 599
                    && request.destination.is_none()
                    && request.metadata.get("gameId") == Some(&expected_game)
                    && request.metadata.get("boostType").map(String::as_str) == Some("72h")
                    && request.metadata.get("userId").map(String::as_str) == Some("seller")
                    && request.metadata.get("duration").map(String::as_str) == Some("72")
            })
            .times(1)
            .returning(|_| Ok(session()));

        let outcome = purchase_boost(
            &db,
            &gateway,
            &PaymentSettings::default(),
            "seller",
            game.id,
            BoostPurchase::Paid(PaidBoost::Hours72),
        )
        .await?;
        assert_eq!(outcome, BoostOutcome::Checkout(session()));

        let listing = get_game(&db, game.id).await?.unwrap();
        assert!(!listing.is_boosted);
        assert!(listing.boost_type.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_paid_boost_requires_ownership() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_checkout_session().never();

        let result = create_boost_payment(
            &db,
            &gateway,
            &PaymentSettings::default(),
            "buyer",
            game.id,
            PaidBoost::Hours24,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Forbidden { message: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_xp_boost_applies_immediately() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        crate::core::xp::award_xp(&db, "seller", 1000, "seed").await?;
        let gateway = MockPaymentGateway::new();

        let outcome = purchase_boost(
            &db,
            &gateway,
            &PaymentSettings::default(),
            "seller",
            game.id,
            BoostPurchase::Xp(XpBoost::Days7),
        )
        .await?;
        let BoostOutcome::Applied(applied) = outcome else {
            panic!("expected an applied boost");
        };
        assert_eq!(applied.remaining_xp, 100);
        assert_eq!(applied.boost_type, "XP_7D");
        assert!(get_game(&db, game.id).await?.unwrap().is_boosted);
        Ok(())
    }
}
