//! HTTP surface.
//!
//! Serverless-style function endpoints under `/functions/*` plus public read
//! endpoints for reputation and XP. All workflow logic lives in [`crate::core`].

mod error;
mod extract;
mod handlers;

pub use extract::AuthUser;

use crate::{
    auth::JwtAuthenticator, config::settings::Settings, core::profile::ProfileCache,
    gateway::PaymentGateway,
};
use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Payment provider
    pub gateway: Arc<dyn PaymentGateway>,
    /// Bearer token validation
    pub auth: Arc<JwtAuthenticator>,
    /// Non-secret settings
    pub settings: Arc<Settings>,
    /// Profile row cache
    pub profiles: Arc<ProfileCache>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/functions/send-payment-request",
            post(handlers::send_payment_request),
        )
        .route(
            "/functions/pay-payment-request",
            post(handlers::pay_payment_request),
        )
        .route(
            "/functions/complete-transaction",
            post(handlers::complete_transaction),
        )
        .route(
            "/functions/create-boost-payment",
            post(handlers::create_boost_payment_handler),
        )
        .route(
            "/functions/create-seller-account",
            post(handlers::create_seller_account_handler),
        )
        .route(
            "/functions/confirm-trade",
            post(handlers::confirm_trade_handler),
        )
        .route(
            "/functions/submit-rating",
            post(handlers::submit_rating_handler),
        )
        .route(
            "/functions/spend-xp-boost",
            post(handlers::spend_xp_boost_handler),
        )
        .route("/users/{id}/reputation", get(handlers::user_reputation))
        .route("/users/{id}/xp", get(handlers::user_xp))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{clock::SystemClock, escrow::require_transaction},
        entities::transaction::{EscrowStatus, PaymentMethod, TransactionStatus},
        errors::Result,
        gateway::{ConnectedAccount, CheckoutSession, MockPaymentGateway},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use sea_orm::SqlxSqliteConnector;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::test_utils::*;

    fn app(db: &DatabaseConnection, gateway: MockPaymentGateway) -> Router {
        router(AppState {
            db: Arc::new(SqlxSqliteConnector::from_sqlx_sqlite_pool(
                db.get_sqlite_connection_pool().clone(),
            )),
            gateway: Arc::new(gateway),
            auth: Arc::new(JwtAuthenticator::new(TEST_JWT_SECRET, "authenticated")),
            settings: Arc::new(Settings::default()),
            profiles: Arc::new(ProfileCache::new(
                Duration::minutes(5),
                Arc::new(SystemClock),
            )),
        })
    }

    fn post_json(uri: &str, user_id: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user_id) = user_id {
            builder = builder.header(
                "authorization",
                format!("Bearer {}", issue_test_token(user_id)),
            );
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() -> Result<()> {
        let db = setup_test_db().await?;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let request = post_json(
            "/functions/send-payment-request",
            None,
            &json!({ "gameId": game.id, "buyerId": "buyer" }),
        );
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_send_payment_request() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let request = post_json(
            "/functions/send-payment-request",
            Some("seller"),
            &json!({ "gameId": game.id, "buyerId": "buyer" }),
        );
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gameTitle"], game.title.as_str());
        assert_eq!(body["price"], 2000);
        assert_eq!(body["buyerName"], "buyer");

        let tx = require_transaction(&db, body["transactionId"].as_i64().unwrap()).await?;
        assert_eq!(tx.method, PaymentMethod::Remote);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_payment_request_to_self_is_bad_request() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let request = post_json(
            "/functions/send-payment-request",
            Some("seller"),
            &json!({ "gameId": game.id, "buyerId": "seller" }),
        );
        let (status, _) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() -> Result<()> {
        let db = setup_test_db().await?;
        let request = post_json(
            "/functions/confirm-trade",
            Some("seller"),
            &json!({ "trade": "nope" }),
        );
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_pay_payment_request_returns_checkout() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        link_payment_account(&db, "seller", "acct_seller").await?;
        let tx = insert_remote_request(&db, &game, "buyer", Utc::now() + Duration::hours(2))
            .await?;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_retrieve_account().returning(|id| {
            Ok(ConnectedAccount {
                id: id.to_string(),
                charges_enabled: true,
                payouts_enabled: true,
            })
        });
        gateway.expect_create_checkout_session().returning(|_| {
            Ok(CheckoutSession {
                id: "cs_1".to_string(),
                url: "https://checkout.example/cs_1".to_string(),
            })
        });

        let request = post_json(
            "/functions/pay-payment-request",
            Some("buyer"),
            &json!({ "transactionId": tx.id }),
        );
        let (status, body) = call(app(&db, gateway), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], "cs_1");
        assert_eq!(body["url"], "https://checkout.example/cs_1");
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_transaction_reports_escrow() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let sale = crate::core::escrow::create_direct_sale(
            &db,
            "seller",
            "buyer",
            game.id,
            PaymentMethod::Card,
        )
        .await?;

        let request = post_json(
            "/functions/complete-transaction",
            Some("buyer"),
            &json!({ "transactionId": sale.id }),
        );
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["escrowStatus"], "pending_escrow");
        assert!(body["escrowReleaseAt"].is_string());

        let stored = require_transaction(&db, sale.id).await?;
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.escrow_status, EscrowStatus::PendingEscrow);
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_trade_flow() -> Result<()> {
        let (db, trade) = setup_with_trade().await?;
        let gateway = MockPaymentGateway::new;

        let first = post_json(
            "/functions/confirm-trade",
            Some("seller"),
            &json!({ "tradeId": trade.id }),
        );
        let (status, body) = call(app(&db, gateway()), first).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "awaiting_counterparty");
        assert_eq!(body["completed"], false);

        let second = post_json(
            "/functions/confirm-trade",
            Some("buyer"),
            &json!({ "tradeId": trade.id }),
        );
        let (_, body) = call(app(&db, gateway()), second).await;
        assert_eq!(body["outcome"], "completed");
        assert_eq!(body["completed"], true);

        let outsider = post_json(
            "/functions/confirm-trade",
            Some("mallory"),
            &json!({ "tradeId": trade.id }),
        );
        let (status, _) = call(app(&db, gateway()), outsider).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_rating_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "seller", 0).await?;
        create_test_profile(&db, "buyer", 0).await?;
        let trade = create_completed_trade(&db, "seller", "buyer").await?;
        let body = json!({ "tradeId": trade.id, "ratedUserId": "seller", "rating": 5 });

        let (status, created) = call(
            app(&db, MockPaymentGateway::new()),
            post_json("/functions/submit-rating", Some("buyer"), &body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["success"], true);

        let (status, _) = call(
            app(&db, MockPaymentGateway::new()),
            post_json("/functions/submit-rating", Some("buyer"), &body),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        Ok(())
    }

    #[tokio::test]
    async fn test_spend_xp_boost_insufficient() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let request = post_json(
            "/functions/spend-xp-boost",
            Some("seller"),
            &json!({ "gameId": game.id, "boostType": "48H" }),
        );
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Insufficient XP: have 0, need 300");
        Ok(())
    }

    #[tokio::test]
    async fn test_boost_routes_reject_the_other_kind() -> Result<()> {
        let (db, game) = setup_with_listing().await?;
        let paid_on_xp_route = post_json(
            "/functions/spend-xp-boost",
            Some("seller"),
            &json!({ "gameId": game.id, "boostType": "24h" }),
        );
        let (status, _) = call(app(&db, MockPaymentGateway::new()), paid_on_xp_route).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let xp_on_paid_route = post_json(
            "/functions/create-boost-payment",
            Some("seller"),
            &json!({ "gameId": game.id, "boostType": "7D" }),
        );
        let (status, _) = call(app(&db, MockPaymentGateway::new()), xp_on_paid_route).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_public_reads() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "seller", 600).await?;

        let request = Request::builder()
            .uri("/users/seller/xp")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["xp"], 600);
        assert_eq!(body["rank"]["name"], "Silver");
        assert_eq!(body["nextRank"]["name"], "Gold");

        let request = Request::builder()
            .uri("/users/nobody/reputation")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reputationScore"], 0);
        assert_eq!(body["league"], "bronze");

        let request = Request::builder()
            .uri("/users/nobody/xp")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(app(&db, MockPaymentGateway::new()), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }
}
