//! Escrowed sale workflow.
//!
//! A transaction starts `pending` and ends `completed` or `expired`; both are terminal.
//! Expiry is lazy: any operation that finds a pending transaction past its
//! `expires_at` marks it expired itself and then rejects the call.
//!
//! Gateway round trips never run inside a database transaction. Writes that follow a
//! gateway call are conditional on the transaction still being pending.

use crate::{
    config::settings::PaymentSettings,
    core::{
        game::require_game,
        pricing::{MAX_PENDING_REMOTE_REQUESTS, escrow_hold, payment_request_ttl, platform_fee},
        profile::{ProfileCache, require_profile},
        xp::{AWARD_PURCHASE, AWARD_SALE, BUYER_PURCHASE_XP, SELLER_SALE_XP, award_xp_once_in},
    },
    entities::{
        Game, Transaction, game,
        game::ListingStatus,
        transaction,
        transaction::{EscrowStatus, PaymentMethod, TransactionStatus},
    },
    errors::{Error, Result},
    gateway::{CheckoutRequest, CheckoutSession, DestinationCharge, PaymentGateway},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, PaginatorTrait, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Response to a new remote payment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestCreated {
    /// New transaction id
    pub transaction_id: i64,
    /// Listing title
    pub game_title: String,
    /// Amount requested, in cents
    pub price: i64,
    /// Display name of the buyer
    pub buyer_name: String,
}

/// Response to a completed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    /// Always `true`; failures are errors
    pub success: bool,
    /// Escrow state after completion
    pub escrow_status: EscrowStatus,
    /// When held funds become releasable
    pub escrow_release_at: Option<DateTime<Utc>>,
}

/// Finds a transaction by id.
pub async fn get_transaction<C>(db: &C, transaction_id: i64) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a transaction by id, failing with `NotFound` when absent.
pub async fn require_transaction<C>(db: &C, transaction_id: i64) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    get_transaction(db, transaction_id)
        .await?
        .ok_or_else(|| Error::not_found("Transaction", transaction_id))
}

/// Rejects expired transactions, marking a lapsed pending one expired first.
///
/// Returns `Ok(())` when the transaction is still usable as far as time is concerned.
pub async fn expire_if_lapsed<C>(
    db: &C,
    tx: &transaction::Model,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if tx.status == TransactionStatus::Expired {
        return Err(Error::Expired {
            transaction_id: tx.id,
        });
    }

    let lapsed = tx.status == TransactionStatus::Pending
        && tx.expires_at.is_some_and(|deadline| deadline <= now);
    if !lapsed {
        return Ok(());
    }

    let flipped = Transaction::update_many()
        .set(transaction::ActiveModel {
            status: Set(TransactionStatus::Expired),
            ..Default::default()
        })
        .filter(transaction::Column::Id.eq(tx.id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(db)
        .await?;
    if flipped.rows_affected > 0 {
        info!(transaction_id = tx.id, "Transaction expired");
    }

    Err(Error::Expired {
        transaction_id: tx.id,
    })
}

/// Checks that `seller_id` can sell `listing` right now.
fn ensure_sellable(listing: &game::Model, seller_id: &str) -> Result<()> {
    if listing.owner_id != seller_id {
        return Err(Error::forbidden("Only the listing owner can sell it"));
    }
    if listing.status != ListingStatus::Available {
        return Err(Error::invalid_state("Listing is not available"));
    }
    if !listing.listing_type.is_for_sale() {
        return Err(Error::validation("Listing is not for sale"));
    }
    if listing.price_cents <= 0 {
        return Err(Error::validation("Listing has no price"));
    }
    Ok(())
}

/// Number of open remote requests by `seller_id` on `game_id`.
///
/// Requests whose deadline already passed do not count, even before they are marked.
pub async fn count_pending_requests(
    db: &DatabaseConnection,
    seller_id: &str,
    game_id: i64,
    now: DateTime<Utc>,
) -> Result<u64> {
    Transaction::find()
        .filter(transaction::Column::PostId.eq(game_id))
        .filter(transaction::Column::SellerId.eq(seller_id))
        .filter(transaction::Column::Method.eq(PaymentMethod::Remote))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .filter(
            Condition::any()
                .add(transaction::Column::ExpiresAt.is_null())
                .add(transaction::Column::ExpiresAt.gt(now)),
        )
        .count(db)
        .await
        .map_err(Into::into)
}

/// Seller asks a buyer to pay for a listing remotely.
///
/// The request is payable for 24 hours. At most three may be open per listing.
pub async fn create_remote_payment_request(
    db: &DatabaseConnection,
    profiles: &ProfileCache,
    seller_id: &str,
    game_id: i64,
    buyer_id: &str,
) -> Result<PaymentRequestCreated> {
    if buyer_id == seller_id {
        return Err(Error::validation("Cannot send a payment request to yourself"));
    }

    let listing = require_game(db, game_id).await?;
    ensure_sellable(&listing, seller_id)?;

    let buyer = profiles
        .get(db, buyer_id)
        .await?
        .ok_or_else(|| Error::not_found("Profile", buyer_id))?;

    let now = Utc::now();
    let pending = count_pending_requests(db, seller_id, game_id, now).await?;
    if pending >= MAX_PENDING_REMOTE_REQUESTS {
        return Err(Error::TooManyPendingRequests {
            limit: MAX_PENDING_REMOTE_REQUESTS,
        });
    }

    let request = transaction::ActiveModel {
        post_id: Set(game_id),
        seller_id: Set(seller_id.to_string()),
        buyer_id: Set(buyer_id.to_string()),
        amount_cents: Set(listing.price_cents),
        platform_fee_cents: Set(platform_fee(listing.price_cents)),
        method: Set(PaymentMethod::Remote),
        status: Set(TransactionStatus::Pending),
        escrow_status: Set(EscrowStatus::NoEscrow),
        escrow_release_at: Set(None),
        expires_at: Set(Some(now + payment_request_ttl())),
        stripe_checkout_session_id: Set(None),
        created_at: Set(now),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        transaction_id = request.id,
        game_id,
        seller_id,
        buyer_id,
        amount_cents = request.amount_cents,
        "Payment request created"
    );

    Ok(PaymentRequestCreated {
        transaction_id: request.id,
        game_title: listing.title,
        price: request.amount_cents,
        buyer_name: buyer.display_name,
    })
}

/// Records a card or cash sale agreed in person. Cash carries no platform fee.
pub async fn create_direct_sale(
    db: &DatabaseConnection,
    seller_id: &str,
    buyer_id: &str,
    game_id: i64,
    method: PaymentMethod,
) -> Result<transaction::Model> {
    if method == PaymentMethod::Remote {
        return Err(Error::validation(
            "Remote sales go through payment requests",
        ));
    }
    if buyer_id == seller_id {
        return Err(Error::validation("Cannot sell to yourself"));
    }

    let listing = require_game(db, game_id).await?;
    ensure_sellable(&listing, seller_id)?;
    require_profile(db, buyer_id).await?;

    let fee = if method == PaymentMethod::Card {
        platform_fee(listing.price_cents)
    } else {
        0
    };

    let sale = transaction::ActiveModel {
        post_id: Set(game_id),
        seller_id: Set(seller_id.to_string()),
        buyer_id: Set(buyer_id.to_string()),
        amount_cents: Set(listing.price_cents),
        platform_fee_cents: Set(fee),
        method: Set(method),
        status: Set(TransactionStatus::Pending),
        escrow_status: Set(EscrowStatus::NoEscrow),
        escrow_release_at: Set(None),
        expires_at: Set(None),
        stripe_checkout_session_id: Set(None),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(transaction_id = sale.id, game_id, ?method, "Direct sale recorded");
    Ok(sale)
}

/// Buyer pays a remote request through a hosted checkout.
///
/// Funds go to the seller's connected account minus the platform fee, and are held
/// in escrow for 48 hours.
pub async fn pay_payment_request(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    settings: &PaymentSettings,
    transaction_id: i64,
    buyer_id: &str,
) -> Result<CheckoutSession> {
    let tx = require_transaction(db, transaction_id).await?;
    if tx.buyer_id != buyer_id {
        return Err(Error::forbidden("Only the buyer can pay this request"));
    }
    if tx.method != PaymentMethod::Remote {
        return Err(Error::validation("Not a payment request"));
    }
    expire_if_lapsed(db, &tx, Utc::now()).await?;
    if tx.status != TransactionStatus::Pending {
        return Err(Error::invalid_state("Payment request is no longer pending"));
    }
    if tx.escrow_status != EscrowStatus::NoEscrow {
        return Err(Error::invalid_state("Payment request already has a checkout"));
    }

    let listing = require_game(db, tx.post_id).await?;
    let seller = require_profile(db, &tx.seller_id).await?;
    let account_id = seller
        .stripe_account_id
        .ok_or_else(|| Error::gateway("Seller has no payment account"))?;

    let account = gateway.retrieve_account(&account_id).await?;
    if !account.is_fully_enabled() {
        return Err(Error::gateway("Seller payment account is not fully enabled"));
    }

    let metadata = BTreeMap::from([
        ("type".to_string(), "payment_request".to_string()),
        ("transactionId".to_string(), tx.id.to_string()),
        ("gameId".to_string(), tx.post_id.to_string()),
        ("buyerId".to_string(), tx.buyer_id.clone()),
        ("sellerId".to_string(), tx.seller_id.clone()),
    ]);
    let site = settings.site_url.trim_end_matches('/');
    let session = gateway
        .create_checkout_session(CheckoutRequest {
            currency: settings.currency.clone(),
            unit_amount: tx.amount_cents,
            product_name: listing.title,
            description: Some(format!("Sold by {}", seller.display_name)),
            success_url: format!("{site}/transactions/{}?payment=success", tx.id),
            cancel_url: format!("{site}/transactions/{}?payment=cancelled", tx.id),
            metadata,
            destination: Some(DestinationCharge {
                application_fee_amount: platform_fee(tx.amount_cents),
                destination: account.id,
            }),
        })
        .await?;

    let now = Utc::now();
    let held = Transaction::update_many()
        .set(transaction::ActiveModel {
            escrow_status: Set(EscrowStatus::PendingEscrow),
            escrow_release_at: Set(Some(now + escrow_hold())),
            stripe_checkout_session_id: Set(Some(session.id.clone())),
            ..Default::default()
        })
        .filter(transaction::Column::Id.eq(tx.id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .filter(transaction::Column::EscrowStatus.eq(EscrowStatus::NoEscrow))
        .exec(db)
        .await?;
    if held.rows_affected == 0 {
        return Err(Error::Conflict {
            message: format!("Transaction {} changed during checkout", tx.id),
        });
    }

    info!(transaction_id = tx.id, session_id = %session.id, "Checkout session created");
    Ok(session)
}

/// Either party marks a pending transaction as completed.
///
/// The listing becomes sold. Card sales enter a 48-hour escrow hold and grant XP to
/// both parties once per listing; cash and remote sales grant none.
pub async fn complete_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
    caller_id: &str,
) -> Result<CompletionResult> {
    let tx = require_transaction(db, transaction_id).await?;
    if !tx.involves(caller_id) {
        return Err(Error::forbidden("Not a party to this transaction"));
    }
    let now = Utc::now();
    expire_if_lapsed(db, &tx, now).await?;
    if tx.status != TransactionStatus::Pending {
        return Err(Error::invalid_state("Transaction is not pending"));
    }

    let (escrow_status, escrow_release_at) = if tx.method == PaymentMethod::Card {
        (EscrowStatus::PendingEscrow, Some(now + escrow_hold()))
    } else {
        (tx.escrow_status, tx.escrow_release_at)
    };

    let txn = db.begin().await?;

    let completed = Transaction::update_many()
        .set(transaction::ActiveModel {
            status: Set(TransactionStatus::Completed),
            completed_at: Set(Some(now)),
            escrow_status: Set(escrow_status),
            escrow_release_at: Set(escrow_release_at),
            ..Default::default()
        })
        .filter(transaction::Column::Id.eq(tx.id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(&txn)
        .await?;
    if completed.rows_affected == 0 {
        txn.rollback().await?;
        debug!(transaction_id, "Completion lost a race");
        return Err(Error::Conflict {
            message: format!("Transaction {transaction_id} was modified concurrently"),
        });
    }

    Game::update_many()
        .set(game::ActiveModel {
            status: Set(ListingStatus::Sold),
            ..Default::default()
        })
        .filter(game::Column::Id.eq(tx.post_id))
        .exec(&txn)
        .await?;

    if tx.method == PaymentMethod::Card {
        let reference = tx.post_id.to_string();
        award_xp_once_in(
            &txn,
            &tx.seller_id,
            AWARD_SALE,
            &reference,
            SELLER_SALE_XP,
            "sale_completed",
        )
        .await?;
        award_xp_once_in(
            &txn,
            &tx.buyer_id,
            AWARD_PURCHASE,
            &reference,
            BUYER_PURCHASE_XP,
            "purchase_completed",
        )
        .await?;
    }

    txn.commit().await?;

    info!(
        transaction_id,
        post_id = tx.post_id,
        method = ?tx.method,
        ?escrow_status,
        "Transaction completed"
    );

    Ok(CompletionResult {
        success: true,
        escrow_status,
        escrow_release_at,
    })
}
