/// Listing boost purchases (XP and paid)
pub mod boost;
/// Injectable time source
pub mod clock;
/// Escrowed sale workflow and lazy expiry
pub mod escrow;
/// Listing lookups and creation
pub mod game;
/// Commission, time windows and boost price tables
pub mod pricing;
/// Profile lookups and the TTL profile cache
pub mod profile;
/// Rating submission and reputation scoring
pub mod reputation;
/// Seller payout account onboarding
pub mod seller;
/// Two-party trade confirmation
pub mod trade;
/// XP ledger, ranks and XP-paid boosts
pub mod xp;
