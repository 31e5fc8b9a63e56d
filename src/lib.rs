//! Rewards service for the storefront: reward calculation, voucher issuance,
//! redemption moderation, and sale-event crediting behind a small HTTP API.

pub mod config;
pub mod error;
pub mod rewards;
pub mod telemetry;
