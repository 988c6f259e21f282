//! Exchange ledger for the ReWear clothing marketplace.
//!
//! Holds users, listings, and swap requests; computes listing point
//! values; applies the claim transaction that moves points between two
//! users; and tracks each user's trust tier and badges as a monotonic
//! function of their activity counters.
//!
//! The entry point is [`ExchangeService`], constructed over a
//! [`storage::LedgerStore`], a [`storage::SessionStore`], and a
//! [`auth::CredentialVerifier`]:
//!
//! ```no_run
//! use exchange_ledger::{Config, ExchangeService, RegisterRequest};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let ledger = ExchangeService::from_config(&config).await?;
//!
//! // A fresh ledger has no accounts; registering also logs the member in.
//! let member = ledger
//!     .register(RegisterRequest {
//!         name: "Sarah Johnson".to_string(),
//!         email: "sarah@example.com".to_string(),
//!         password: "password123".to_string(),
//!         city: "New York".to_string(),
//!         preferred_sizes: vec!["S".to_string(), "M".to_string()],
//!         profile_image: None,
//!     })
//!     .await?;
//! println!("{} starts with {} points", member.name, member.points);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod logging;
pub mod models;
pub mod moderation;
pub mod scoring;
pub mod services;
pub mod storage;

pub use auth::{ArgonVerifier, CredentialVerifier};
pub use config::Config;
pub use models::{
    ClaimReceipt, ClothingItem, Condition, FitType, ItemFilters, ItemSort, ItemStatus,
    LedgerError, LedgerResult, LedgerSettings, MarketplaceStats, ModerationMode, NewItemRequest,
    NewSwapRequest, RegisterRequest, Role, SettingUpdate, SwapDecision, SwapRequest, SwapStatus,
    TrustTier, User, UserPublic,
};
pub use scoring::calculate_points;
pub use services::ExchangeService;
pub use storage::{
    FileSessionStore, LedgerStore, MemorySessionStore, MemoryStore, SessionStore,
};
