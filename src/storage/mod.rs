//! Persistence seam for ledger records.
//!
//! `LedgerStore` is the repository interface the exchange service talks
//! to; [`MemoryStore`] is the in-process implementation. Writes that
//! touch more than one record are single trait calls so a store can
//! commit them atomically; the claim transaction is additionally split
//! into a pure preparation step here and the commit inside each store
//! implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    ClaimReceipt, ClothingItem, ItemStatus, LedgerError, LedgerResult, LedgerSettings,
    SettingUpdate, SwapRequest, User,
};
use crate::scoring;

mod memory;
mod session;

pub use memory::MemoryStore;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, SESSION_KEY};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ============= Users =============

    /// Fails with `EmailTaken` when the address is already registered;
    /// the comparison is case-insensitive.
    async fn insert_user(&self, user: User) -> LedgerResult<()>;
    async fn user_by_id(&self, id: Uuid) -> LedgerResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> LedgerResult<Option<User>>;
    async fn update_user(&self, user: User) -> LedgerResult<()>;
    async fn user_count(&self) -> LedgerResult<usize>;

    // ============= Items =============

    async fn item_by_id(&self, id: Uuid) -> LedgerResult<Option<ClothingItem>>;
    /// Every item in the store, approved or not.
    async fn items(&self) -> LedgerResult<Vec<ClothingItem>>;
    async fn update_item(&self, item: ClothingItem) -> LedgerResult<()>;
    async fn delete_item(&self, id: Uuid) -> LedgerResult<()>;

    // ============= Swap requests =============

    async fn insert_swap_request(&self, request: SwapRequest) -> LedgerResult<()>;
    async fn swap_request_by_id(&self, id: Uuid) -> LedgerResult<Option<SwapRequest>>;
    async fn update_swap_request(&self, request: SwapRequest) -> LedgerResult<()>;
    /// Requests where the user is sender or recipient.
    async fn swap_requests_for_user(&self, user_id: Uuid) -> LedgerResult<Vec<SwapRequest>>;

    // ============= Settings =============

    async fn settings(&self) -> LedgerResult<LedgerSettings>;
    /// Apply one settings change as a single read-modify-write and
    /// return the result.
    async fn apply_setting(&self, update: SettingUpdate) -> LedgerResult<LedgerSettings>;

    // ============= Transactions =============

    /// Insert a listing and credit the uploader's listing counter as one
    /// unit, progressing their tier. Returns the updated uploader.
    async fn commit_listing(&self, item: ClothingItem) -> LedgerResult<User>;

    /// Run the whole claim as one transaction: validate, move points,
    /// mark the item claimed, and progress the seller's tier. Either
    /// all three records are updated or none of them are.
    async fn commit_claim(&self, buyer_id: Uuid, item_id: Uuid) -> LedgerResult<ClaimReceipt>;
}

/// Validate a claim and compute the records it would produce, without
/// touching storage. Store implementations call this inside their
/// transaction boundary; tests call it directly.
pub fn prepare_claim(
    buyer: &User,
    seller: &User,
    item: &ClothingItem,
) -> LedgerResult<ClaimReceipt> {
    if buyer.id == item.uploader_id {
        return Err(LedgerError::SelfClaim);
    }

    if !item.is_available() {
        return Err(LedgerError::ItemUnavailable);
    }

    if buyer.points < item.point_value {
        return Err(LedgerError::InsufficientPoints {
            needed: item.point_value - buyer.points,
        });
    }

    let mut buyer = buyer.clone();
    let mut seller = seller.clone();
    let mut item = item.clone();

    buyer.points -= item.point_value;
    seller.points += item.point_value;
    seller.successful_exchanges += 1;
    scoring::progress_user(&mut seller);
    item.status = ItemStatus::Claimed;

    Ok(ClaimReceipt {
        buyer,
        seller,
        item,
    })
}
