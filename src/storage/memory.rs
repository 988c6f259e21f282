use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::CredentialVerifier;
use crate::models::{
    ClaimReceipt, ClothingItem, Condition, FitType, ItemStatus, LedgerError, LedgerResult,
    LedgerSettings, Role, SettingUpdate, SwapRequest, TrustTier, User,
};
use crate::scoring::{calculate_points, progress_user};
use crate::storage::{prepare_claim, LedgerStore};

#[derive(Debug, Default)]
struct StoreState {
    users: HashMap<Uuid, User>,
    items: HashMap<Uuid, ClothingItem>,
    swap_requests: HashMap<Uuid, SwapRequest>,
    settings: LedgerSettings,
}

/// In-process store. All records live behind a single lock so the claim
/// commit can read and write two users and an item as one unit.
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        Self {
            state: RwLock::new(StoreState {
                settings,
                ..StoreState::default()
            }),
        }
    }

    /// Store pre-populated with the demo accounts and listings used by
    /// local development and the examples.
    pub fn with_demo_data(verifier: &dyn CredentialVerifier) -> LedgerResult<Self> {
        let mut state = StoreState::default();
        let now = Utc::now();

        let admin = User {
            id: Uuid::new_v4(),
            name: "Admin User".to_string(),
            email: "admin@rewear.com".to_string(),
            password_hash: verifier.hash_password("admin123")?,
            city: "San Francisco".to_string(),
            preferred_sizes: vec!["M".to_string(), "L".to_string()],
            profile_image: None,
            role: Role::Admin,
            points: 500,
            trust_tier: TrustTier::SuperSwapper,
            badges: vec!["Admin".to_string(), "Community Leader".to_string()],
            total_listings: 0,
            successful_exchanges: 0,
            created_at: now - Duration::days(90),
        };

        let sarah = User {
            id: Uuid::new_v4(),
            name: "Sarah Johnson".to_string(),
            email: "sarah@example.com".to_string(),
            password_hash: verifier.hash_password("password123")?,
            city: "New York".to_string(),
            preferred_sizes: vec!["S".to_string(), "M".to_string()],
            profile_image: None,
            role: Role::User,
            points: 150,
            trust_tier: TrustTier::TrustedGiver,
            badges: vec!["First Listing".to_string(), "Community Member".to_string()],
            total_listings: 2,
            successful_exchanges: 5,
            created_at: now - Duration::days(60),
        };

        let mike = User {
            id: Uuid::new_v4(),
            name: "Mike Chen".to_string(),
            email: "mike@example.com".to_string(),
            password_hash: verifier.hash_password("password123")?,
            city: "Los Angeles".to_string(),
            preferred_sizes: vec!["L".to_string(), "XL".to_string()],
            profile_image: None,
            role: Role::User,
            points: 200,
            trust_tier: TrustTier::BasicGiver,
            badges: vec!["Early Adopter".to_string()],
            total_listings: 1,
            successful_exchanges: 3,
            created_at: now - Duration::days(45),
        };

        let jacket = demo_item(
            &sarah,
            "Vintage Denim Jacket",
            "Classic blue denim jacket in excellent condition. Perfect for layering.",
            "Outerwear",
            "Jacket",
            "M",
            Condition::Good,
            vec!["vintage", "denim", "casual"],
            now - Duration::days(5),
        );

        let tshirt = demo_item(
            &mike,
            "White Cotton T-Shirt",
            "Soft white cotton t-shirt, barely worn. Essential wardrobe staple.",
            "Tops",
            "T-Shirt",
            "L",
            Condition::LikeNew,
            vec!["cotton", "basic", "white"],
            now - Duration::days(3),
        );

        let sweater = demo_item(
            &sarah,
            "Designer Wool Sweater",
            "Brand new designer wool sweater with tags. Luxuriously warm.",
            "Tops",
            "Sweater",
            "S",
            Condition::New,
            vec!["wool", "designer", "cozy"],
            now - Duration::days(1),
        );

        for user in [admin, sarah, mike] {
            state.users.insert(user.id, user);
        }
        for item in [jacket, tshirt, sweater] {
            state.items.insert(item.id, item);
        }

        Ok(Self {
            state: RwLock::new(state),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_item(
    uploader: &User,
    title: &str,
    description: &str,
    category: &str,
    item_type: &str,
    size: &str,
    condition: Condition,
    tags: Vec<&str>,
    created_at: chrono::DateTime<Utc>,
) -> ClothingItem {
    ClothingItem {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        item_type: item_type.to_string(),
        size: size.to_string(),
        condition,
        fit_type: FitType::Standard,
        tags: tags.into_iter().map(String::from).collect(),
        images: vec![],
        uploader_id: uploader.id,
        uploader_name: uploader.name.clone(),
        status: ItemStatus::Available,
        point_value: calculate_points(category, condition, size, FitType::Standard),
        approved: true,
        created_at,
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_user(&self, user: User) -> LedgerResult<()> {
        // Uniqueness check and insert under the same lock.
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(LedgerError::EmailTaken);
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> LedgerResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> LedgerResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_user(&self, user: User) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user.id) {
            return Err(LedgerError::UserNotFound);
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn user_count(&self) -> LedgerResult<usize> {
        let state = self.state.read().await;
        Ok(state.users.len())
    }

    async fn item_by_id(&self, id: Uuid) -> LedgerResult<Option<ClothingItem>> {
        let state = self.state.read().await;
        Ok(state.items.get(&id).cloned())
    }

    async fn items(&self) -> LedgerResult<Vec<ClothingItem>> {
        let state = self.state.read().await;
        Ok(state.items.values().cloned().collect())
    }

    async fn update_item(&self, item: ClothingItem) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        if !state.items.contains_key(&item.id) {
            return Err(LedgerError::ItemNotFound);
        }
        state.items.insert(item.id, item);
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        state
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or(LedgerError::ItemNotFound)
    }

    async fn insert_swap_request(&self, request: SwapRequest) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        state.swap_requests.insert(request.id, request);
        Ok(())
    }

    async fn swap_request_by_id(&self, id: Uuid) -> LedgerResult<Option<SwapRequest>> {
        let state = self.state.read().await;
        Ok(state.swap_requests.get(&id).cloned())
    }

    async fn update_swap_request(&self, request: SwapRequest) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        if !state.swap_requests.contains_key(&request.id) {
            return Err(LedgerError::SwapRequestNotFound);
        }
        state.swap_requests.insert(request.id, request);
        Ok(())
    }

    async fn swap_requests_for_user(&self, user_id: Uuid) -> LedgerResult<Vec<SwapRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<SwapRequest> = state
            .swap_requests
            .values()
            .filter(|request| request.from_user_id == user_id || request.to_user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn settings(&self) -> LedgerResult<LedgerSettings> {
        let state = self.state.read().await;
        Ok(state.settings.clone())
    }

    async fn apply_setting(&self, update: SettingUpdate) -> LedgerResult<LedgerSettings> {
        let mut state = self.state.write().await;
        state.settings.apply(update);
        Ok(state.settings.clone())
    }

    async fn commit_listing(&self, item: ClothingItem) -> LedgerResult<User> {
        // One write lock so the item insert and the uploader's counter
        // bump land together.
        let mut state = self.state.write().await;

        let mut uploader = state
            .users
            .get(&item.uploader_id)
            .cloned()
            .ok_or(LedgerError::UserNotFound)?;

        uploader.total_listings += 1;
        progress_user(&mut uploader);

        state.items.insert(item.id, item);
        state.users.insert(uploader.id, uploader.clone());

        Ok(uploader)
    }

    async fn commit_claim(&self, buyer_id: Uuid, item_id: Uuid) -> LedgerResult<ClaimReceipt> {
        // Single write lock for the whole transaction: no other task can
        // observe or interleave a partially applied claim.
        let mut state = self.state.write().await;

        let item = state
            .items
            .get(&item_id)
            .cloned()
            .ok_or(LedgerError::ItemNotFound)?;
        let buyer = state
            .users
            .get(&buyer_id)
            .cloned()
            .ok_or(LedgerError::UserNotFound)?;
        let seller = state
            .users
            .get(&item.uploader_id)
            .cloned()
            .ok_or(LedgerError::UserNotFound)?;

        let receipt = prepare_claim(&buyer, &seller, &item)?;

        state
            .users
            .insert(receipt.buyer.id, receipt.buyer.clone());
        state
            .users
            .insert(receipt.seller.id, receipt.seller.clone());
        state.items.insert(receipt.item.id, receipt.item.clone());

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::auth::PlainVerifier;

    async fn demo_store() -> MemoryStore {
        MemoryStore::with_demo_data(&PlainVerifier).unwrap()
    }

    async fn user_by_email(store: &MemoryStore, email: &str) -> User {
        store.user_by_email(email).await.unwrap().unwrap()
    }

    async fn item_by_title(store: &MemoryStore, title: &str) -> ClothingItem {
        store
            .items()
            .await
            .unwrap()
            .into_iter()
            .find(|item| item.title == title)
            .unwrap()
    }

    #[tokio::test]
    async fn test_demo_data_shape() {
        let store = demo_store().await;

        assert_eq!(store.user_count().await.unwrap(), 3);

        let mut values: Vec<i64> = store
            .items()
            .await
            .unwrap()
            .iter()
            .map(|item| item.point_value)
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec![20, 22, 29]);

        let admin = user_by_email(&store, "admin@rewear.com").await;
        assert!(admin.is_admin());
        assert_eq!(admin.points, 500);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let store = demo_store().await;
        let user = store.user_by_email("SARAH@example.com").await.unwrap();
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn test_insert_user_rejects_duplicate_email() {
        let store = demo_store().await;
        let mut copycat = user_by_email(&store, "sarah@example.com").await;
        copycat.id = Uuid::new_v4();
        copycat.email = "SARAH@example.com".to_string();

        assert!(matches!(
            store.insert_user(copycat).await,
            Err(LedgerError::EmailTaken)
        ));
        assert_eq!(store.user_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_user_fails() {
        let store = demo_store().await;
        let mut ghost = user_by_email(&store, "mike@example.com").await;
        ghost.id = Uuid::new_v4();

        assert!(matches!(
            store.update_user(ghost).await,
            Err(LedgerError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_item() {
        let store = demo_store().await;
        let item = item_by_title(&store, "White Cotton T-Shirt").await;

        store.delete_item(item.id).await.unwrap();
        assert!(store.item_by_id(item.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_item(item.id).await,
            Err(LedgerError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn test_commit_listing_credits_uploader_in_one_call() {
        let store = demo_store().await;
        let mike = user_by_email(&store, "mike@example.com").await;
        let listing = demo_item(
            &mike,
            "Corduroy Overshirt",
            "Heavy cotton overshirt in rust",
            "Tops",
            "Shirt",
            "L",
            Condition::Good,
            vec!["corduroy"],
            Utc::now(),
        );

        // Second listing plus three prior exchanges crosses the
        // Trusted Giver bar.
        let updated = store.commit_listing(listing.clone()).await.unwrap();
        assert_eq!(updated.total_listings, 2);
        assert_eq!(updated.trust_tier, TrustTier::TrustedGiver);
        assert!(updated.badges.contains(&"Trusted Giver".to_string()));

        let stored = store.user_by_id(mike.id).await.unwrap().unwrap();
        assert_eq!(stored.total_listings, 2);
        assert!(store.item_by_id(listing.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_listing_unknown_uploader_inserts_nothing() {
        let store = demo_store().await;
        let mut ghost = user_by_email(&store, "mike@example.com").await;
        ghost.id = Uuid::new_v4();
        let listing = demo_item(
            &ghost,
            "Phantom Coat",
            "Uploader does not exist",
            "Outerwear",
            "Coat",
            "M",
            Condition::Fair,
            vec![],
            Utc::now(),
        );

        assert!(matches!(
            store.commit_listing(listing.clone()).await,
            Err(LedgerError::UserNotFound)
        ));
        assert!(store.item_by_id(listing.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_claim_updates_all_three_records() {
        let store = demo_store().await;
        let mike = user_by_email(&store, "mike@example.com").await;
        let jacket = item_by_title(&store, "Vintage Denim Jacket").await;

        let receipt = store.commit_claim(mike.id, jacket.id).await.unwrap();
        assert_eq!(receipt.buyer.points, 200 - 29);
        assert_eq!(receipt.item.status, ItemStatus::Claimed);

        let stored_buyer = store.user_by_id(mike.id).await.unwrap().unwrap();
        let stored_seller = store
            .user_by_id(jacket.uploader_id)
            .await
            .unwrap()
            .unwrap();
        let stored_item = store.item_by_id(jacket.id).await.unwrap().unwrap();

        assert_eq!(stored_buyer.points, 171);
        assert_eq!(stored_seller.points, 150 + 29);
        assert_eq!(stored_seller.successful_exchanges, 6);
        assert_eq!(stored_item.status, ItemStatus::Claimed);
    }

    #[tokio::test]
    async fn test_commit_claim_rejects_second_claim() {
        let store = demo_store().await;
        let mike = user_by_email(&store, "mike@example.com").await;
        let admin = user_by_email(&store, "admin@rewear.com").await;
        let jacket = item_by_title(&store, "Vintage Denim Jacket").await;

        store.commit_claim(mike.id, jacket.id).await.unwrap();
        assert!(matches!(
            store.commit_claim(admin.id, jacket.id).await,
            Err(LedgerError::ItemUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_failed_claim_leaves_state_unchanged() {
        let store = demo_store().await;
        let mut pauper = user_by_email(&store, "mike@example.com").await;
        pauper.points = 28;
        store.update_user(pauper.clone()).await.unwrap();

        let jacket = item_by_title(&store, "Vintage Denim Jacket").await;
        let seller_before = store
            .user_by_id(jacket.uploader_id)
            .await
            .unwrap()
            .unwrap();

        match store.commit_claim(pauper.id, jacket.id).await {
            Err(LedgerError::InsufficientPoints { needed }) => assert_eq!(needed, 1),
            other => panic!("expected InsufficientPoints, got {:?}", other.map(|_| ())),
        }

        let buyer_after = store.user_by_id(pauper.id).await.unwrap().unwrap();
        let seller_after = store
            .user_by_id(jacket.uploader_id)
            .await
            .unwrap()
            .unwrap();
        let item_after = store.item_by_id(jacket.id).await.unwrap().unwrap();

        assert_eq!(buyer_after.points, 28);
        assert_eq!(seller_after.points, seller_before.points);
        assert_eq!(seller_after.successful_exchanges, seller_before.successful_exchanges);
        assert_eq!(item_after.status, ItemStatus::Available);
    }

    #[tokio::test]
    async fn test_commit_claim_unknown_ids() {
        let store = demo_store().await;
        let mike = user_by_email(&store, "mike@example.com").await;
        let jacket = item_by_title(&store, "Vintage Denim Jacket").await;

        assert!(matches!(
            store.commit_claim(mike.id, Uuid::new_v4()).await,
            Err(LedgerError::ItemNotFound)
        ));
        assert!(matches!(
            store.commit_claim(Uuid::new_v4(), jacket.id).await,
            Err(LedgerError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_swap_request_listing_covers_both_directions() {
        let store = demo_store().await;
        let sarah = user_by_email(&store, "sarah@example.com").await;
        let mike = user_by_email(&store, "mike@example.com").await;
        let jacket = item_by_title(&store, "Vintage Denim Jacket").await;

        let request = SwapRequest {
            id: Uuid::new_v4(),
            from_user_id: mike.id,
            to_user_id: sarah.id,
            requested_item_id: jacket.id,
            offered_item_id: None,
            message: Some("Trade for my t-shirt?".to_string()),
            status: crate::models::SwapStatus::Pending,
            created_at: Utc::now(),
        };
        store.insert_swap_request(request.clone()).await.unwrap();

        let for_sender = store.swap_requests_for_user(mike.id).await.unwrap();
        let for_recipient = store.swap_requests_for_user(sarah.id).await.unwrap();
        assert_eq!(for_sender.len(), 1);
        assert_eq!(for_recipient.len(), 1);
        assert_eq!(for_sender[0].id, request.id);

        let admin = user_by_email(&store, "admin@rewear.com").await;
        assert!(store
            .swap_requests_for_user(admin.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_apply_setting_updates_stored_settings() {
        let store = MemoryStore::new();
        assert!(store.settings().await.unwrap().registration_open);

        let updated = store
            .apply_setting(SettingUpdate::RegistrationOpen(false))
            .await
            .unwrap();
        assert!(!updated.registration_open);
        assert!(!store.settings().await.unwrap().registration_open);
    }
}
