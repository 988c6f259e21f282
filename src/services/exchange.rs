use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{ArgonVerifier, CredentialVerifier};
use crate::config::Config;
use crate::models::*;
use crate::moderation::decide_approval;
use crate::scoring::calculate_points;
use crate::storage::{FileSessionStore, LedgerStore, MemoryStore, SessionStore};

/// The exchange ledger service: listings, accounts, swap requests, the
/// claim transaction, and global settings, all behind one handle.
///
/// Construct one per process (or per test) and share it; there is no
/// global instance.
pub struct ExchangeService {
    store: Arc<dyn LedgerStore>,
    sessions: Arc<dyn SessionStore>,
    verifier: Arc<dyn CredentialVerifier>,
    current: RwLock<Option<User>>,
}

impl ExchangeService {
    pub async fn new(
        store: Arc<dyn LedgerStore>,
        sessions: Arc<dyn SessionStore>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> LedgerResult<Self> {
        let current = sessions.load().await?;
        if let Some(user) = &current {
            debug!("Restored session for {}", user.email);
        }

        Ok(Self {
            store,
            sessions,
            verifier,
            current: RwLock::new(current),
        })
    }

    /// Standard wiring: in-memory store seeded with the configured
    /// settings, file-backed session snapshot, Argon2 credentials.
    pub async fn from_config(config: &Config) -> LedgerResult<Self> {
        let store = Arc::new(MemoryStore::with_settings(config.settings.clone()));
        let sessions = Arc::new(FileSessionStore::new(&config.session.snapshot_path));
        let verifier = Arc::new(ArgonVerifier);

        Self::new(store, sessions, verifier).await
    }

    // ============= Authentication =============

    /// Register a new member and log them in.
    pub async fn register(&self, req: RegisterRequest) -> LedgerResult<UserPublic> {
        req.validate()
            .map_err(|e| LedgerError::Validation(format!("{}", e)))?;

        let settings = self.store.settings().await?;
        if !settings.registration_open {
            return Err(LedgerError::RegistrationClosed);
        }

        let password_hash = self.verifier.hash_password(&req.password)?;

        let user = User {
            id: Uuid::new_v4(),
            name: req.name,
            email: req.email,
            password_hash,
            city: req.city,
            preferred_sizes: req.preferred_sizes,
            profile_image: req.profile_image,
            role: Role::User,
            points: 0,
            trust_tier: TrustTier::NewMember,
            badges: Vec::new(),
            total_listings: 0,
            successful_exchanges: 0,
            created_at: Utc::now(),
        };

        // Email uniqueness is enforced inside the store's insert.
        self.store.insert_user(user.clone()).await?;
        self.sessions.save(&user).await?;
        *self.current.write().await = Some(user.clone());

        info!("Registered new member {} ({})", user.name, user.email);
        Ok(user.into())
    }

    /// Log in with email and password. Failures are uniform so callers
    /// cannot distinguish an unknown address from a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> LedgerResult<UserPublic> {
        let user = self
            .store
            .user_by_email(email)
            .await?
            .ok_or(LedgerError::InvalidCredentials)?;

        if !self.verifier.verify_password(password, &user.password_hash)? {
            return Err(LedgerError::InvalidCredentials);
        }

        self.sessions.save(&user).await?;
        *self.current.write().await = Some(user.clone());

        info!("Login for {}", user.email);
        Ok(user.into())
    }

    /// Log out the current session, removing the persisted snapshot.
    pub async fn logout(&self) -> LedgerResult<()> {
        let previous = self.current.write().await.take();
        self.sessions.clear().await?;

        if let Some(user) = previous {
            info!("Logout for {}", user.email);
        }
        Ok(())
    }

    /// The currently logged-in user, if any.
    pub async fn current_user(&self) -> Option<UserPublic> {
        self.current.read().await.clone().map(UserPublic::from)
    }

    /// Any user's public profile.
    pub async fn user_profile(&self, user_id: Uuid) -> LedgerResult<UserPublic> {
        self.store
            .user_by_id(user_id)
            .await?
            .map(UserPublic::from)
            .ok_or(LedgerError::UserNotFound)
    }

    // ============= Listings =============

    /// Create a listing owned by the logged-in user. The point value is
    /// computed here, once, and never recomputed afterwards.
    pub async fn add_item(&self, req: NewItemRequest) -> LedgerResult<ClothingItem> {
        req.validate()
            .map_err(|e| LedgerError::Validation(format!("{}", e)))?;

        let uploader = self.session_user().await?;
        let settings = self.store.settings().await?;

        let approved = decide_approval(uploader.role, &settings, &req);
        let point_value = calculate_points(&req.category, req.condition, &req.size, req.fit_type);

        let item = ClothingItem {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            category: req.category,
            item_type: req.item_type,
            size: req.size,
            condition: req.condition,
            fit_type: req.fit_type,
            tags: req.tags,
            images: req.images,
            uploader_id: uploader.id,
            uploader_name: uploader.name.clone(),
            status: ItemStatus::Available,
            point_value,
            approved,
            created_at: Utc::now(),
        };

        // The insert and the uploader's listing credit are one store
        // transaction.
        let uploader = self.store.commit_listing(item.clone()).await?;
        self.sync_current_cache(&uploader).await;

        info!(
            "New listing '{}' worth {} points ({})",
            item.title,
            item.point_value,
            if approved { "approved" } else { "pending review" }
        );
        Ok(item)
    }

    /// Approved listings, filtered and sorted for the browse view.
    pub async fn list_items(
        &self,
        filters: &ItemFilters,
        sort: ItemSort,
    ) -> LedgerResult<Vec<ClothingItem>> {
        let mut items: Vec<ClothingItem> = self
            .store
            .items()
            .await?
            .into_iter()
            .filter(|item| item.approved && filters.matches(item))
            .collect();

        sort.apply(&mut items);
        Ok(items)
    }

    pub async fn get_item(&self, item_id: Uuid) -> LedgerResult<ClothingItem> {
        self.store
            .item_by_id(item_id)
            .await?
            .ok_or(LedgerError::ItemNotFound)
    }

    /// All of one uploader's listings, newest first, approved or not.
    pub async fn user_items(&self, user_id: Uuid) -> LedgerResult<Vec<ClothingItem>> {
        let mut items: Vec<ClothingItem> = self
            .store
            .items()
            .await?
            .into_iter()
            .filter(|item| item.uploader_id == user_id)
            .collect();

        ItemSort::Newest.apply(&mut items);
        Ok(items)
    }

    /// The full catalog for the moderation queue, unapproved included.
    pub async fn admin_items(&self, acting_user_id: Uuid) -> LedgerResult<Vec<ClothingItem>> {
        self.require_admin(acting_user_id).await?;

        let mut items = self.store.items().await?;
        ItemSort::Newest.apply(&mut items);
        Ok(items)
    }

    /// Flip a held listing to approved. Idempotent.
    pub async fn approve_item(
        &self,
        acting_user_id: Uuid,
        item_id: Uuid,
    ) -> LedgerResult<ClothingItem> {
        self.require_admin(acting_user_id).await?;

        let mut item = self.get_item(item_id).await?;
        if !item.approved {
            item.approved = true;
            self.store.update_item(item.clone()).await?;
            info!("Listing '{}' approved", item.title);
        }
        Ok(item)
    }

    /// Remove a listing. Owners can remove their own, administrators
    /// anyone's; claimed items stay on the books.
    pub async fn delete_item(&self, acting_user_id: Uuid, item_id: Uuid) -> LedgerResult<()> {
        let acting = self
            .store
            .user_by_id(acting_user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)?;
        let item = self.get_item(item_id).await?;

        if item.uploader_id != acting.id && !acting.is_admin() {
            return Err(LedgerError::NotAuthorized);
        }
        if !item.is_available() {
            return Err(LedgerError::ItemUnavailable);
        }

        self.store.delete_item(item_id).await?;
        info!("Listing '{}' removed", item.title);
        Ok(())
    }

    // ============= Claim =============

    /// Spend points to claim a listing. All record updates happen as one
    /// storage transaction; when the acting user is the logged-in user,
    /// the session snapshot is refreshed with the new balance.
    pub async fn claim_item(
        &self,
        acting_user_id: Uuid,
        item_id: Uuid,
    ) -> LedgerResult<ClaimReceipt> {
        let receipt = self.store.commit_claim(acting_user_id, item_id).await?;

        self.sync_current_cache(&receipt.buyer).await;
        self.sync_current_cache(&receipt.seller).await;

        let buyer_is_session = self
            .current
            .read()
            .await
            .as_ref()
            .map_or(false, |user| user.id == receipt.buyer.id);
        if buyer_is_session {
            self.sessions.save(&receipt.buyer).await?;
        }

        info!(
            "'{}' claimed for {} points by {}",
            receipt.item.title, receipt.item.point_value, receipt.buyer.name
        );
        Ok(receipt)
    }

    // ============= Swap requests =============

    /// Propose a swap for someone else's available listing. The
    /// recipient is derived from the requested item's uploader.
    pub async fn create_swap_request(&self, req: NewSwapRequest) -> LedgerResult<SwapRequest> {
        let sender = self.session_user().await?;
        let item = self.get_item(req.requested_item_id).await?;

        if item.uploader_id == sender.id {
            return Err(LedgerError::Validation(
                "Cannot request a swap for your own listing".to_string(),
            ));
        }
        if !item.is_available() {
            return Err(LedgerError::ItemUnavailable);
        }
        if let Some(offered_id) = req.offered_item_id {
            let offered = self.get_item(offered_id).await?;
            if offered.uploader_id != sender.id {
                return Err(LedgerError::Validation(
                    "Offered item must be one of your own listings".to_string(),
                ));
            }
        }

        let request = SwapRequest {
            id: Uuid::new_v4(),
            from_user_id: sender.id,
            to_user_id: item.uploader_id,
            requested_item_id: item.id,
            offered_item_id: req.offered_item_id,
            message: req.message,
            status: SwapStatus::Pending,
            created_at: Utc::now(),
        };

        self.store.insert_swap_request(request.clone()).await?;
        info!(
            "Swap request for '{}' sent to {}",
            item.title, item.uploader_name
        );
        Ok(request)
    }

    /// Requests involving a user, as sender or recipient, newest first.
    pub async fn swap_requests_for(&self, user_id: Uuid) -> LedgerResult<Vec<SwapRequest>> {
        self.store.swap_requests_for_user(user_id).await
    }

    /// Accept or reject a pending request. Only the recipient may
    /// answer, and only once.
    pub async fn respond_to_swap_request(
        &self,
        acting_user_id: Uuid,
        request_id: Uuid,
        decision: SwapDecision,
    ) -> LedgerResult<SwapRequest> {
        let mut request = self
            .store
            .swap_request_by_id(request_id)
            .await?
            .ok_or(LedgerError::SwapRequestNotFound)?;

        if request.to_user_id != acting_user_id {
            return Err(LedgerError::NotAuthorized);
        }
        if !request.is_pending() {
            return Err(LedgerError::Validation(
                "Swap request has already been answered".to_string(),
            ));
        }

        request.status = match decision {
            SwapDecision::Accept => SwapStatus::Accepted,
            SwapDecision::Reject => SwapStatus::Rejected,
        };

        self.store.update_swap_request(request.clone()).await?;
        Ok(request)
    }

    // ============= Settings and stats =============

    pub async fn settings(&self) -> LedgerResult<LedgerSettings> {
        self.store.settings().await
    }

    pub async fn is_maintenance_mode(&self) -> LedgerResult<bool> {
        Ok(self.store.settings().await?.maintenance_mode)
    }

    /// Change one global setting. Administrator only.
    pub async fn update_setting(
        &self,
        acting_user_id: Uuid,
        update: SettingUpdate,
    ) -> LedgerResult<LedgerSettings> {
        self.require_admin(acting_user_id).await?;

        let settings = self.store.apply_setting(update).await?;

        info!("Marketplace settings updated");
        Ok(settings)
    }

    /// Dashboard counters over the whole catalog. Administrator only.
    pub async fn marketplace_stats(&self, acting_user_id: Uuid) -> LedgerResult<MarketplaceStats> {
        self.require_admin(acting_user_id).await?;

        let items = self.store.items().await?;
        let mut items_per_category: HashMap<String, usize> = HashMap::new();
        for item in &items {
            *items_per_category.entry(item.category.clone()).or_insert(0) += 1;
        }

        Ok(MarketplaceStats {
            total_items: items.len(),
            pending_approval: items.iter().filter(|item| !item.approved).count(),
            registered_users: self.store.user_count().await?,
            points_in_circulation: items.iter().map(|item| item.point_value).sum(),
            items_per_category,
        })
    }

    // ============= Internals =============

    /// Resolve the session identity to its live record; counters in the
    /// cached snapshot may be stale.
    async fn session_user(&self) -> LedgerResult<User> {
        let cached = self
            .current
            .read()
            .await
            .clone()
            .ok_or(LedgerError::NotAuthenticated)?;

        self.store
            .user_by_id(cached.id)
            .await?
            .ok_or(LedgerError::UserNotFound)
    }

    async fn require_admin(&self, user_id: Uuid) -> LedgerResult<User> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)?;

        if !user.is_admin() {
            return Err(LedgerError::NotAuthorized);
        }
        Ok(user)
    }

    async fn sync_current_cache(&self, user: &User) {
        let mut current = self.current.write().await;
        if current.as_ref().map_or(false, |cached| cached.id == user.id) {
            *current = Some(user.clone());
        }
    }
}
