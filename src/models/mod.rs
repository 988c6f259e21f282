use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Administrator access required")]
    NotAuthorized,

    #[error("Registration is currently closed")]
    RegistrationClosed,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Item not found")]
    ItemNotFound,

    #[error("Swap request not found")]
    SwapRequestNotFound,

    #[error("Item is not available")]
    ItemUnavailable,

    #[error("Insufficient points: {needed} more needed")]
    InsufficientPoints { needed: i64 },

    #[error("Cannot claim your own item")]
    SelfClaim,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session error: {0}")]
    Session(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Reputation level derived from cumulative listing and exchange counts.
/// The variant order is the progression order; tiers never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrustTier {
    #[serde(rename = "New Member")]
    NewMember,
    #[serde(rename = "Basic Giver")]
    BasicGiver,
    #[serde(rename = "Trusted Giver")]
    TrustedGiver,
    #[serde(rename = "Super Swapper")]
    SuperSwapper,
}

impl TrustTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::NewMember => "New Member",
            TrustTier::BasicGiver => "Basic Giver",
            TrustTier::TrustedGiver => "Trusted Giver",
            TrustTier::SuperSwapper => "Super Swapper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Fair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitType {
    Standard,
    Plus,
    Petite,
    Kids,
}

/// Listing lifecycle. Only the states an operation can actually produce
/// are part of the domain: a listing starts `Available` and the claim
/// transaction moves it to `Claimed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationMode {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub city: String,
    pub preferred_sizes: Vec<String>,
    pub profile_image: Option<String>,
    pub role: Role,
    pub points: i64,
    pub trust_tier: TrustTier,
    pub badges: Vec<String>,
    pub total_listings: u32,
    pub successful_exchanges: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClothingItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub item_type: String,
    pub size: String,
    pub condition: Condition,
    pub fit_type: FitType,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub uploader_id: Uuid,
    pub uploader_name: String,
    pub status: ItemStatus,
    pub point_value: i64,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl ClothingItem {
    pub fn is_available(&self) -> bool {
        matches!(self.status, ItemStatus::Available)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: Uuid,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub requested_item_id: Uuid,
    pub offered_item_id: Option<Uuid>,
    pub message: Option<String>,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
}

impl SwapRequest {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, SwapStatus::Pending)
    }
}

/// Global marketplace settings, runtime-mutable by administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    pub auto_approve_admin_items: bool,
    pub content_moderation: ModerationMode,
    pub registration_open: bool,
    pub maintenance_mode: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            auto_approve_admin_items: true,
            content_moderation: ModerationMode::Manual,
            registration_open: true,
            maintenance_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SettingUpdate {
    AutoApproveAdminItems(bool),
    ContentModeration(ModerationMode),
    RegistrationOpen(bool),
    MaintenanceMode(bool),
}

impl LedgerSettings {
    pub fn apply(&mut self, update: SettingUpdate) {
        match update {
            SettingUpdate::AutoApproveAdminItems(value) => self.auto_approve_admin_items = value,
            SettingUpdate::ContentModeration(mode) => self.content_moderation = mode,
            SettingUpdate::RegistrationOpen(value) => self.registration_open = value,
            SettingUpdate::MaintenanceMode(value) => self.maintenance_mode = value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub city: String,

    #[serde(default)]
    pub preferred_sizes: Vec<String>,

    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,

    #[validate(length(min = 1, max = 2000))]
    pub description: String,

    #[validate(length(min = 1))]
    pub category: String,

    pub item_type: String,

    #[validate(length(min = 1))]
    pub size: String,

    pub condition: Condition,

    pub fit_type: FitType,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSwapRequest {
    pub requested_item_id: Uuid,
    pub offered_item_id: Option<Uuid>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapDecision {
    Accept,
    Reject,
}

/// Filters applied to the public listing view. All fields are optional;
/// an empty filter matches every approved item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilters {
    pub search: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub condition: Option<Condition>,
}

impl ItemFilters {
    /// Check whether an item satisfies every active filter. The search
    /// term matches case-insensitively against title, description, and tags.
    pub fn matches(&self, item: &ClothingItem) -> bool {
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_title = item.title.to_lowercase().contains(&term);
            let in_description = item.description.to_lowercase().contains(&term);
            let in_tags = item.tags.iter().any(|tag| tag.to_lowercase().contains(&term));
            if !in_title && !in_description && !in_tags {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }

        if let Some(size) = &self.size {
            if &item.size != size {
                return false;
            }
        }

        if let Some(condition) = self.condition {
            if item.condition != condition {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSort {
    Newest,
    Oldest,
    PointsLowToHigh,
    PointsHighToLow,
    Title,
}

impl Default for ItemSort {
    fn default() -> Self {
        ItemSort::Newest
    }
}

impl ItemSort {
    pub fn apply(self, items: &mut [ClothingItem]) {
        match self {
            ItemSort::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            ItemSort::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            ItemSort::PointsLowToHigh => items.sort_by_key(|item| item.point_value),
            ItemSort::PointsHighToLow => items.sort_by(|a, b| b.point_value.cmp(&a.point_value)),
            ItemSort::Title => items.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }
}

/// Post-commit snapshots of the three records a claim touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub buyer: User,
    pub seller: User,
    pub item: ClothingItem,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceStats {
    pub total_items: usize,
    pub pending_approval: usize,
    pub registered_users: usize,
    pub points_in_circulation: i64,
    pub items_per_category: HashMap<String, usize>,
}

/// User record with the credential material stripped, safe to hand to
/// rendering surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub city: String,
    pub preferred_sizes: Vec<String>,
    pub profile_image: Option<String>,
    pub role: Role,
    pub points: i64,
    pub trust_tier: TrustTier,
    pub badges: Vec<String>,
    pub total_listings: u32,
    pub successful_exchanges: u32,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            city: user.city,
            preferred_sizes: user.preferred_sizes,
            profile_image: user.profile_image,
            role: user.role,
            points: user.points,
            trust_tier: user.trust_tier,
            badges: user.badges,
            total_listings: user.total_listings,
            successful_exchanges: user.successful_exchanges,
            created_at: user.created_at,
        }
    }
}
