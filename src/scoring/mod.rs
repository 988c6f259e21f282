//! Point valuation and trust tier progression.
//!
//! Both functions here are pure: valuation depends only on the listing's
//! attributes, and tier derivation depends only on a user's cumulative
//! counters. Everything stateful lives in the service layer.

use crate::models::{Condition, FitType, TrustTier, User};

/// Every listing is worth at least this many points regardless of its
/// attribute combination.
pub const MIN_POINT_VALUE: i64 = 5;

/// Compute the point value of a listing from its category, condition,
/// size, and fit type. Deterministic and side-effect free.
pub fn calculate_points(category: &str, condition: Condition, size: &str, fit_type: FitType) -> i64 {
    let total = base_points(category)
        + condition_bonus(condition)
        + size_modifier(size)
        + fit_modifier(fit_type);

    total.max(MIN_POINT_VALUE)
}

fn base_points(category: &str) -> i64 {
    match category {
        "Outerwear" | "Winterwear" => 22,
        "Footwear" => 18,
        "Dresses" => 15,
        "Bottoms" | "Tops" => 12,
        "Accessories" => 8,
        _ => 10,
    }
}

fn condition_bonus(condition: Condition) -> i64 {
    match condition {
        Condition::New => 10,
        Condition::LikeNew => 8,
        Condition::Good => 7,
        Condition::Fair => 5,
    }
}

fn size_modifier(size: &str) -> i64 {
    match size {
        "XXS" | "XXXS" => 2,
        "XXL" => 1,
        "XXXL" => 2,
        "Kids 2-3" | "Kids 4-5" => -2,
        "Kids 6-7" => -1,
        _ => 0,
    }
}

fn fit_modifier(fit_type: FitType) -> i64 {
    match fit_type {
        FitType::Standard => 0,
        FitType::Plus | FitType::Petite => 1,
        FitType::Kids => -2,
    }
}

/// Derive the tier a user's counters have earned. Returns `NewMember`
/// when no threshold has been reached yet; callers must never use that
/// to downgrade an already higher tier.
pub fn tier_for(total_listings: u32, successful_exchanges: u32) -> TrustTier {
    if successful_exchanges >= 10 && total_listings >= 5 {
        TrustTier::SuperSwapper
    } else if successful_exchanges >= 3 && total_listings >= 2 {
        TrustTier::TrustedGiver
    } else if total_listings >= 1 {
        TrustTier::BasicGiver
    } else {
        TrustTier::NewMember
    }
}

/// The badge awarded on first reaching a tier, if the tier carries one.
pub fn badge_for(tier: TrustTier) -> Option<&'static str> {
    match tier {
        TrustTier::SuperSwapper => Some("Super Swapper"),
        TrustTier::TrustedGiver => Some("Trusted Giver"),
        TrustTier::BasicGiver => Some("First Listing"),
        TrustTier::NewMember => None,
    }
}

/// Re-derive a user's tier from their counters and promote them if the
/// earned tier is higher than the current one. Tiers only move forward,
/// and each tier's badge is appended at most once.
pub fn progress_user(user: &mut User) {
    let earned = tier_for(user.total_listings, user.successful_exchanges);
    if earned > user.trust_tier {
        user.trust_tier = earned;
    }

    if let Some(badge) = badge_for(earned) {
        if !user.badges.iter().any(|existing| existing == badge) {
            user.badges.push(badge.to_string());
        }
    }
}
