//! Approval decision applied to every new listing before it becomes
//! publicly visible.

use crate::models::{LedgerSettings, ModerationMode, NewItemRequest, Role};

/// Decide whether a new listing is approved immediately or held for
/// manual review. Admin uploads bypass review when the corresponding
/// setting is on; otherwise the decision follows the moderation mode.
pub fn decide_approval(role: Role, settings: &LedgerSettings, request: &NewItemRequest) -> bool {
    if role == Role::Admin && settings.auto_approve_admin_items {
        return true;
    }

    match settings.content_moderation {
        ModerationMode::Automatic => !is_flagged(request),
        ModerationMode::Manual => false,
    }
}

// Placeholder for a real screening pass. Automatic mode currently
// approves everything it sees.
fn is_flagged(_request: &NewItemRequest) -> bool {
    false
}
