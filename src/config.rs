use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{LedgerSettings, ModerationMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    pub settings: LedgerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Where the logged-in user snapshot is kept between runs.
    pub snapshot_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            session: SessionConfig {
                snapshot_path: std::env::var("SESSION_SNAPSHOT_PATH")
                    .unwrap_or_else(|_| "current_user.json".to_string()),
            },
            settings: LedgerSettings {
                auto_approve_admin_items: std::env::var("AUTO_APPROVE_ADMIN_ITEMS")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                content_moderation: moderation_mode_from(
                    &std::env::var("CONTENT_MODERATION")
                        .unwrap_or_else(|_| "manual".to_string()),
                ),
                registration_open: std::env::var("REGISTRATION_OPEN")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                maintenance_mode: std::env::var("MAINTENANCE_MODE")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
            },
        })
    }
}

fn moderation_mode_from(value: &str) -> ModerationMode {
    match value.to_lowercase().as_str() {
        "automatic" => ModerationMode::Automatic,
        _ => ModerationMode::Manual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_mode_parsing() {
        assert_eq!(moderation_mode_from("automatic"), ModerationMode::Automatic);
        assert_eq!(moderation_mode_from("AUTOMATIC"), ModerationMode::Automatic);
        assert_eq!(moderation_mode_from("manual"), ModerationMode::Manual);
        assert_eq!(moderation_mode_from("anything-else"), ModerationMode::Manual);
    }
}
