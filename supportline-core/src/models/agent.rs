use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AgentMatchRule;
use crate::error::SupportError;

/// Accounts that never get an agent profile.
pub const RESERVED_USERS: [&str; 2] = ["Guest", "Administrator"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedMessage {
    #[serde(alias = "hotWord")]
    pub hot_word: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AgentProfile {
    /// Login of the linked user account.
    #[sqlx(rename = "user_id")]
    pub user: String,
    pub agent_name: Option<String>,
    pub agent_display_name: Option<String>,
    pub enabled: bool,
    pub is_available: bool,
    pub is_admin: bool,
    #[sqlx(json)]
    pub canned_messages: Vec<CannedMessage>,
}

impl AgentProfile {
    pub fn new(user: impl Into<String>, agent_name: Option<String>) -> Self {
        Self {
            user: user.into(),
            agent_name,
            agent_display_name: None,
            enabled: true,
            is_available: false,
            is_admin: false,
            canned_messages: Vec::new(),
        }
    }

    pub fn matches_sender(&self, sender: &str, rule: AgentMatchRule) -> bool {
        let by_display = self.agent_display_name.as_deref() == Some(sender);
        match rule {
            AgentMatchRule::DisplayName => by_display,
            AgentMatchRule::DisplayNameOrLogin => by_display || self.user == sender,
        }
    }

    pub fn set_canned_messages(&mut self, messages: Vec<CannedMessage>) {
        self.canned_messages = messages;
    }

    pub fn apply(&mut self, update: AgentProfileUpdate) {
        if let Some(name) = update.agent_name {
            self.agent_name = Some(name);
        }
        if let Some(display) = update.agent_display_name {
            self.agent_display_name = Some(display);
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(available) = update.is_available {
            self.is_available = available;
        }
        if let Some(admin) = update.is_admin {
            self.is_admin = admin;
        }
    }
}

/// Partial update sent by the agent console.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentProfileUpdate {
    pub agent_name: Option<String>,
    pub agent_display_name: Option<String>,
    pub enabled: Option<bool>,
    pub is_available: Option<bool>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAccount {
    pub id: String,
    pub full_name: Option<String>,
    pub enabled: bool,
}

impl UserAccount {
    /// Bring the account's enabled flag in line with the profile.
    /// Returns whether the account changed.
    pub fn mirror_profile(&mut self, profile: &AgentProfile) -> bool {
        if self.enabled == profile.enabled {
            return false;
        }
        self.enabled = profile.enabled;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedScope {
    Personal,
    Default,
}

impl FromStr for CannedScope {
    type Err = SupportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(CannedScope::Personal),
            "default" => Ok(CannedScope::Default),
            other => Err(SupportError::InvalidRequest(format!(
                "unknown canned message scope '{}'",
                other
            ))),
        }
    }
}
