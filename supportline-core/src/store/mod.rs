//! Persistence port for chat records.
//!
//! Every record the widget and the agent console touch goes through
//! [`ChatStore`]. Writes are plain upserts; the session assignment rules are
//! applied by the caller before `save_session`, never by the store.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::config::AgentMatchRule;
use crate::error::SupportError;
use crate::models::{
    AgentProfile, CannedMessage, ClientDetail, Session, SessionFilter, SessionSummary, Tag,
    UserAccount, WidgetSettings,
};

pub type StoreResult<T> = Result<T, SupportError>;

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Short description of the backing store, used by `/health`.
    async fn health(&self) -> StoreResult<String>;

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>>;

    async fn session_exists(&self, id: &str) -> StoreResult<bool>;

    /// Insert or replace a session.
    async fn save_session(&self, session: &Session) -> StoreResult<()>;

    /// Direct field update that bypasses the assignment rules.
    /// Returns false if the session does not exist.
    async fn set_visitor_name(&self, id: &str, name: Option<&str>) -> StoreResult<bool>;

    /// Sessions matching `filter`, most recently updated first.
    async fn list_sessions(&self, filter: &SessionFilter) -> StoreResult<Vec<SessionSummary>>;

    async fn get_client(&self, session_id: &str) -> StoreResult<Option<ClientDetail>>;

    /// Insert or replace client details.
    async fn save_client(&self, client: &ClientDetail) -> StoreResult<()>;

    async fn get_agent(&self, user: &str) -> StoreResult<Option<AgentProfile>>;

    /// First profile whose identity matches a message sender.
    async fn find_agent_by_sender(
        &self,
        sender: &str,
        rule: AgentMatchRule,
    ) -> StoreResult<Option<AgentProfile>>;

    /// Insert or replace an agent profile.
    async fn save_agent(&self, agent: &AgentProfile) -> StoreResult<()>;

    async fn list_agents(&self) -> StoreResult<Vec<AgentProfile>>;

    /// Logins of agents currently marked available.
    async fn list_available_agents(&self) -> StoreResult<Vec<String>>;

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserAccount>>;

    async fn save_user(&self, user: &UserAccount) -> StoreResult<()>;

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>>;

    async fn default_canned_messages(&self) -> StoreResult<Vec<CannedMessage>>;

    async fn set_default_canned_messages(&self, messages: &[CannedMessage]) -> StoreResult<()>;

    async fn widget_settings(&self) -> StoreResult<WidgetSettings>;

    async fn save_widget_settings(&self, settings: &WidgetSettings) -> StoreResult<()>;

    /// Tag catalog, ordered by name.
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    /// Add a catalog tag. Returns false if the name is taken.
    async fn create_tag(&self, tag: &Tag) -> StoreResult<bool>;

    /// Returns false if no such tag exists.
    async fn delete_tag(&self, name: &str) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn ChatStore) {}
    }
}
