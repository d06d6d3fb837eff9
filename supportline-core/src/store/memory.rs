//! In-memory [`ChatStore`] for tests and single-process deployments.
//! Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChatStore, StoreResult};
use crate::config::AgentMatchRule;
use crate::models::{
    AgentProfile, CannedMessage, ClientDetail, Session, SessionFilter, SessionSummary, Tag,
    UserAccount, WidgetSettings,
};

#[derive(Default)]
struct State {
    sessions: HashMap<String, Session>,
    clients: HashMap<String, ClientDetail>,
    agents: Vec<AgentProfile>,
    users: Vec<UserAccount>,
    default_canned: Vec<CannedMessage>,
    widget: WidgetSettings,
    tags: BTreeMap<String, Tag>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_widget_settings(settings: WidgetSettings) -> Self {
        Self {
            state: RwLock::new(State {
                widget: settings,
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn health(&self) -> StoreResult<String> {
        let state = self.state.read().await;
        Ok(format!("in-memory ({} sessions)", state.sessions.len()))
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        Ok(self.state.read().await.sessions.get(id).cloned())
    }

    async fn session_exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.state.read().await.sessions.contains_key(id))
    }

    async fn save_session(&self, session: &Session) -> StoreResult<()> {
        self.state
            .write()
            .await
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn set_visitor_name(&self, id: &str, name: Option<&str>) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.sessions.get_mut(id) {
            Some(session) => {
                session.visitor_name = name.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> StoreResult<Vec<SessionSummary>> {
        let state = self.state.read().await;
        let mut rows: Vec<SessionSummary> = state
            .sessions
            .values()
            .map(Session::summary)
            .filter(|s| filter.matches(s))
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn get_client(&self, session_id: &str) -> StoreResult<Option<ClientDetail>> {
        Ok(self.state.read().await.clients.get(session_id).cloned())
    }

    async fn save_client(&self, client: &ClientDetail) -> StoreResult<()> {
        self.state
            .write()
            .await
            .clients
            .insert(client.session_id.clone(), client.clone());
        Ok(())
    }

    async fn get_agent(&self, user: &str) -> StoreResult<Option<AgentProfile>> {
        let state = self.state.read().await;
        Ok(state.agents.iter().find(|a| a.user == user).cloned())
    }

    async fn find_agent_by_sender(
        &self,
        sender: &str,
        rule: AgentMatchRule,
    ) -> StoreResult<Option<AgentProfile>> {
        let state = self.state.read().await;
        Ok(state
            .agents
            .iter()
            .find(|a| a.matches_sender(sender, rule))
            .cloned())
    }

    async fn save_agent(&self, agent: &AgentProfile) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.agents.iter_mut().find(|a| a.user == agent.user) {
            Some(existing) => *existing = agent.clone(),
            None => state.agents.push(agent.clone()),
        }
        Ok(())
    }

    async fn list_agents(&self) -> StoreResult<Vec<AgentProfile>> {
        Ok(self.state.read().await.agents.clone())
    }

    async fn list_available_agents(&self) -> StoreResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .agents
            .iter()
            .filter(|a| a.is_available)
            .map(|a| a.user.clone())
            .collect())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserAccount>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn save_user(&self, user: &UserAccount) -> StoreResult<()> {
        let mut state = self.state.write().await;
        match state.users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => state.users.push(user.clone()),
        }
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        Ok(self.state.read().await.users.clone())
    }

    async fn default_canned_messages(&self) -> StoreResult<Vec<CannedMessage>> {
        Ok(self.state.read().await.default_canned.clone())
    }

    async fn set_default_canned_messages(&self, messages: &[CannedMessage]) -> StoreResult<()> {
        self.state.write().await.default_canned = messages.to_vec();
        Ok(())
    }

    async fn widget_settings(&self) -> StoreResult<WidgetSettings> {
        Ok(self.state.read().await.widget.clone())
    }

    async fn save_widget_settings(&self, settings: &WidgetSettings) -> StoreResult<()> {
        self.state.write().await.widget = settings.clone();
        Ok(())
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self.state.read().await.tags.values().cloned().collect())
    }

    async fn create_tag(&self, tag: &Tag) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.tags.contains_key(&tag.name) {
            return Ok(false);
        }
        state.tags.insert(tag.name.clone(), tag.clone());
        Ok(true)
    }

    async fn delete_tag(&self, name: &str) -> StoreResult<bool> {
        Ok(self.state.write().await.tags.remove(name).is_some())
    }
}
