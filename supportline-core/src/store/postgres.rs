//! PostgreSQL implementation of [`ChatStore`].
//!
//! List-valued fields (messages, assignment history, tags, canned messages,
//! allow-lists) are stored as JSONB columns on their owning row.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{ChatStore, StoreResult};
use crate::config::AgentMatchRule;
use crate::models::{
    AgentProfile, CannedMessage, ClientDetail, Session, SessionFilter, SessionSummary, Tag,
    UserAccount, WidgetSettings,
};

const SESSION_COLUMNS: &str = "id, messages, current_assignee, agent_name, first_response_at, \
     resolved, ratings, feedback, ratings_given_to, assignment_history, visitor_name, \
     last_message_by, last_message, last_message_at, tags, created_at, updated_at";

const AGENT_COLUMNS: &str =
    "user_id, agent_name, agent_display_name, enabled, is_available, is_admin, canned_messages";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    widget_seed: WidgetSettings,
}

impl PgStore {
    /// `widget_seed` is written as the widget settings row if none exists
    /// and returned whenever the row is missing.
    pub fn new(pool: PgPool, widget_seed: WidgetSettings) -> Self {
        Self { pool, widget_seed }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the schema and seed singleton rows.
    pub async fn prepare(&self) -> StoreResult<()> {
        crate::db::ensure_schema(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO widget_settings (id, welcome_message, returning_message, allowed_origins, restricted_paths)
            VALUES (1, $1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&self.widget_seed.welcome_message)
        .bind(&self.widget_seed.returning_message)
        .bind(Json(&self.widget_seed.allowed_origins))
        .bind(Json(&self.widget_seed.restricted_paths))
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "INSERT INTO default_canned_messages (id, canned_messages) VALUES (1, '[]'::jsonb) ON CONFLICT (id) DO NOTHING",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn health(&self) -> StoreResult<String> {
        Ok(crate::db::health_check(&self.pool).await?)
    }

    async fn get_session(&self, id: &str) -> StoreResult<Option<Session>> {
        let sql = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let row = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn session_exists(&self, id: &str) -> StoreResult<bool> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM sessions WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    async fn save_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id, messages, current_assignee, agent_name, first_response_at,
                resolved, ratings, feedback, ratings_given_to, assignment_history,
                visitor_name, last_message_by, last_message, last_message_at, tags, created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                messages = EXCLUDED.messages,
                current_assignee = EXCLUDED.current_assignee,
                agent_name = EXCLUDED.agent_name,
                first_response_at = EXCLUDED.first_response_at,
                resolved = EXCLUDED.resolved,
                ratings = EXCLUDED.ratings,
                feedback = EXCLUDED.feedback,
                ratings_given_to = EXCLUDED.ratings_given_to,
                assignment_history = EXCLUDED.assignment_history,
                visitor_name = EXCLUDED.visitor_name,
                last_message_by = EXCLUDED.last_message_by,
                last_message = EXCLUDED.last_message,
                last_message_at = EXCLUDED.last_message_at,
                tags = EXCLUDED.tags,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&session.id)
        .bind(Json(&session.messages))
        .bind(&session.current_assignee)
        .bind(&session.agent_name)
        .bind(session.first_response_at)
        .bind(session.resolved)
        .bind(session.ratings)
        .bind(&session.feedback)
        .bind(&session.ratings_given_to)
        .bind(Json(&session.assignment_history))
        .bind(&session.visitor_name)
        .bind(&session.last_message_by)
        .bind(&session.last_message)
        .bind(&session.last_message_at)
        .bind(Json(&session.tags))
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_visitor_name(&self, id: &str, name: Option<&str>) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE sessions SET visitor_name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> StoreResult<Vec<SessionSummary>> {
        let rows = sqlx::query_as::<_, SessionSummary>(
            r#"
            SELECT id, visitor_name, current_assignee, agent_name, resolved,
                   last_message_by, last_message, last_message_at, tags, created_at, updated_at
            FROM sessions
            WHERE ($1::BOOLEAN IS NULL OR resolved = $1)
              AND ($2::TEXT IS NULL OR current_assignee = $2)
              AND ($3 OR COALESCE(last_message, '') <> '')
            ORDER BY updated_at DESC, id
            "#,
        )
        .bind(filter.resolved)
        .bind(&filter.assignee)
        .bind(filter.include_empty)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_client(&self, session_id: &str) -> StoreResult<Option<ClientDetail>> {
        let row = sqlx::query_as::<_, ClientDetail>(
            r#"
            SELECT session_id, ip_address, operating_system, referrer, accuracy, longitude,
                   latitude, name, email_address, contact_number
            FROM client_details WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_client(&self, client: &ClientDetail) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO client_details (
                session_id, ip_address, operating_system, referrer, accuracy, longitude,
                latitude, name, email_address, contact_number
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (session_id) DO UPDATE SET
                ip_address = EXCLUDED.ip_address,
                operating_system = EXCLUDED.operating_system,
                referrer = EXCLUDED.referrer,
                accuracy = EXCLUDED.accuracy,
                longitude = EXCLUDED.longitude,
                latitude = EXCLUDED.latitude,
                name = EXCLUDED.name,
                email_address = EXCLUDED.email_address,
                contact_number = EXCLUDED.contact_number
            "#,
        )
        .bind(&client.session_id)
        .bind(&client.ip_address)
        .bind(&client.operating_system)
        .bind(&client.referrer)
        .bind(client.accuracy)
        .bind(client.longitude)
        .bind(client.latitude)
        .bind(&client.name)
        .bind(&client.email_address)
        .bind(&client.contact_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_agent(&self, user: &str) -> StoreResult<Option<AgentProfile>> {
        let sql = format!("SELECT {} FROM agent_profiles WHERE user_id = $1", AGENT_COLUMNS);
        let row = sqlx::query_as::<_, AgentProfile>(&sql)
            .bind(user)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_agent_by_sender(
        &self,
        sender: &str,
        rule: AgentMatchRule,
    ) -> StoreResult<Option<AgentProfile>> {
        let filter = match rule {
            AgentMatchRule::DisplayName => "agent_display_name = $1",
            AgentMatchRule::DisplayNameOrLogin => "agent_display_name = $1 OR user_id = $1",
        };
        let sql = format!(
            "SELECT {} FROM agent_profiles WHERE {} ORDER BY user_id LIMIT 1",
            AGENT_COLUMNS, filter
        );
        let row = sqlx::query_as::<_, AgentProfile>(&sql)
            .bind(sender)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn save_agent(&self, agent: &AgentProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_profiles (
                user_id, agent_name, agent_display_name, enabled, is_available, is_admin, canned_messages
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                agent_name = EXCLUDED.agent_name,
                agent_display_name = EXCLUDED.agent_display_name,
                enabled = EXCLUDED.enabled,
                is_available = EXCLUDED.is_available,
                is_admin = EXCLUDED.is_admin,
                canned_messages = EXCLUDED.canned_messages
            "#,
        )
        .bind(&agent.user)
        .bind(&agent.agent_name)
        .bind(&agent.agent_display_name)
        .bind(agent.enabled)
        .bind(agent.is_available)
        .bind(agent.is_admin)
        .bind(Json(&agent.canned_messages))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_agents(&self) -> StoreResult<Vec<AgentProfile>> {
        let sql = format!("SELECT {} FROM agent_profiles ORDER BY user_id", AGENT_COLUMNS);
        let rows = sqlx::query_as::<_, AgentProfile>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_available_agents(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT user_id FROM agent_profiles WHERE is_available ORDER BY user_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserAccount>(
            "SELECT id, full_name, enabled FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_user(&self, user: &UserAccount) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, enabled) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, enabled = EXCLUDED.enabled
            "#,
        )
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(user.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let rows = sqlx::query_as::<_, UserAccount>(
            "SELECT id, full_name, enabled FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn default_canned_messages(&self) -> StoreResult<Vec<CannedMessage>> {
        let row: Option<(Json<Vec<CannedMessage>>,)> =
            sqlx::query_as("SELECT canned_messages FROM default_canned_messages WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0 .0).unwrap_or_default())
    }

    async fn set_default_canned_messages(&self, messages: &[CannedMessage]) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO default_canned_messages (id, canned_messages) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET canned_messages = EXCLUDED.canned_messages
            "#,
        )
        .bind(Json(messages))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn widget_settings(&self) -> StoreResult<WidgetSettings> {
        let row = sqlx::query_as::<_, WidgetSettings>(
            r#"
            SELECT welcome_message, returning_message, allowed_origins, restricted_paths
            FROM widget_settings WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.unwrap_or_else(|| self.widget_seed.clone()))
    }

    async fn save_widget_settings(&self, settings: &WidgetSettings) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO widget_settings (id, welcome_message, returning_message, allowed_origins, restricted_paths)
            VALUES (1, $1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                welcome_message = EXCLUDED.welcome_message,
                returning_message = EXCLUDED.returning_message,
                allowed_origins = EXCLUDED.allowed_origins,
                restricted_paths = EXCLUDED.restricted_paths
            "#,
        )
        .bind(&settings.welcome_message)
        .bind(&settings.returning_message)
        .bind(Json(&settings.allowed_origins))
        .bind(Json(&settings.restricted_paths))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>("SELECT name, description FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_tag(&self, tag: &Tag) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO tags (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(&tag.name)
        .bind(&tag.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tag(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
