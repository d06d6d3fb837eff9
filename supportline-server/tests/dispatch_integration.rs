//! Widget dispatcher integration tests against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use supportline_core::config::AgentMatchRule;
use supportline_core::models::{
    AgentProfile, CannedMessage, ClientDetail, Session, SessionFilter, SessionSummary, Tag,
    UserAccount, WidgetSettings,
};
use supportline_core::{
    ChatStore, InMemoryStore, SupportError, SupportlineConfig, WidgetRequest, WidgetResponse,
};
use supportline_server::subsystems::sessions;
use supportline_server::{router, AppContext};

const BOT: &str = "nodeuser@example.com";
const ALICE: &str = "alice@example.com";
const BOB: &str = "bob@example.com";

fn config() -> SupportlineConfig {
    let mut config = SupportlineConfig::default();
    config.assignment.automation_identity = Some(BOT.to_string());
    config.assignment.match_rule = AgentMatchRule::DisplayNameOrLogin;
    config
}

async fn make_ctx() -> (AppContext, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::with_widget_settings(WidgetSettings {
        welcome_message: "Welcome!".into(),
        returning_message: "Welcome back!".into(),
        allowed_origins: vec!["https://shop.example.com".into()],
        restricted_paths: vec!["/checkout".into()],
    }));

    for (login, name, display) in [(ALICE, "Alice Smith", "Alice"), (BOB, "Bob Jones", "Bob")] {
        let mut profile = AgentProfile::new(login, Some(name.to_string()));
        profile.agent_display_name = Some(display.to_string());
        store.save_agent(&profile).await.unwrap();
    }

    let ctx = AppContext::new(store.clone(), config());
    (ctx, store)
}

async fn dispatch(ctx: &AppContext, actor: &str, payload: serde_json::Value) -> WidgetResponse {
    let request: WidgetRequest = serde_json::from_value(payload).expect("valid request");
    router::handle_request(request, ctx, actor)
        .await
        .expect("request should succeed")
}

async fn create_session(ctx: &AppContext) -> String {
    let resp = dispatch(
        ctx,
        "Guest",
        json!({"request": "create_doc", "os": "Linux", "ip": "10.1.2.3", "referrer": "https://google.com"}),
    )
    .await;
    assert_eq!(resp.message["message"], "success");
    resp.message["id"].as_str().unwrap().to_string()
}

async fn send(ctx: &AppContext, actor: &str, session_id: &str, user: &str, msg: &str) {
    let resp = dispatch(
        ctx,
        actor,
        json!({
            "request": "save_message",
            "session_id": session_id,
            "user": user,
            "msg": msg,
            "time_stamp": "2025-03-01 09:30:00"
        }),
    )
    .await;
    assert_eq!(resp, WidgetResponse::success());
}

#[tokio::test]
async fn test_create_doc_issues_fresh_ids_with_client_details() {
    let (ctx, store) = make_ctx().await;

    let mut seen = HashSet::new();
    for _ in 0..50 {
        let id = create_session(&ctx).await;
        assert_eq!(id.len(), 12);
        assert!(seen.insert(id), "session ids must not repeat");
    }

    let id = seen.iter().next().unwrap();
    let client = store.get_client(id).await.unwrap().expect("client details created");
    assert_eq!(client.ip_address.as_deref(), Some("10.1.2.3"));
    assert_eq!(client.operating_system.as_deref(), Some("Linux"));
    assert_eq!(client.referrer.as_deref(), Some("https://google.com"));
}

#[tokio::test]
async fn test_save_message_to_unknown_session_fails() {
    let (ctx, _) = make_ctx().await;
    let request: WidgetRequest = serde_json::from_value(json!({
        "request": "save_message",
        "session_id": "missing00000",
        "user": "Guest",
        "msg": "anyone there?"
    }))
    .unwrap();

    let err = router::handle_request(request, &ctx, "Guest").await.unwrap_err();
    assert!(matches!(err, SupportError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_fetch_messages_unknown_session_is_empty() {
    let (ctx, _) = make_ctx().await;
    let resp = dispatch(&ctx, "Guest", json!({"request": "fetch_messages", "session_id": "nope"})).await;
    assert_eq!(resp.message, json!([]));
}

#[tokio::test]
async fn test_fetch_messages_returns_ordered_projection() {
    let (ctx, _) = make_ctx().await;
    let id = create_session(&ctx).await;
    send(&ctx, "Guest", &id, "Guest", "hello").await;
    send(&ctx, ALICE, &id, ALICE, "hi, how can I help?").await;

    let resp = dispatch(&ctx, "Guest", json!({"request": "fetch_messages", "session_id": id})).await;
    assert_eq!(
        resp.message,
        json!([
            {"user": "Guest", "message": "hello", "message_type": "Message"},
            {"user": ALICE, "message": "hi, how can I help?", "message_type": "Message"}
        ])
    );
}

#[tokio::test]
async fn test_location_first_write_wins() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;

    let first = dispatch(
        &ctx,
        "Guest",
        json!({"request": "add_location_details", "session_id": id, "accuracy": 20.0, "longitude": 77.59, "latitude": 12.97}),
    )
    .await;
    assert_eq!(first.message, json!({"message": "success"}));

    dispatch(
        &ctx,
        "Guest",
        json!({"request": "add_location_details", "session_id": id, "accuracy": 5.0, "longitude": -0.12, "latitude": 51.5}),
    )
    .await;

    let client = store.get_client(&id).await.unwrap().unwrap();
    assert_eq!(client.longitude, Some(77.59));
    assert_eq!(client.latitude, Some(12.97));
    assert_eq!(client.accuracy, Some(20.0));
}

#[tokio::test]
async fn test_contact_details_overwrite_and_name_the_session() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;

    for (name, email) in [("Ann", "ann@example.com"), ("Ann Lee", "ann.lee@example.com")] {
        let resp = dispatch(
            &ctx,
            "Guest",
            json!({"request": "add_contact_details", "session_id": id, "name": name, "email": email, "phone": "555-0100"}),
        )
        .await;
        assert_eq!(resp, WidgetResponse::success());
    }

    let client = store.get_client(&id).await.unwrap().unwrap();
    assert_eq!(client.name.as_deref(), Some("Ann Lee"));
    assert_eq!(client.email_address.as_deref(), Some("ann.lee@example.com"));
    assert_eq!(client.contact_number.as_deref(), Some("555-0100"));

    let session = store.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.visitor_name.as_deref(), Some("Ann Lee"));
}

#[tokio::test]
async fn test_first_agent_reply_assigns_session() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;
    send(&ctx, "Guest", &id, "Guest", "I need help").await;

    let session = store.get_session(&id).await.unwrap().unwrap();
    assert!(session.current_assignee.is_none());
    assert!(session.first_response_at.is_none());

    send(&ctx, ALICE, &id, "Alice", "On it!").await;

    let session = store.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.current_assignee.as_deref(), Some(ALICE));
    assert_eq!(session.agent_name.as_deref(), Some("Alice Smith"));
    assert!(session.first_response_at.is_some());
    assert_eq!(session.assignment_history.len(), 1);
    assert_eq!(session.last_message_by.as_deref(), Some("Alice"));
    assert_eq!(session.last_message.as_deref(), Some("On it!"));
    assert_eq!(session.last_message_at.as_deref(), Some("2025-03-01 09:30:00"));
}

#[tokio::test]
async fn test_second_agent_takes_over() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;
    send(&ctx, ALICE, &id, ALICE, "Hello, Alice here").await;
    let first_response = store
        .get_session(&id)
        .await
        .unwrap()
        .unwrap()
        .first_response_at;

    send(&ctx, BOB, &id, BOB, "Bob taking over").await;

    let session = store.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.current_assignee.as_deref(), Some(BOB));
    assert_eq!(session.first_response_at, first_response);
    assert_eq!(session.assignment_history.len(), 2);
    assert_eq!(session.assignment_history[0].agent, ALICE);
    assert_eq!(session.assignment_history[1].agent, BOB);

    let overview = dispatch(&ctx, "Guest", json!({"request": "get_assigned_users_and_online_agents"})).await;
    assert_eq!(overview.message["assignedUsers"][&id], BOB);
}

#[tokio::test]
async fn test_unknown_sender_does_not_assign() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;
    send(&ctx, "stranger", &id, "Stranger Danger", "hi").await;

    let session = store.get_session(&id).await.unwrap().unwrap();
    assert!(session.current_assignee.is_none());
    assert!(session.assignment_history.is_empty());
}

#[tokio::test]
async fn test_guest_message_reopens_resolved_session() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;

    let mut session = store.get_session(&id).await.unwrap().unwrap();
    session.resolved = true;
    store.save_session(&session).await.unwrap();

    send(&ctx, "Guest", &id, "Guest", "one more question").await;

    assert!(!store.get_session(&id).await.unwrap().unwrap().resolved);
}

#[tokio::test]
async fn test_automation_write_reopens_only_unrated_sessions() {
    let (ctx, store) = make_ctx().await;

    // A bot relaying a non-guest visitor message onto a resolved session.
    let unrated = create_session(&ctx).await;
    let mut session = store.get_session(&unrated).await.unwrap().unwrap();
    session.resolved = true;
    store.save_session(&session).await.unwrap();
    send(&ctx, BOT, &unrated, "visitor-42", "still broken").await;
    assert!(!store.get_session(&unrated).await.unwrap().unwrap().resolved);

    let rated = create_session(&ctx).await;
    let mut session = store.get_session(&rated).await.unwrap().unwrap();
    session.resolved = true;
    session.ratings = Some(0.6);
    store.save_session(&session).await.unwrap();
    send(&ctx, BOT, &rated, "visitor-42", "thanks").await;
    assert!(store.get_session(&rated).await.unwrap().unwrap().resolved);
}

#[tokio::test]
async fn test_automation_closing_a_session_keeps_it_resolved() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;
    send(&ctx, "Guest", &id, "Guest", "thanks, that fixed it").await;

    let session = sessions::set_resolved(&ctx, &id, true, BOT).await.unwrap();
    assert!(session.resolved);
    assert!(store.get_session(&id).await.unwrap().unwrap().resolved);

    // A later relayed message still reopens it.
    send(&ctx, BOT, &id, "visitor-42", "actually, one more thing").await;
    assert!(!store.get_session(&id).await.unwrap().unwrap().resolved);
}

#[tokio::test]
async fn test_assignments_and_online_agents() {
    let (ctx, store) = make_ctx().await;
    let idle = create_session(&ctx).await;
    let busy = create_session(&ctx).await;
    send(&ctx, BOB, &busy, "Bob", "hello").await;

    let mut bob = store.get_agent(BOB).await.unwrap().unwrap();
    bob.is_available = true;
    store.save_agent(&bob).await.unwrap();

    let resp = dispatch(&ctx, "Guest", json!({"request": "get_assigned_users_and_online_agents"})).await;
    assert_eq!(resp.message["assignedUsers"][&idle], serde_json::Value::Null);
    assert_eq!(resp.message["assignedUsers"][&busy], BOB);
    assert_eq!(resp.message["onlineAgents"], json!([BOB]));
}

#[tokio::test]
async fn test_utils_returns_widget_settings() {
    let (ctx, _) = make_ctx().await;
    let resp = dispatch(&ctx, "Guest", json!({"request": "utils"})).await;
    assert_eq!(
        resp.message,
        json!({
            "welcome_message": "Welcome!",
            "returning_message": "Welcome back!",
            "allowed_origins": ["https://shop.example.com"],
            "restricted_paths": ["/checkout"]
        })
    );
}

#[tokio::test]
async fn test_update_feedback_sets_fields_and_is_idempotent() {
    let (ctx, store) = make_ctx().await;
    let id = create_session(&ctx).await;
    send(&ctx, ALICE, &id, ALICE, "Anything else?").await;

    let payload = json!({"request": "update_feedback", "session_id": id, "ratings": 0.8, "feedback": "Very helpful"});
    let resp = dispatch(&ctx, "Guest", payload.clone()).await;
    assert_eq!(resp, WidgetResponse::empty());

    let after_first = store.get_session(&id).await.unwrap().unwrap();
    assert_eq!(after_first.ratings, Some(0.8));
    assert_eq!(after_first.feedback.as_deref(), Some("Very helpful"));
    assert_eq!(after_first.ratings_given_to.as_deref(), Some(ALICE));

    dispatch(&ctx, "Guest", payload).await;
    let mut after_second = store.get_session(&id).await.unwrap().unwrap();
    assert!(after_second.updated_at >= after_first.updated_at);
    after_second.updated_at = after_first.updated_at;
    assert_eq!(after_second, after_first);
}

#[tokio::test]
async fn test_update_feedback_unknown_session_returns_error_sentinel() {
    let (ctx, store) = make_ctx().await;
    let before = store.list_sessions(&SessionFilter::all()).await.unwrap();

    let resp = dispatch(
        &ctx,
        "Guest",
        json!({"request": "update_feedback", "session_id": "ghost0000000", "ratings": 1.0, "feedback": "?"}),
    )
    .await;

    assert_eq!(resp, WidgetResponse::error());
    assert_eq!(store.list_sessions(&SessionFilter::all()).await.unwrap(), before);
    assert!(store.get_session("ghost0000000").await.unwrap().is_none());
}

#[tokio::test]
async fn test_match_rule_display_name_only_ignores_login() {
    let store = Arc::new(InMemoryStore::new());
    let mut profile = AgentProfile::new(ALICE, Some("Alice Smith".into()));
    profile.agent_display_name = Some("Alice".into());
    store.save_agent(&profile).await.unwrap();
    store
        .save_user(&UserAccount {
            id: ALICE.into(),
            full_name: Some("Alice Smith".into()),
            enabled: true,
        })
        .await
        .unwrap();

    let mut cfg = config();
    cfg.assignment.match_rule = AgentMatchRule::DisplayName;
    let ctx = AppContext::new(store.clone(), cfg);

    let id = create_session(&ctx).await;
    send(&ctx, ALICE, &id, ALICE, "by login").await;
    assert!(store.get_session(&id).await.unwrap().unwrap().current_assignee.is_none());

    send(&ctx, ALICE, &id, "Alice", "by display name").await;
    assert_eq!(
        store.get_session(&id).await.unwrap().unwrap().current_assignee.as_deref(),
        Some(ALICE)
    );
}

/// Store whose agent lookup always fails; everything else is in memory.
struct BrokenAgentLookup(InMemoryStore);

#[async_trait]
impl ChatStore for BrokenAgentLookup {
    async fn health(&self) -> Result<String, SupportError> {
        self.0.health().await
    }
    async fn get_session(&self, id: &str) -> Result<Option<Session>, SupportError> {
        self.0.get_session(id).await
    }
    async fn session_exists(&self, id: &str) -> Result<bool, SupportError> {
        self.0.session_exists(id).await
    }
    async fn save_session(&self, session: &Session) -> Result<(), SupportError> {
        self.0.save_session(session).await
    }
    async fn set_visitor_name(&self, id: &str, name: Option<&str>) -> Result<bool, SupportError> {
        self.0.set_visitor_name(id, name).await
    }
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<SessionSummary>, SupportError> {
        self.0.list_sessions(filter).await
    }
    async fn get_client(&self, session_id: &str) -> Result<Option<ClientDetail>, SupportError> {
        self.0.get_client(session_id).await
    }
    async fn save_client(&self, client: &ClientDetail) -> Result<(), SupportError> {
        self.0.save_client(client).await
    }
    async fn get_agent(&self, user: &str) -> Result<Option<AgentProfile>, SupportError> {
        self.0.get_agent(user).await
    }
    async fn find_agent_by_sender(
        &self,
        _sender: &str,
        _rule: AgentMatchRule,
    ) -> Result<Option<AgentProfile>, SupportError> {
        Err(SupportError::Other("agent directory unavailable".into()))
    }
    async fn save_agent(&self, agent: &AgentProfile) -> Result<(), SupportError> {
        self.0.save_agent(agent).await
    }
    async fn list_agents(&self) -> Result<Vec<AgentProfile>, SupportError> {
        self.0.list_agents().await
    }
    async fn list_available_agents(&self) -> Result<Vec<String>, SupportError> {
        self.0.list_available_agents().await
    }
    async fn get_user(&self, id: &str) -> Result<Option<UserAccount>, SupportError> {
        self.0.get_user(id).await
    }
    async fn save_user(&self, user: &UserAccount) -> Result<(), SupportError> {
        self.0.save_user(user).await
    }
    async fn list_users(&self) -> Result<Vec<UserAccount>, SupportError> {
        self.0.list_users().await
    }
    async fn default_canned_messages(&self) -> Result<Vec<CannedMessage>, SupportError> {
        self.0.default_canned_messages().await
    }
    async fn set_default_canned_messages(&self, messages: &[CannedMessage]) -> Result<(), SupportError> {
        self.0.set_default_canned_messages(messages).await
    }
    async fn widget_settings(&self) -> Result<WidgetSettings, SupportError> {
        self.0.widget_settings().await
    }
    async fn save_widget_settings(&self, settings: &WidgetSettings) -> Result<(), SupportError> {
        self.0.save_widget_settings(settings).await
    }
    async fn list_tags(&self) -> Result<Vec<Tag>, SupportError> {
        self.0.list_tags().await
    }
    async fn create_tag(&self, tag: &Tag) -> Result<bool, SupportError> {
        self.0.create_tag(tag).await
    }
    async fn delete_tag(&self, name: &str) -> Result<bool, SupportError> {
        self.0.delete_tag(name).await
    }
}

#[tokio::test]
async fn test_failed_agent_lookup_saves_message_unassigned() {
    let inner = InMemoryStore::new();
    inner
        .save_agent(&AgentProfile::new(ALICE, Some("Alice Smith".into())))
        .await
        .unwrap();
    let store = Arc::new(BrokenAgentLookup(inner));
    let ctx = AppContext::new(store.clone(), config());

    let id = create_session(&ctx).await;
    send(&ctx, ALICE, &id, ALICE, "hello from a known agent").await;

    let session = store.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.last_message.as_deref(), Some("hello from a known agent"));
    assert!(session.current_assignee.is_none());
    assert!(session.first_response_at.is_none());
    assert!(session.assignment_history.is_empty());
}
