use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender name the widget uses for an anonymous visitor.
pub const GUEST: &str = "Guest";

pub const DEFAULT_MESSAGE_TYPE: &str = "Message";

/// Length of the `last_message` preview kept on the session.
pub const LAST_MESSAGE_PREVIEW_CHARS: usize = 25;

/// Fresh 12-character hex token for a new session.
pub fn new_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub user: String,
    pub message: String,
    pub message_type: String,
    pub agent_email: Option<String>,
    pub time_stamp: Option<String>,
}

impl Message {
    pub fn new(
        user: Option<String>,
        message: Option<String>,
        message_type: Option<String>,
        agent_email: Option<String>,
        time_stamp: Option<String>,
    ) -> Self {
        Self {
            user: user.unwrap_or_else(|| GUEST.to_string()),
            message: message.unwrap_or_default(),
            message_type: message_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_MESSAGE_TYPE.to_string()),
            agent_email,
            time_stamp,
        }
    }

    pub fn is_from_guest(&self) -> bool {
        self.user.is_empty() || self.user == GUEST
    }

    /// The sender, unless it is the anonymous visitor.
    pub fn sender_identity(&self) -> Option<&str> {
        if self.is_from_guest() {
            None
        } else {
            Some(&self.user)
        }
    }

    pub fn preview(&self) -> String {
        self.message.chars().take(LAST_MESSAGE_PREVIEW_CHARS).collect()
    }
}

/// Projection returned by `fetch_messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub user: String,
    pub message: String,
    pub message_type: String,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            user: m.user.clone(),
            message: m.message.clone(),
            message_type: m.message_type.clone(),
        }
    }
}

/// One hand-off of a session to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub agent: String,
    pub took_control_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    #[sqlx(json)]
    pub messages: Vec<Message>,
    pub current_assignee: Option<String>,
    pub agent_name: Option<String>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub ratings: Option<f64>,
    pub feedback: Option<String>,
    pub ratings_given_to: Option<String>,
    #[sqlx(json)]
    pub assignment_history: Vec<AssignmentRecord>,
    pub visitor_name: Option<String>,
    pub last_message_by: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Stamped on every write through the session write path.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            current_assignee: None,
            agent_name: None,
            first_response_at: None,
            resolved: false,
            ratings: None,
            feedback: None,
            ratings_given_to: None,
            assignment_history: Vec::new(),
            visitor_name: None,
            last_message_by: None,
            last_message: None,
            last_message_at: None,
            tags: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    pub fn last_message_entry(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message_views(&self) -> Vec<MessageView> {
        self.messages.iter().map(MessageView::from).collect()
    }

    /// Replace tags, trimming blanks and dropping repeats while keeping order.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        self.tags = out;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            visitor_name: self.visitor_name.clone(),
            current_assignee: self.current_assignee.clone(),
            agent_name: self.agent_name.clone(),
            resolved: self.resolved,
            last_message_by: self.last_message_by.clone(),
            last_message: self.last_message.clone(),
            last_message_at: self.last_message_at.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Row shown in the agent console's session list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionSummary {
    pub id: String,
    pub visitor_name: Option<String>,
    pub current_assignee: Option<String>,
    pub agent_name: Option<String>,
    pub resolved: bool,
    pub last_message_by: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Agent console session-list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub resolved: Option<bool>,
    pub assignee: Option<String>,
    /// Also return sessions nobody has written in yet.
    pub include_empty: bool,
}

impl SessionFilter {
    /// Every session, empty ones included.
    pub fn all() -> Self {
        Self {
            include_empty: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, s: &SessionSummary) -> bool {
        if self.resolved.is_some_and(|r| r != s.resolved) {
            return false;
        }
        if let Some(assignee) = &self.assignee {
            if s.current_assignee.as_ref() != Some(assignee) {
                return false;
            }
        }
        self.include_empty || s.last_message.as_deref().is_some_and(|m| !m.is_empty())
    }
}
