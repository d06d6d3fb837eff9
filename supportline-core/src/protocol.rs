use serde::{Deserialize, Serialize};

/// Body of `POST /api/widget`. The widget sends a flat object; `request`
/// selects the operation and fields it does not use are ignored.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum WidgetRequest {
    CreateDoc {
        os: Option<String>,
        ip: Option<String>,
        referrer: Option<String>,
    },
    SaveMessage {
        #[serde(default)]
        session_id: String,
        msg: Option<String>,
        user: Option<String>,
        message_type: Option<String>,
        agent_email: Option<String>,
        time_stamp: Option<String>,
    },
    FetchMessages {
        #[serde(default)]
        session_id: String,
    },
    AddLocationDetails {
        #[serde(default)]
        session_id: String,
        accuracy: Option<f64>,
        longitude: Option<f64>,
        latitude: Option<f64>,
    },
    AddContactDetails {
        #[serde(default)]
        session_id: String,
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    },
    GetAssignedUsersAndOnlineAgents,
    Utils,
    UpdateFeedback {
        #[serde(default)]
        session_id: String,
        ratings: Option<f64>,
        feedback: Option<String>,
    },
}

impl WidgetRequest {
    pub fn name(&self) -> &'static str {
        match self {
            WidgetRequest::CreateDoc { .. } => "create_doc",
            WidgetRequest::SaveMessage { .. } => "save_message",
            WidgetRequest::FetchMessages { .. } => "fetch_messages",
            WidgetRequest::AddLocationDetails { .. } => "add_location_details",
            WidgetRequest::AddContactDetails { .. } => "add_contact_details",
            WidgetRequest::GetAssignedUsersAndOnlineAgents => {
                "get_assigned_users_and_online_agents"
            }
            WidgetRequest::Utils => "utils",
            WidgetRequest::UpdateFeedback { .. } => "update_feedback",
        }
    }
}

pub const SUCCESS: &str = "success";
pub const ERROR: &str = "error";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WidgetResponse {
    pub message: serde_json::Value,
}

impl WidgetResponse {
    pub fn new(message: serde_json::Value) -> Self {
        Self { message }
    }

    pub fn success() -> Self {
        Self::new(serde_json::Value::String(SUCCESS.to_string()))
    }

    pub fn error() -> Self {
        Self::new(serde_json::Value::String(ERROR.to_string()))
    }

    pub fn empty() -> Self {
        Self::new(serde_json::Value::Null)
    }
}
