//! supportline-cli — operator client for the Supportline widget endpoint
//!
//! Speaks the same `POST /api/widget` protocol the browser widget uses, so a
//! conversation can be driven or inspected from a terminal.
//!
//! # Subcommands
//! - `status`                                   — show server health
//! - `create [--os] [--ip] [--referrer]`        — open a session, print its id
//! - `send <session> <message> [--user] [--type] [--agent-email] [--time-stamp]`
//!                                              — append a message
//! - `messages <session> [--json]`              — print a conversation
//! - `location <session> --longitude --latitude [--accuracy]`
//! - `contact <session> [--name] [--email] [--phone]`
//! - `assignments [--json]`                     — assignees and online agents
//! - `widget`                                   — widget settings
//! - `feedback <session> [--ratings] [--feedback]`

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8780";
const ACTOR_HEADER: &str = "x-supportline-user";
const TIME_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "supportline-cli",
    version,
    about = "Supportline live-chat client for the widget dispatch endpoint"
)]
struct Cli {
    /// Supportline HTTP server URL (overrides SUPPORTLINE_HTTP_URL env var)
    #[arg(long, env = "SUPPORTLINE_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Identity to act as; omitted means the anonymous visitor
    #[arg(long, env = "SUPPORTLINE_USER")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show Supportline server status
    Status,

    /// Open a new chat session
    Create {
        #[arg(long)]
        os: Option<String>,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        referrer: Option<String>,
    },

    /// Append a message to a session
    Send {
        session: String,
        message: String,

        /// Sender shown in the conversation (defaults to Guest server-side)
        #[arg(long)]
        user: Option<String>,

        /// Message type, e.g. Message or Attachment
        #[arg(long = "type")]
        message_type: Option<String>,

        /// Email of the agent sending the message
        #[arg(long)]
        agent_email: Option<String>,

        /// Send time as `YYYY-MM-DD HH:MM:SS`; defaults to local now
        #[arg(long)]
        time_stamp: Option<String>,
    },

    /// Print the messages of a session
    Messages {
        session: String,

        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Record the visitor's location
    Location {
        session: String,
        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
        #[arg(long)]
        accuracy: Option<f64>,
    },

    /// Record the visitor's contact details
    Contact {
        session: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Show who is assigned to each session and which agents are online
    Assignments {
        #[arg(long)]
        json: bool,
    },

    /// Show widget settings
    Widget,

    /// Leave a rating and feedback on a session
    Feedback {
        session: String,
        #[arg(long)]
        ratings: Option<f64>,
        #[arg(long)]
        feedback: Option<String>,
    },
}

// ============================================================================
// Wire Types
// ============================================================================

/// One entry of a `fetch_messages` reply.
#[derive(Debug, Deserialize, PartialEq)]
pub struct MessageLine {
    pub user: String,
    pub message: String,
    pub message_type: String,
}

/// Reply to `get_assigned_users_and_online_agents`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOverview {
    pub assigned_users: std::collections::BTreeMap<String, Option<String>>,
    pub online_agents: Vec<String>,
}

/// Build the JSON payload for a widget subcommand. `None` for subcommands
/// that do not go through the dispatcher. `now` stamps messages sent
/// without an explicit `--time-stamp`.
fn widget_payload(command: &Commands, now: &str) -> Option<Value> {
    let payload = match command {
        Commands::Status => return None,
        Commands::Create { os, ip, referrer } => json!({
            "request": "create_doc",
            "os": os,
            "ip": ip,
            "referrer": referrer,
        }),
        Commands::Send {
            session,
            message,
            user,
            message_type,
            agent_email,
            time_stamp,
        } => json!({
            "request": "save_message",
            "session_id": session,
            "msg": message,
            "user": user,
            "message_type": message_type,
            "agent_email": agent_email,
            "time_stamp": time_stamp.as_deref().unwrap_or(now),
        }),
        Commands::Messages { session, .. } => json!({
            "request": "fetch_messages",
            "session_id": session,
        }),
        Commands::Location {
            session,
            longitude,
            latitude,
            accuracy,
        } => json!({
            "request": "add_location_details",
            "session_id": session,
            "longitude": longitude,
            "latitude": latitude,
            "accuracy": accuracy,
        }),
        Commands::Contact {
            session,
            name,
            email,
            phone,
        } => json!({
            "request": "add_contact_details",
            "session_id": session,
            "name": name,
            "email": email,
            "phone": phone,
        }),
        Commands::Assignments { .. } => json!({ "request": "get_assigned_users_and_online_agents" }),
        Commands::Widget => json!({ "request": "utils" }),
        Commands::Feedback {
            session,
            ratings,
            feedback,
        } => json!({
            "request": "update_feedback",
            "session_id": session,
            "ratings": ratings,
            "feedback": feedback,
        }),
    };
    Some(payload)
}

/// Render a conversation as `user: message` lines, tagging non-text types.
pub fn format_messages(lines: &[MessageLine]) -> String {
    lines
        .iter()
        .map(|m| {
            if m.message_type == "Message" {
                format!("{}: {}", m.user, m.message)
            } else {
                format!("{} [{}]: {}", m.user, m.message_type, m.message)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_assignments(overview: &AssignmentOverview) -> String {
    let mut out: Vec<String> = overview
        .assigned_users
        .iter()
        .map(|(session, agent)| format!("{}  {}", session, agent.as_deref().unwrap_or("-")))
        .collect();
    out.push(format!(
        "Online agents: {}",
        if overview.online_agents.is_empty() {
            "none".to_string()
        } else {
            overview.online_agents.join(", ")
        }
    ));
    out.join("\n")
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

/// POST a widget payload and return the reply's `message` field.
fn dispatch(server: &str, actor: Option<&str>, payload: &Value) -> anyhow::Result<Value> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let url = format!("{}/api/widget", server);
    let mut req = client.post(&url).json(payload);
    if let Some(actor) = actor {
        req = req.header(ACTOR_HEADER, actor);
    }

    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("supportline-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("supportline-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    let mut body: Value = resp.json()?;
    Ok(body["message"].take())
}

fn do_widget(server: &str, actor: Option<&str>, command: &Commands) -> anyhow::Result<()> {
    let now = chrono::Local::now().format(TIME_STAMP_FORMAT).to_string();
    let Some(payload) = widget_payload(command, &now) else {
        return Ok(());
    };
    let reply = dispatch(server, actor, &payload)?;

    match command {
        Commands::Create { .. } => {
            println!("{}", reply["id"].as_str().unwrap_or("?"));
        }
        Commands::Messages { json: true, .. } | Commands::Assignments { json: true } => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Messages { session, .. } => {
            let lines: Vec<MessageLine> = serde_json::from_value(reply)?;
            if lines.is_empty() {
                eprintln!("No messages in session {}", session);
            } else {
                println!("{}", format_messages(&lines));
            }
        }
        Commands::Assignments { .. } => {
            let overview: AssignmentOverview = serde_json::from_value(reply)?;
            println!("{}", format_assignments(&overview));
        }
        Commands::Widget => {
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Feedback { session, .. } => {
            if reply == json!("error") {
                eprintln!("supportline-cli: no session {}", session);
                std::process::exit(1);
            }
            println!("Feedback recorded");
        }
        _ => {
            let text = match &reply {
                Value::String(s) => s.clone(),
                Value::Object(o) => o
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("ok")
                    .to_string(),
                other => other.to_string(),
            };
            println!("{}", text);
        }
    }

    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: Value = r.json().unwrap_or_default();
            println!("Supportline server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:            {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:              {}", body["store"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("supportline-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("supportline-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match &cli.command {
        Commands::Status => do_status(&server),
        command => do_widget(&server, cli.actor.as_deref(), command),
    };

    if let Err(e) = result {
        eprintln!("supportline-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
