use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use serde::Serialize;
use supportline_core::assignment::{resolve_assignment, Assignment};
use supportline_core::models::{
    new_session_id, ClientDetail, Message, MessageView, Session, SessionFilter, SessionSummary,
};
use supportline_core::SupportError;

use crate::context::AppContext;

/// Session write path. Every session persist goes through here so the
/// assignment rules see the staged session next to the stored one.
pub async fn persist_session(
    ctx: &AppContext,
    mut session: Session,
    actor: &str,
) -> Result<Session, SupportError> {
    let previous = ctx.store.get_session(&session.id).await?;

    let candidate = match session.last_message_entry().and_then(Message::sender_identity) {
        Some(sender) => match ctx
            .store
            .find_agent_by_sender(sender, ctx.policy.match_rule)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Agent lookup for sender '{}' failed: {}", sender, e);
                None
            }
        },
        None => None,
    };

    let now = Utc::now();
    let outcome = resolve_assignment(
        &mut session,
        previous.as_ref(),
        candidate.as_ref(),
        actor,
        &ctx.policy,
        now,
    );
    session.updated_at = now;

    match &outcome.assignment {
        Assignment::Assigned(agent) => {
            tracing::info!("Session {} assigned to {}", session.id, agent)
        }
        Assignment::Reassigned { from, to } => {
            tracing::info!("Session {} handed from {} to {}", session.id, from, to)
        }
        Assignment::Unchanged => {}
    }
    if outcome.reopened {
        tracing::info!("Session {} reopened by {}", session.id, actor);
    }

    ctx.store.save_session(&session).await?;
    Ok(session)
}

/// Create a session and its client-detail row. Returns the new id.
pub async fn create_session(
    ctx: &AppContext,
    os: Option<String>,
    ip: Option<String>,
    referrer: Option<String>,
    actor: &str,
) -> Result<String, SupportError> {
    let id = new_session_id();
    persist_session(ctx, Session::new(id.clone(), Utc::now()), actor).await?;
    ctx.store
        .save_client(&ClientDetail::new(id.clone(), ip, os, referrer))
        .await?;

    tracing::info!("Created session {}", id);
    Ok(id)
}

pub async fn save_message(
    ctx: &AppContext,
    session_id: &str,
    message: Message,
    actor: &str,
) -> Result<(), SupportError> {
    let mut session = load_session(ctx, session_id).await?;

    if message.is_from_guest() && session.resolved {
        session.resolved = false;
    }
    session.messages.push(message);

    persist_session(ctx, session, actor).await?;
    Ok(())
}

/// Messages of a session, or an empty list when the id is unknown.
pub async fn fetch_messages(
    ctx: &AppContext,
    session_id: &str,
) -> Result<Vec<MessageView>, SupportError> {
    Ok(ctx
        .store
        .get_session(session_id)
        .await?
        .map(|s| s.message_views())
        .unwrap_or_default())
}

/// Record visitor feedback. Returns false, touching nothing, when the
/// session does not exist.
pub async fn update_feedback(
    ctx: &AppContext,
    session_id: &str,
    ratings: Option<f64>,
    feedback: Option<String>,
    actor: &str,
) -> Result<bool, SupportError> {
    let Some(mut session) = ctx.store.get_session(session_id).await? else {
        return Ok(false);
    };

    session.ratings = ratings;
    session.feedback = feedback;
    persist_session(ctx, session, actor).await?;
    Ok(true)
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOverview {
    pub assigned_users: BTreeMap<String, Option<String>>,
    pub online_agents: Vec<String>,
}

pub async fn assignments_and_online_agents(
    ctx: &AppContext,
) -> Result<AssignmentOverview, SupportError> {
    let assigned_users = ctx
        .store
        .list_sessions(&SessionFilter::all())
        .await?
        .into_iter()
        .map(|s| (s.id, s.current_assignee))
        .collect();
    let online_agents = ctx.store.list_available_agents().await?;

    Ok(AssignmentOverview {
        assigned_users,
        online_agents,
    })
}

pub async fn list_sessions(
    ctx: &AppContext,
    filter: &SessionFilter,
) -> Result<Vec<SessionSummary>, SupportError> {
    ctx.store.list_sessions(filter).await
}

pub async fn load_session(ctx: &AppContext, session_id: &str) -> Result<Session, SupportError> {
    ctx.store
        .get_session(session_id)
        .await?
        .ok_or_else(|| SupportError::SessionNotFound(session_id.to_string()))
}

/// Mark a session resolved or reopen it from the agent console.
pub async fn set_resolved(
    ctx: &AppContext,
    session_id: &str,
    resolved: bool,
    actor: &str,
) -> Result<Session, SupportError> {
    let mut session = load_session(ctx, session_id).await?;
    session.resolved = resolved;
    persist_session(ctx, session, actor).await
}

/// Replace a session's tags. Every tag must exist in the catalog.
pub async fn set_tags(
    ctx: &AppContext,
    session_id: &str,
    tags: Vec<String>,
    actor: &str,
) -> Result<Session, SupportError> {
    let mut session = load_session(ctx, session_id).await?;
    session.set_tags(tags);

    let catalog: HashSet<String> = ctx
        .store
        .list_tags()
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();
    if let Some(unknown) = session.tags.iter().find(|t| !catalog.contains(*t)) {
        return Err(SupportError::InvalidRequest(format!("unknown tag: '{}'", unknown)));
    }

    persist_session(ctx, session, actor).await
}
