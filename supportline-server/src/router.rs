use crate::context::AppContext;
use crate::subsystems::{clients, sessions, widget};
use supportline_core::models::Message;
use supportline_core::protocol::SUCCESS;
use supportline_core::{SupportError, WidgetRequest, WidgetResponse};

/// Dispatch one widget request. `actor` is the identity performing the call.
///
/// Business rejections come back as `Ok` with a sentinel message; anything
/// else (unknown session on a write, store failure) is an `Err`.
pub async fn handle_request(
    request: WidgetRequest,
    ctx: &AppContext,
    actor: &str,
) -> Result<WidgetResponse, SupportError> {
    tracing::debug!("Widget request '{}' from {}", request.name(), actor);

    match request {
        WidgetRequest::CreateDoc { os, ip, referrer } => {
            let id = sessions::create_session(ctx, os, ip, referrer, actor).await?;
            Ok(WidgetResponse::new(serde_json::json!({
                "message": SUCCESS,
                "id": id,
            })))
        }
        WidgetRequest::SaveMessage {
            session_id,
            msg,
            user,
            message_type,
            agent_email,
            time_stamp,
        } => {
            let message = Message::new(user, msg, message_type, agent_email, time_stamp);
            sessions::save_message(ctx, &session_id, message, actor).await?;
            Ok(WidgetResponse::success())
        }
        WidgetRequest::FetchMessages { session_id } => {
            let messages = sessions::fetch_messages(ctx, &session_id).await?;
            Ok(WidgetResponse::new(to_value(&messages)?))
        }
        WidgetRequest::AddLocationDetails {
            session_id,
            accuracy,
            longitude,
            latitude,
        } => {
            clients::add_location(ctx, &session_id, accuracy, longitude, latitude).await?;
            Ok(WidgetResponse::new(serde_json::json!({ "message": SUCCESS })))
        }
        WidgetRequest::AddContactDetails {
            session_id,
            name,
            email,
            phone,
        } => {
            clients::add_contact(ctx, &session_id, name, email, phone).await?;
            Ok(WidgetResponse::success())
        }
        WidgetRequest::GetAssignedUsersAndOnlineAgents => {
            let overview = sessions::assignments_and_online_agents(ctx).await?;
            Ok(WidgetResponse::new(to_value(&overview)?))
        }
        WidgetRequest::Utils => {
            let settings = widget::widget_config(ctx).await?;
            Ok(WidgetResponse::new(to_value(&settings)?))
        }
        WidgetRequest::UpdateFeedback {
            session_id,
            ratings,
            feedback,
        } => {
            if sessions::update_feedback(ctx, &session_id, ratings, feedback, actor).await? {
                Ok(WidgetResponse::empty())
            } else {
                Ok(WidgetResponse::error())
            }
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, SupportError> {
    serde_json::to_value(value).map_err(|e| SupportError::Other(e.to_string()))
}
