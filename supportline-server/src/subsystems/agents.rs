use std::collections::HashSet;

use supportline_core::models::{
    AgentProfile, AgentProfileUpdate, CannedMessage, CannedScope, UserAccount, RESERVED_USERS,
};
use supportline_core::SupportError;

use crate::context::AppContext;

/// Return the agent profile for `user`, creating an enabled one if needed.
pub async fn check_or_create(ctx: &AppContext, user: &str) -> Result<AgentProfile, SupportError> {
    if RESERVED_USERS.contains(&user) {
        return Err(SupportError::InvalidRequest(format!(
            "'{}' cannot hold an agent profile",
            user
        )));
    }

    if let Some(existing) = ctx.store.get_agent(user).await? {
        return Ok(existing);
    }

    let full_name = ctx
        .store
        .get_user(user)
        .await?
        .and_then(|account| account.full_name);
    let profile = AgentProfile::new(user, full_name);
    ctx.store.save_agent(&profile).await?;
    mirror_user_account(ctx, &profile).await?;

    tracing::info!("Created agent profile for {}", user);
    Ok(profile)
}

/// Apply a console edit to a profile, then mirror its enabled flag.
pub async fn update_profile(
    ctx: &AppContext,
    user: &str,
    update: AgentProfileUpdate,
) -> Result<AgentProfile, SupportError> {
    let mut profile = ctx
        .store
        .get_agent(user)
        .await?
        .ok_or_else(|| SupportError::AgentNotFound(user.to_string()))?;

    profile.apply(update);
    ctx.store.save_agent(&profile).await?;
    mirror_user_account(ctx, &profile).await?;
    Ok(profile)
}

/// Keep the linked user account's enabled flag equal to the profile's.
async fn mirror_user_account(ctx: &AppContext, profile: &AgentProfile) -> Result<(), SupportError> {
    let Some(mut account) = ctx.store.get_user(&profile.user).await? else {
        tracing::warn!("No user account linked to agent profile {}", profile.user);
        return Ok(());
    };

    if account.mirror_profile(profile) {
        ctx.store.save_user(&account).await?;
        tracing::info!(
            "User account {} {}",
            account.id,
            if account.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}

pub async fn list_agents(ctx: &AppContext) -> Result<Vec<AgentProfile>, SupportError> {
    ctx.store.list_agents().await
}

/// Accounts that could be turned into agents.
pub async fn users_without_profile(ctx: &AppContext) -> Result<Vec<UserAccount>, SupportError> {
    let mut taken: HashSet<String> = ctx
        .store
        .list_agents()
        .await?
        .into_iter()
        .map(|a| a.user)
        .collect();
    taken.extend(RESERVED_USERS.iter().map(|u| u.to_string()));

    Ok(ctx
        .store
        .list_users()
        .await?
        .into_iter()
        .filter(|u| !taken.contains(&u.id))
        .collect())
}

pub async fn upsert_user(ctx: &AppContext, account: UserAccount) -> Result<UserAccount, SupportError> {
    ctx.store.save_user(&account).await?;
    Ok(account)
}

pub async fn canned_messages(
    ctx: &AppContext,
    scope: CannedScope,
    actor: &str,
) -> Result<Vec<CannedMessage>, SupportError> {
    match scope {
        CannedScope::Personal => Ok(check_or_create(ctx, actor).await?.canned_messages),
        CannedScope::Default => ctx.store.default_canned_messages().await,
    }
}

/// Replace the whole canned-message list for a scope.
pub async fn replace_canned_messages(
    ctx: &AppContext,
    scope: CannedScope,
    actor: &str,
    messages: Vec<CannedMessage>,
) -> Result<(), SupportError> {
    match scope {
        CannedScope::Personal => {
            let mut profile = ctx
                .store
                .get_agent(actor)
                .await?
                .ok_or_else(|| SupportError::AgentNotFound(actor.to_string()))?;
            profile.set_canned_messages(messages);
            ctx.store.save_agent(&profile).await?;
            mirror_user_account(ctx, &profile).await
        }
        CannedScope::Default => ctx.store.set_default_canned_messages(&messages).await,
    }
}
