//! Session assignment rules, applied on every session write.
//!
//! The session write path looks up the agent profile behind the last
//! message's sender and then calls [`resolve_assignment`] before persisting.
//! The resolver itself never fails and performs no IO.

use chrono::{DateTime, Utc};

use crate::config::{AgentMatchRule, AssignmentConfig};
use crate::models::{AgentProfile, AssignmentRecord, Session};

#[derive(Debug, Clone, Default)]
pub struct AssignmentPolicy {
    pub automation_identity: Option<String>,
    pub match_rule: AgentMatchRule,
}

impl From<&AssignmentConfig> for AssignmentPolicy {
    fn from(c: &AssignmentConfig) -> Self {
        Self {
            automation_identity: c.automation_identity.clone(),
            match_rule: c.match_rule,
        }
    }
}

impl AssignmentPolicy {
    fn is_automation(&self, actor: &str) -> bool {
        self.automation_identity.as_deref() == Some(actor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Unchanged,
    Assigned(String),
    Reassigned { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub assignment: Assignment,
    pub reopened: bool,
    pub ratings_attributed: bool,
}

/// Apply assignment, reopen and ratings-attribution rules to a staged session.
///
/// `candidate` is the agent profile the last message's sender resolved to,
/// or `None` when the sender is a guest or the lookup found nothing.
/// A resolved session is only reopened by a write that appends a message.
pub fn resolve_assignment(
    session: &mut Session,
    previous: Option<&Session>,
    candidate: Option<&AgentProfile>,
    actor: &str,
    policy: &AssignmentPolicy,
    now: DateTime<Utc>,
) -> ResolveOutcome {
    let mut outcome = ResolveOutcome {
        assignment: Assignment::Unchanged,
        reopened: false,
        ratings_attributed: false,
    };

    if let Some(last) = session.messages.last() {
        session.last_message_by = Some(last.user.clone());
        session.last_message = Some(last.preview());
        session.last_message_at = last.time_stamp.clone();

        let candidate = if last.is_from_guest() { None } else { candidate };

        match candidate {
            Some(agent) => {
                outcome.assignment = assign(session, agent, now);
            }
            None => {
                // Only a new message reopens; the bot closing a session is not one.
                let appended = previous.map_or(true, |p| session.messages.len() > p.messages.len());
                if appended
                    && session.resolved
                    && policy.is_automation(actor)
                    && session.ratings.is_none()
                {
                    session.resolved = false;
                    outcome.reopened = true;
                }
            }
        }
    }

    if let Some(prev) = previous {
        if prev.ratings != session.ratings && prev.feedback != session.feedback {
            session.ratings_given_to = session.current_assignee.clone();
            outcome.ratings_attributed = true;
        }
    }

    outcome
}

fn assign(session: &mut Session, agent: &AgentProfile, now: DateTime<Utc>) -> Assignment {
    let result = match session.current_assignee.as_deref() {
        Some(current) if current == agent.user => return Assignment::Unchanged,
        Some(current) => Assignment::Reassigned {
            from: current.to_string(),
            to: agent.user.clone(),
        },
        None => {
            session.first_response_at = Some(now);
            Assignment::Assigned(agent.user.clone())
        }
    };

    session.current_assignee = Some(agent.user.clone());
    session.agent_name = agent.agent_name.clone();
    session.assignment_history.push(AssignmentRecord {
        agent: agent.user.clone(),
        took_control_at: now,
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use chrono::Duration;

    const BOT: &str = "bot@example.com";

    fn policy() -> AssignmentPolicy {
        AssignmentPolicy {
            automation_identity: Some(BOT.to_string()),
            match_rule: AgentMatchRule::DisplayNameOrLogin,
        }
    }

    fn agent(login: &str, name: &str) -> AgentProfile {
        AgentProfile::new(login, Some(name.to_string()))
    }

    fn say(session: &mut Session, user: &str, body: &str) {
        session.messages.push(Message::new(
            Some(user.to_string()),
            Some(body.to_string()),
            None,
            None,
            Some("2025-01-01 10:00:00".to_string()),
        ));
    }

    #[test]
    fn empty_session_is_untouched() {
        let mut s = Session::new("s", Utc::now());
        let before = s.clone();
        let out = resolve_assignment(&mut s, None, None, "anyone", &policy(), Utc::now());
        assert_eq!(out.assignment, Assignment::Unchanged);
        assert_eq!(s, before);
    }

    #[test]
    fn first_agent_reply_assigns_and_stamps_first_response() {
        let now = Utc::now();
        let alice = agent("alice@example.com", "Alice Smith");
        let mut s = Session::new("s", now);
        say(&mut s, "Guest", "hello?");
        say(&mut s, "alice@example.com", "Hi, how can I help?");

        let out = resolve_assignment(&mut s, None, Some(&alice), "alice@example.com", &policy(), now);

        assert_eq!(out.assignment, Assignment::Assigned("alice@example.com".into()));
        assert_eq!(s.current_assignee.as_deref(), Some("alice@example.com"));
        assert_eq!(s.agent_name.as_deref(), Some("Alice Smith"));
        assert_eq!(s.first_response_at, Some(now));
        assert_eq!(s.assignment_history.len(), 1);
        assert_eq!(s.assignment_history[0].agent, "alice@example.com");
        assert_eq!(s.last_message_by.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn second_agent_takes_over_without_touching_first_response() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);
        let alice = agent("alice@example.com", "Alice");
        let bob = agent("bob@example.com", "Bob");
        let mut s = Session::new("s", t0);

        say(&mut s, "alice@example.com", "hi");
        resolve_assignment(&mut s, None, Some(&alice), "alice@example.com", &policy(), t0);
        say(&mut s, "bob@example.com", "taking over");
        let out = resolve_assignment(&mut s, None, Some(&bob), "bob@example.com", &policy(), t1);

        assert_eq!(
            out.assignment,
            Assignment::Reassigned {
                from: "alice@example.com".into(),
                to: "bob@example.com".into()
            }
        );
        assert_eq!(s.current_assignee.as_deref(), Some("bob@example.com"));
        assert_eq!(s.first_response_at, Some(t0));
        assert_eq!(s.assignment_history.len(), 2);
        assert_eq!(s.assignment_history[1].took_control_at, t1);
        assert_eq!(
            s.assignment_history.last().map(|r| r.agent.as_str()),
            s.current_assignee.as_deref()
        );
    }

    #[test]
    fn same_agent_again_adds_no_history() {
        let alice = agent("alice@example.com", "Alice");
        let mut s = Session::new("s", Utc::now());
        say(&mut s, "alice@example.com", "one");
        resolve_assignment(&mut s, None, Some(&alice), "x", &policy(), Utc::now());
        say(&mut s, "alice@example.com", "two");
        let out = resolve_assignment(&mut s, None, Some(&alice), "x", &policy(), Utc::now());
        assert_eq!(out.assignment, Assignment::Unchanged);
        assert_eq!(s.assignment_history.len(), 1);
    }

    #[test]
    fn guest_message_ignores_candidate() {
        let alice = agent("alice@example.com", "Alice");
        let mut s = Session::new("s", Utc::now());
        say(&mut s, "Guest", "hello");
        let out = resolve_assignment(&mut s, None, Some(&alice), "x", &policy(), Utc::now());
        assert_eq!(out.assignment, Assignment::Unchanged);
        assert!(s.current_assignee.is_none());
    }

    #[test]
    fn automation_reopens_unrated_resolved_session() {
        let mut s = Session::new("s", Utc::now());
        s.resolved = true;
        say(&mut s, "Guest", "one more thing");
        let out = resolve_assignment(&mut s, None, None, BOT, &policy(), Utc::now());
        assert!(out.reopened);
        assert!(!s.resolved);
    }

    #[test]
    fn automation_closing_a_session_does_not_reopen_it() {
        let mut stored = Session::new("s", Utc::now());
        say(&mut stored, "Guest", "thanks, that's all");

        let mut staged = stored.clone();
        staged.resolved = true;
        let out = resolve_assignment(&mut staged, Some(&stored), None, BOT, &policy(), Utc::now());

        assert!(!out.reopened);
        assert!(staged.resolved);

        say(&mut staged, "Guest", "actually, one more thing");
        let closed = stored_after(&staged);
        let out = resolve_assignment(&mut staged, Some(&closed), None, BOT, &policy(), Utc::now());
        assert!(out.reopened);
        assert!(!staged.resolved);
    }

    /// The stored copy of `staged` before its last message was appended.
    fn stored_after(staged: &Session) -> Session {
        let mut s = staged.clone();
        s.messages.pop();
        s
    }

    #[test]
    fn rated_or_non_automation_sessions_stay_resolved() {
        let mut rated = Session::new("s", Utc::now());
        rated.resolved = true;
        rated.ratings = Some(0.8);
        say(&mut rated, "Guest", "thanks");
        assert!(!resolve_assignment(&mut rated, None, None, BOT, &policy(), Utc::now()).reopened);
        assert!(rated.resolved);

        let mut other = Session::new("s", Utc::now());
        other.resolved = true;
        say(&mut other, "Guest", "thanks");
        let out = resolve_assignment(&mut other, None, None, "agent@example.com", &policy(), Utc::now());
        assert!(!out.reopened);
        assert!(other.resolved);

        let mut unconfigured = Session::new("s", Utc::now());
        unconfigured.resolved = true;
        say(&mut unconfigured, "Guest", "thanks");
        let out = resolve_assignment(
            &mut unconfigured,
            None,
            None,
            BOT,
            &AssignmentPolicy::default(),
            Utc::now(),
        );
        assert!(!out.reopened);
    }

    #[test]
    fn ratings_attributed_only_when_both_change() {
        let alice = agent("alice@example.com", "Alice");
        let mut s = Session::new("s", Utc::now());
        say(&mut s, "alice@example.com", "done?");
        resolve_assignment(&mut s, None, Some(&alice), "x", &policy(), Utc::now());
        let persisted = s.clone();

        let mut only_rating = persisted.clone();
        only_rating.ratings = Some(1.0);
        let out = resolve_assignment(&mut only_rating, Some(&persisted), Some(&alice), "x", &policy(), Utc::now());
        assert!(!out.ratings_attributed);
        assert!(only_rating.ratings_given_to.is_none());

        let mut both = persisted.clone();
        both.ratings = Some(1.0);
        both.feedback = Some("great".into());
        let out = resolve_assignment(&mut both, Some(&persisted), Some(&alice), "x", &policy(), Utc::now());
        assert!(out.ratings_attributed);
        assert_eq!(both.ratings_given_to.as_deref(), Some("alice@example.com"));
    }
}
