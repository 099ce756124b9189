use crate::models::{HistoryEntry, IssueStatus, IssueTask, UserId};

/// History action recorded when a user takes ownership of an issue.
pub const HISTORY_ACTION_ACCEPTED: &str = "accepted";

/// A user may claim an issue unless it is already in progress or they have
/// escalated it themselves.
pub fn can_mark_in_progress(user: &UserId, status: IssueStatus, issue: &IssueTask) -> bool {
    if status == IssueStatus::InProgress {
        return false;
    }
    !has_escalated(user, issue)
}

/// Only the user who most recently accepted the issue may resolve it, and only
/// while it is in progress.
pub fn can_resolve(user: &UserId, status: IssueStatus, issue: &IssueTask) -> bool {
    if status != IssueStatus::InProgress {
        return false;
    }

    let mut accepted: Vec<&HistoryEntry> = issue
        .history
        .iter()
        .filter(|entry| entry.action == HISTORY_ACTION_ACCEPTED)
        .collect();
    if accepted.is_empty() {
        return false;
    }

    // Stable descending sort: unparsable timestamps order below parsed ones,
    // ties keep filter order.
    accepted.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    accepted[0].user_id == *user
}

/// A user may escalate an in-progress issue at most once.
pub fn can_escalate(user: &UserId, status: IssueStatus, issue: &IssueTask) -> bool {
    if status != IssueStatus::InProgress {
        return false;
    }
    !has_escalated(user, issue)
}

fn has_escalated(user: &UserId, issue: &IssueTask) -> bool {
    issue
        .escalations
        .iter()
        .any(|escalation| escalation.actor_id() == Some(user))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::{can_escalate, can_mark_in_progress, can_resolve};
    use crate::models::{
        EscalationRecord, EscalatorRef, HistoryEntry, IssueId, IssueStatus, IssueTask, UserId,
    };

    fn issue() -> IssueTask {
        IssueTask {
            id: IssueId(Uuid::new_v4()),
            status: IssueStatus::New,
            escalations: vec![],
            history: vec![],
            metadata: json!({}),
        }
    }

    fn escalated_by(user: &str) -> EscalationRecord {
        EscalationRecord {
            escalated_by: Some(UserId::from(user)),
            escalator: None,
        }
    }

    fn accepted(user: &str, created_at: &str) -> HistoryEntry {
        HistoryEntry {
            action: "accepted".to_string(),
            user_id: UserId::from(user),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn in_progress_issue_cannot_be_claimed() {
        let user = UserId::from("u1");
        assert!(!can_mark_in_progress(
            &user,
            IssueStatus::InProgress,
            &issue()
        ));
    }

    #[test]
    fn escalating_user_cannot_claim() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.escalations.push(escalated_by("u1"));
        assert!(!can_mark_in_progress(&user, IssueStatus::New, &task));
    }

    #[test]
    fn nested_escalator_reference_also_blocks_claim() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.escalations.push(EscalationRecord {
            escalated_by: None,
            escalator: Some(EscalatorRef {
                user_id: UserId::from("u1"),
            }),
        });
        assert!(!can_mark_in_progress(&user, IssueStatus::New, &task));
    }

    #[test]
    fn fresh_issue_can_be_claimed() {
        let user = UserId::from("u1");
        assert!(can_mark_in_progress(&user, IssueStatus::New, &issue()));
    }

    #[test]
    fn other_users_escalation_does_not_block_claim() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.escalations.push(escalated_by("u2"));
        assert!(can_mark_in_progress(&user, IssueStatus::New, &task));
    }

    #[test]
    fn resolve_requires_in_progress_status() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.history.push(accepted("u1", "2025-01-01"));
        assert!(!can_resolve(&user, IssueStatus::New, &task));
        assert!(!can_resolve(&user, IssueStatus::Resolved, &task));
    }

    #[test]
    fn resolve_requires_an_accepted_entry() {
        let user = UserId::from("u1");
        assert!(!can_resolve(&user, IssueStatus::InProgress, &issue()));
    }

    #[test]
    fn most_recent_acceptor_may_resolve() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.history.push(accepted("u1", "2025-01-01"));
        assert!(can_resolve(&user, IssueStatus::InProgress, &task));
    }

    #[test]
    fn stale_acceptor_may_not_resolve() {
        let user = UserId::from("u2");
        let mut task = issue();
        task.history.push(accepted("u1", "2025-01-02"));
        task.history.push(accepted("u2", "2025-01-01"));
        assert!(!can_resolve(&user, IssueStatus::InProgress, &task));
        assert!(can_resolve(
            &UserId::from("u1"),
            IssueStatus::InProgress,
            &task
        ));
    }

    #[test]
    fn non_accepted_actions_are_ignored() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.history.push(accepted("u1", "2025-01-01"));
        task.history.push(HistoryEntry {
            action: "commented".to_string(),
            user_id: UserId::from("u2"),
            created_at: "2025-01-03".to_string(),
        });
        assert!(can_resolve(&user, IssueStatus::InProgress, &task));
    }

    #[test]
    fn unparsable_timestamps_never_outrank_parsed_entries() {
        let mut task = issue();
        task.history.push(accepted("u1", "garbage"));
        task.history.push(accepted("u2", "2025-01-01"));
        assert!(!can_resolve(
            &UserId::from("u1"),
            IssueStatus::InProgress,
            &task
        ));
        assert!(can_resolve(
            &UserId::from("u2"),
            IssueStatus::InProgress,
            &task
        ));
    }

    #[test]
    fn equal_timestamps_keep_history_order() {
        let mut task = issue();
        task.history.push(accepted("u1", "2025-01-01"));
        task.history.push(accepted("u2", "2025-01-01"));
        assert!(can_resolve(
            &UserId::from("u1"),
            IssueStatus::InProgress,
            &task
        ));
        assert!(!can_resolve(
            &UserId::from("u2"),
            IssueStatus::InProgress,
            &task
        ));
    }

    #[test]
    fn escalate_requires_in_progress_status() {
        let user = UserId::from("u1");
        assert!(!can_escalate(&user, IssueStatus::New, &issue()));
        assert!(can_escalate(&user, IssueStatus::InProgress, &issue()));
    }

    #[test]
    fn prior_escalation_blocks_a_second_one() {
        let user = UserId::from("u1");
        let mut task = issue();
        task.escalations.push(escalated_by("u1"));
        assert!(!can_escalate(&user, IssueStatus::InProgress, &task));
    }
}
