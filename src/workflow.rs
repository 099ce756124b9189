use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::{LibError, Result};
use crate::models::{IssueStatus, IssueTask, UserId};
use crate::permissions;

/// User-initiated issue transitions. The workflow layer only answers whether a
/// transition is permitted; recording the transition belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskAction {
    MarkInProgress,
    Resolve,
    Escalate,
}

pub const ALL_TASK_ACTIONS: &[TaskAction] = &[
    TaskAction::MarkInProgress,
    TaskAction::Resolve,
    TaskAction::Escalate,
];

impl TaskAction {
    pub const fn as_db_value(self) -> &'static str {
        match self {
            TaskAction::MarkInProgress => "mark_in_progress",
            TaskAction::Resolve => "resolve",
            TaskAction::Escalate => "escalate",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "mark_in_progress" => Some(TaskAction::MarkInProgress),
            "resolve" => Some(TaskAction::Resolve),
            "escalate" => Some(TaskAction::Escalate),
            _ => None,
        }
    }

    /// Status the issue enters when the action is carried out.
    pub const fn target_status(self) -> IssueStatus {
        match self {
            TaskAction::MarkInProgress => IssueStatus::InProgress,
            TaskAction::Resolve => IssueStatus::Resolved,
            TaskAction::Escalate => IssueStatus::Escalated,
        }
    }

    pub fn is_permitted(self, actor: &UserId, status: IssueStatus, issue: &IssueTask) -> bool {
        match self {
            TaskAction::MarkInProgress => permissions::can_mark_in_progress(actor, status, issue),
            TaskAction::Resolve => permissions::can_resolve(actor, status, issue),
            TaskAction::Escalate => permissions::can_escalate(actor, status, issue),
        }
    }

    const fn denial_code(self) -> &'static str {
        match self {
            TaskAction::MarkInProgress => "task_mark_in_progress_denied",
            TaskAction::Resolve => "task_resolve_denied",
            TaskAction::Escalate => "task_escalate_denied",
        }
    }

    const fn denial_message(self) -> &'static str {
        match self {
            TaskAction::MarkInProgress => "You cannot mark this issue as in progress",
            TaskAction::Resolve => "You cannot resolve this issue",
            TaskAction::Escalate => "You cannot escalate this issue",
        }
    }
}

/// Checks a transition for an actor against the issue's current status,
/// converting a denial into a `Forbidden` error with a per-action code.
pub fn authorize(actor: &UserId, action: TaskAction, issue: &IssueTask) -> Result<()> {
    if action.is_permitted(actor, issue.status, issue) {
        return Ok(());
    }

    tracing::debug!(
        issue_id = %issue.id,
        actor = %actor,
        action = action.as_db_value(),
        status = issue.status.as_db_value(),
        "task action denied"
    );
    Err(LibError::forbidden_with_code(
        action.denial_code(),
        action.denial_message(),
        anyhow!(
            "user {} may not {} issue {} in status {}",
            actor,
            action.as_db_value(),
            issue.id,
            issue.status.as_db_value()
        ),
    ))
}

/// Actions the actor may currently take on the issue. Drives button state in
/// task detail views.
pub fn permitted_actions(actor: &UserId, issue: &IssueTask) -> Vec<TaskAction> {
    ALL_TASK_ACTIONS
        .iter()
        .copied()
        .filter(|action| action.is_permitted(actor, issue.status, issue))
        .collect()
}
