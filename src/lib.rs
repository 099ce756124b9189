pub mod error;
pub mod hierarchy;
pub mod models;
pub mod permissions;
pub mod workflow;

pub mod prelude {
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::hierarchy::{HierarchyDiagnostic, build_hierarchy_tree, hierarchy_diagnostics};
    pub use crate::models::{
        EscalationRecord, EscalatorRef, HierarchyNode, HierarchyNodeId, HierarchyNodePayload,
        HistoryEntry, IssueId, IssueStatus, IssueTask, TreeNode, UserId,
    };
    pub use crate::permissions::{
        HISTORY_ACTION_ACCEPTED, can_escalate, can_mark_in_progress, can_resolve,
    };
    pub use crate::workflow::{ALL_TASK_ACTIONS, TaskAction, authorize, permitted_actions};
}
