use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::Serialize;

use crate::models::{HierarchyNode, HierarchyNodeId, TreeNode};

/// Builds a forest of root nodes from a flat, possibly duplicated collection
/// of hierarchy records.
///
/// Records sharing an id are merged last-write-wins, except `children`, which
/// concatenates. A node whose parent id does not resolve is promoted to a
/// root. Siblings keep the order their records appear in the input; roots keep
/// first-encounter order. The input is never mutated.
pub fn build_hierarchy_tree(records: &[HierarchyNode]) -> Vec<TreeNode> {
    let (order, index) = normalize(records);
    let grouped = group_by_parent(&order, &index);

    let mut visited = vec![false; order.len()];
    let mut roots = Vec::new();
    for (idx, node) in order.iter().enumerate() {
        let is_root = match &node.parent_id {
            None => true,
            Some(parent) => !index.contains_key(parent),
        };
        if is_root {
            if node.parent_id.is_some() {
                tracing::debug!(node_id = %node.id, "dangling parent reference, node promoted to root");
            }
            roots.push(assemble(idx, &order, &grouped, &mut visited));
        }
    }

    // Anything still unvisited sits on a parent cycle. Promote the first
    // encountered member of each cycle to a root; the back edge to an already
    // attached node is dropped during assembly.
    for idx in 0..order.len() {
        if !visited[idx] {
            tracing::warn!(node_id = %order[idx].id, "parent cycle detected, node promoted to root");
            roots.push(assemble(idx, &order, &grouped, &mut visited));
        }
    }

    roots
}

/// Advisory report of structural oddities in a flat hierarchy snapshot. The
/// builder tolerates all of these; callers may want to log them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HierarchyDiagnostic {
    DuplicateNodeId {
        node_id: HierarchyNodeId,
        occurrences: usize,
    },
    DanglingParentReference {
        node_id: HierarchyNodeId,
        parent_id: HierarchyNodeId,
    },
    ParentCycle {
        member_ids: Vec<HierarchyNodeId>,
    },
}

pub fn hierarchy_diagnostics(records: &[HierarchyNode]) -> Vec<HierarchyDiagnostic> {
    let (order, index) = normalize(records);
    let grouped = group_by_parent(&order, &index);

    let mut occurrences: HashMap<&HierarchyNodeId, usize> = HashMap::with_capacity(order.len());
    for record in records {
        *occurrences.entry(&record.id).or_insert(0) += 1;
    }

    let mut diagnostics = Vec::new();
    for node in &order {
        if let Some(count) = occurrences.get(&node.id)
            && *count > 1
        {
            diagnostics.push(HierarchyDiagnostic::DuplicateNodeId {
                node_id: node.id.clone(),
                occurrences: *count,
            });
        }
    }

    for node in &order {
        if let Some(parent) = &node.parent_id
            && !index.contains_key(parent)
        {
            diagnostics.push(HierarchyDiagnostic::DanglingParentReference {
                node_id: node.id.clone(),
                parent_id: parent.clone(),
            });
        }
    }

    let mut visited = vec![false; order.len()];
    for (idx, node) in order.iter().enumerate() {
        let is_root = match &node.parent_id {
            None => true,
            Some(parent) => !index.contains_key(parent),
        };
        if is_root {
            mark_reachable(idx, &order, &grouped, &mut visited);
        }
    }
    for idx in 0..order.len() {
        if !visited[idx] {
            let mut member_ids = Vec::new();
            collect_component(idx, &order, &grouped, &mut visited, &mut member_ids);
            diagnostics.push(HierarchyDiagnostic::ParentCycle { member_ids });
        }
    }

    diagnostics
}

fn normalize(records: &[HierarchyNode]) -> (Vec<HierarchyNode>, HashMap<HierarchyNodeId, usize>) {
    let mut order: Vec<HierarchyNode> = Vec::with_capacity(records.len());
    let mut index: HashMap<HierarchyNodeId, usize> = HashMap::with_capacity(records.len());

    for record in records {
        match index.entry(record.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(order.len());
                order.push(record.clone());
            }
            Entry::Occupied(slot) => {
                let existing = &mut order[*slot.get()];
                let children = match (existing.children.take(), record.children.clone()) {
                    (Some(mut kept), Some(incoming)) => {
                        kept.extend(incoming);
                        Some(kept)
                    }
                    (Some(kept), None) => Some(kept),
                    (None, incoming) => incoming,
                };
                *existing = HierarchyNode {
                    children,
                    ..record.clone()
                };
            }
        }
    }

    (order, index)
}

fn group_by_parent(
    order: &[HierarchyNode],
    index: &HashMap<HierarchyNodeId, usize>,
) -> HashMap<HierarchyNodeId, Vec<usize>> {
    let mut grouped: HashMap<HierarchyNodeId, Vec<usize>> = HashMap::new();
    for (idx, node) in order.iter().enumerate() {
        if let Some(parent) = &node.parent_id
            && index.contains_key(parent)
        {
            grouped.entry(parent.clone()).or_default().push(idx);
        }
    }
    grouped
}

fn assemble(
    idx: usize,
    order: &[HierarchyNode],
    grouped: &HashMap<HierarchyNodeId, Vec<usize>>,
    visited: &mut Vec<bool>,
) -> TreeNode {
    visited[idx] = true;
    let node = &order[idx];

    // Attachment by parent reference is authoritative: pre-attached children
    // survive only on nodes nothing points at.
    let children = match grouped.get(&node.id) {
        Some(child_indices) => {
            let mut children = Vec::with_capacity(child_indices.len());
            for &child in child_indices {
                if visited[child] {
                    continue;
                }
                children.push(assemble(child, order, grouped, visited));
            }
            children
        }
        None => node
            .children
            .as_deref()
            .map(embed_children)
            .unwrap_or_default(),
    };

    TreeNode {
        id: node.id.clone(),
        parent_id: node.parent_id.clone(),
        name: node.name.clone(),
        description: node.description.clone(),
        active: node.active,
        metadata: node.metadata.clone(),
        children,
    }
}

fn embed_children(records: &[HierarchyNode]) -> Vec<TreeNode> {
    records
        .iter()
        .map(|record| TreeNode {
            id: record.id.clone(),
            parent_id: record.parent_id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            active: record.active,
            metadata: record.metadata.clone(),
            children: record
                .children
                .as_deref()
                .map(embed_children)
                .unwrap_or_default(),
        })
        .collect()
}

fn mark_reachable(
    idx: usize,
    order: &[HierarchyNode],
    grouped: &HashMap<HierarchyNodeId, Vec<usize>>,
    visited: &mut Vec<bool>,
) {
    let mut stack = vec![idx];
    while let Some(current) = stack.pop() {
        if visited[current] {
            continue;
        }
        visited[current] = true;
        if let Some(child_indices) = grouped.get(&order[current].id) {
            stack.extend(child_indices.iter().copied());
        }
    }
}

fn collect_component(
    idx: usize,
    order: &[HierarchyNode],
    grouped: &HashMap<HierarchyNodeId, Vec<usize>>,
    visited: &mut Vec<bool>,
    member_ids: &mut Vec<HierarchyNodeId>,
) {
    let mut stack = vec![idx];
    while let Some(current) = stack.pop() {
        if visited[current] {
            continue;
        }
        visited[current] = true;
        member_ids.push(order[current].id.clone());
        if let Some(child_indices) = grouped.get(&order[current].id) {
            stack.extend(child_indices.iter().copied());
        }
    }
}
