// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transfer chain reconstruction.
//!
//! Chains are derived on demand from parent links and never stored. Children
//! are kept in discovery order (the order sessions were registered), and the
//! forward `history` follows the first child only.

use std::collections::{HashMap, HashSet, VecDeque};

use ticketrail_core::{ChainRole, SequenceId, TransferType};
use ticketrail_ingest::decode_agent_identity;
use tracing::warn;

use crate::session::Session;

/// Parent/child adjacency over one contact's sessions.
#[derive(Debug)]
pub struct TransferGraph<'a> {
    by_id: HashMap<&'a SequenceId, &'a Session>,
    children: HashMap<&'a SequenceId, Vec<&'a SequenceId>>,
}

impl<'a> TransferGraph<'a> {
    /// Builds the graph. `sessions` must be in discovery order.
    pub fn build(sessions: &'a [Session]) -> Self {
        let by_id: HashMap<&SequenceId, &Session> =
            sessions.iter().map(|s| (&s.seq_id, s)).collect();
        let mut children: HashMap<&SequenceId, Vec<&SequenceId>> = HashMap::new();
        for session in sessions {
            if let Some(parent) = &session.parent_seq_id
                && parent != &session.seq_id
                && let Some((parent_key, _)) = by_id.get_key_value(parent)
            {
                children.entry(*parent_key).or_default().push(&session.seq_id);
            }
        }
        Self { by_id, children }
    }

    pub fn get(&self, id: &SequenceId) -> Option<&'a Session> {
        self.by_id.get(id).copied()
    }

    /// The parent id, when it resolves to a known session.
    pub fn resolved_parent(&self, id: &SequenceId) -> Option<&'a SequenceId> {
        let parent = self.get(id)?.parent_seq_id.as_ref()?;
        self.by_id.get_key_value(parent).map(|(key, _)| *key)
    }

    pub fn is_transfer_target(&self, id: &SequenceId) -> bool {
        self.resolved_parent(id).is_some()
    }

    pub fn children(&self, id: &SequenceId) -> &[&'a SequenceId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: &SequenceId) -> bool {
        !self.children(id).is_empty()
    }

    /// Walks parent links until none resolves. A cycle is cut at the first
    /// revisited session.
    pub fn root_of(&self, id: &SequenceId) -> Option<&'a SequenceId> {
        let mut current: &'a SequenceId = *self.by_id.get_key_value(id)?.0;
        let mut seen: HashSet<&SequenceId> = HashSet::from([current]);
        while let Some(parent) = self.resolved_parent(current) {
            if !seen.insert(parent) {
                warn!(seq_id = %id, at = %parent, "parent cycle detected, cutting chain");
                break;
            }
            current = parent;
        }
        Some(current)
    }

    /// Ids from `root` to its deepest first-child-only descendant.
    pub fn history(&self, root: &SequenceId) -> Vec<SequenceId> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(root);
        while let Some(id) = current {
            if !seen.insert(id.clone()) {
                break;
            }
            path.push(id.clone());
            current = self.children(id).first().copied();
        }
        path
    }

    /// The root and all its descendants, ordered by open time (discovery
    /// order breaks ties).
    pub fn members(&self, root: &SequenceId) -> Vec<&'a Session> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&SequenceId> = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(session) = self.get(id) {
                out.push(session);
            }
            queue.extend(self.children(id).iter().copied());
        }
        out.sort_by_key(|s| s.opened_at);
        out
    }
}

/// Transfer annotations for one chain member.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    pub ticket_id: SequenceId,
    pub parent_ticket: Option<SequenceId>,
    pub child_tickets: Vec<SequenceId>,
    pub chain_role: ChainRole,
    pub is_transfer: bool,
    pub transferred: bool,
    pub transfer_type: Option<TransferType>,
    pub transferred_to_agent: Option<String>,
}

/// A resolved chain: root, forward history, terminal member, and one link
/// per member ordered by open time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferChain {
    pub root: SequenceId,
    pub history: Vec<SequenceId>,
    pub terminal: SequenceId,
    pub links: Vec<ChainLink>,
}

impl TransferChain {
    pub fn transfer_count(&self) -> usize {
        self.history.len().saturating_sub(1)
    }
}

/// Resolves the chain containing `id` over one contact's sessions.
///
/// The terminal member is the one opened last. When it is not the end of the
/// first-child history the mismatch is logged and the open-time rule wins.
pub fn build_chain(sessions: &[Session], id: &SequenceId) -> Option<TransferChain> {
    let graph = TransferGraph::build(sessions);
    let root = graph.root_of(id)?;
    let history = graph.history(root);
    let members = graph.members(root);
    let terminal = members.last()?.seq_id.clone();

    if history.last() != Some(&terminal) {
        warn!(
            root = %root,
            terminal = %terminal,
            history_end = ?history.last().map(SequenceId::as_str),
            "latest-opened session is not the end of the transfer history"
        );
    }

    let links = members
        .iter()
        .map(|session| {
            let children: Vec<SequenceId> = graph
                .children(&session.seq_id)
                .iter()
                .map(|c| (*c).clone())
                .collect();
            let (transfer_type, transferred_to_agent) = match children.first() {
                None => (None, None),
                Some(first) => match graph
                    .get(first)
                    .and_then(|child| child.target_agent_identity.as_deref())
                {
                    Some(identity) => {
                        (Some(TransferType::Agent), Some(decode_agent_identity(identity)))
                    }
                    None => (Some(TransferType::Queue), None),
                },
            };
            ChainLink {
                ticket_id: session.seq_id.clone(),
                parent_ticket: graph.resolved_parent(&session.seq_id).cloned(),
                child_tickets: children,
                chain_role: if &session.seq_id == root {
                    ChainRole::Root
                } else {
                    ChainRole::TransferTarget
                },
                is_transfer: graph.is_transfer_target(&session.seq_id),
                transferred: session.seq_id != terminal,
                transfer_type,
                transferred_to_agent,
            }
        })
        .collect();

    Some(TransferChain {
        root: root.clone(),
        history,
        terminal,
        links,
    })
}
