//! Structured diagnostics produced while rebalancing.
//!
//! None of these conditions are fatal. They are collected during an invocation and returned next
//! to the computed record, so that callers can report or assert on them.

use serde::{Deserialize, Serialize};

/// The kind of a rebalancer diagnostic.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The cluster has no live nodes, so nothing could be assigned.
    NoLiveNodes,
    /// A state's cardinality specifier could not be understood, so the state was skipped.
    InvalidStateCount,
    /// A replica could not be assigned to any live node.
    UnplacedReplica,
    /// A node remains above its capacity after rebalancing.
    OverloadedNode,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::NoLiveNodes => "no live nodes",
                Self::InvalidStateCount => "invalid state count",
                Self::UnplacedReplica => "unplaced replica",
                Self::OverloadedNode => "overloaded node",
            }
        )
    }
}

/// A single rebalancer diagnostic.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    /// The kind of condition observed.
    pub kind: DiagnosticKind,
    /// The resource, state, replica or node which the condition concerns.
    pub subject: String,
}

/// An ordered collection of diagnostics for one invocation.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    log: bool,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create a new instance, optionally mirroring each diagnostic to the log.
    pub fn new(log: bool) -> Self {
        Self { log, items: vec![] }
    }

    /// Record a diagnostic.
    pub fn push(&mut self, kind: DiagnosticKind, subject: impl Into<String>) {
        let subject = subject.into();
        if self.log {
            match kind {
                DiagnosticKind::NoLiveNodes => tracing::debug!(%kind, %subject, "rebalancer diagnostic"),
                _ => tracing::warn!(%kind, %subject, "rebalancer diagnostic"),
            }
        }
        self.items.push(Diagnostic { kind, subject });
    }

    /// Count the diagnostics of the given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.items
    }
}
