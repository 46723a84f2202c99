//! Decision log (actor pattern)
//!
//! A bounded, insertion-ordered history of successful decisions. A single
//! actor task owns the buffer; handles talk to it over an unbounded channel so
//! appends never block and are never dropped while the actor is alive.

use crate::orchestration::Decision;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};

/// Query parameters for [`DecisionLog::query`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFilter {
    /// Only decisions for this event type
    #[serde(default)]
    pub event_type: Option<String>,
    /// Maximum number of decisions returned; `None` returns every match
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Result of a decision query, most recent first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionPage {
    /// Number of retained decisions matching the filter, before `limit`
    pub total: usize,
    pub decisions: Vec<Decision>,
}

/// Fixed-capacity FIFO of decisions
#[derive(Debug)]
pub struct DecisionBuffer {
    entries: VecDeque<Decision>,
    capacity: usize,
}

impl DecisionBuffer {
    /// `capacity` is clamped to at least one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, returning the evicted oldest entry when full
    pub fn push(&mut self, decision: Decision) -> Option<Decision> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(decision);
        evicted
    }

    pub fn query(&self, filter: &DecisionFilter) -> DecisionPage {
        let total = self.matching(filter).count();
        let decisions = self
            .matching(filter)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        DecisionPage { total, decisions }
    }

    fn matching<'a>(&'a self, filter: &'a DecisionFilter) -> impl Iterator<Item = &'a Decision> {
        self.entries.iter().rev().filter(move |d| {
            filter
                .event_type
                .as_deref()
                .is_none_or(|event_type| d.event_type == event_type)
        })
    }

    /// Oldest retained decision
    pub fn oldest(&self) -> Option<&Decision> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

enum LogCommand {
    Append(Decision),
    Query(DecisionFilter, oneshot::Sender<DecisionPage>),
    Len(oneshot::Sender<usize>),
}

/// Handle to the decision log actor
#[derive(Clone)]
pub struct DecisionLog {
    sender: mpsc::UnboundedSender<LogCommand>,
}

impl DecisionLog {
    /// Start the actor; must be called from within a Tokio runtime
    pub fn spawn(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let actor = DecisionLogActor {
            receiver,
            buffer: DecisionBuffer::new(capacity),
        };
        tokio::spawn(actor.run());
        Self { sender }
    }

    /// Record a decision without waiting
    pub fn append(&self, decision: Decision) {
        if self.sender.send(LogCommand::Append(decision)).is_err() {
            tracing::error!("Decision log actor has stopped; decision not recorded");
        }
    }

    /// Decisions matching `filter`, most recent first
    pub async fn query(&self, filter: DecisionFilter) -> DecisionPage {
        let (reply, response) = oneshot::channel();
        if self.sender.send(LogCommand::Query(filter, reply)).is_err() {
            tracing::error!("Decision log actor has stopped; returning empty page");
            return DecisionPage::default();
        }
        response.await.unwrap_or_default()
    }

    /// Number of retained decisions
    pub async fn len(&self) -> usize {
        let (reply, response) = oneshot::channel();
        if self.sender.send(LogCommand::Len(reply)).is_err() {
            return 0;
        }
        response.await.unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct DecisionLogActor {
    receiver: mpsc::UnboundedReceiver<LogCommand>,
    buffer: DecisionBuffer,
}

impl DecisionLogActor {
    async fn run(mut self) {
        tracing::debug!(capacity = self.buffer.capacity(), "Decision log started");

        while let Some(command) = self.receiver.recv().await {
            match command {
                LogCommand::Append(decision) => {
                    if let Some(evicted) = self.buffer.push(decision) {
                        tracing::trace!(
                            evicted_event_type = %evicted.event_type,
                            evicted_timestamp = %evicted.timestamp,
                            "Decision log full, evicted oldest entry"
                        );
                    }
                }
                LogCommand::Query(filter, reply) => {
                    let _ = reply.send(self.buffer.query(&filter));
                }
                LogCommand::Len(reply) => {
                    let _ = reply.send(self.buffer.len());
                }
            }
        }

        tracing::debug!("Decision log stopped");
    }
}
