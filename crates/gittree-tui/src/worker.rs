//! Background work and the messages it posts back
//!
//! The navigator never awaits anything. It returns [`Effect`]s; the
//! [`Worker`] runs each one as a tokio task and posts the outcome, stamped
//! with its generation, to the UI loop's inbox.

use gittree_core::{CommitDetails, CommitId, Generation, MutationRequest, Result};
use gittree_git::{ActionDispatcher, Batch, CommitSource};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Work the navigator asks for
pub enum Effect {
    /// Pull `count` records after the first `offset` from `source`
    Pull {
        generation: Generation,
        source: Arc<dyn CommitSource>,
        offset: usize,
        count: usize,
    },
    /// Run a mutation through the dispatcher
    Dispatch(MutationRequest),
    /// Load the details pane for `id`
    LoadDetails {
        generation: Generation,
        source: Arc<dyn CommitSource>,
        id: CommitId,
    },
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Pull {
                generation,
                offset,
                count,
                ..
            } => f
                .debug_struct("Pull")
                .field("generation", generation)
                .field("offset", offset)
                .field("count", count)
                .finish(),
            Effect::Dispatch(request) => f.debug_tuple("Dispatch").field(request).finish(),
            Effect::LoadDetails { generation, id, .. } => f
                .debug_struct("LoadDetails")
                .field("generation", generation)
                .field("id", id)
                .finish(),
        }
    }
}

/// Results posted to the UI loop
#[derive(Debug)]
pub enum WorkerMessage {
    Batch {
        generation: Generation,
        offset: usize,
        result: Result<Batch>,
    },
    ActionFinished {
        request: MutationRequest,
        result: Result<()>,
    },
    Details {
        generation: Generation,
        id: CommitId,
        result: Result<CommitDetails>,
    },
    /// HEAD or refs changed on disk
    RepositoryChanged,
}

/// Runs effects as tokio tasks
#[derive(Clone)]
pub struct Worker {
    inbox: mpsc::UnboundedSender<WorkerMessage>,
    dispatcher: ActionDispatcher,
}

impl Worker {
    pub fn new(inbox: mpsc::UnboundedSender<WorkerMessage>, dispatcher: ActionDispatcher) -> Self {
        Self { inbox, dispatcher }
    }

    pub fn run_all(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.run(effect);
        }
    }

    /// Spawn the task for one effect. Must be called within a tokio runtime.
    pub fn run(&self, effect: Effect) {
        debug!(?effect, "spawning");
        let inbox = self.inbox.clone();
        match effect {
            Effect::Pull {
                generation,
                source,
                offset,
                count,
            } => {
                tokio::spawn(async move {
                    let result = source.pull(offset, count).await;
                    // The UI may be gone; nothing left to report to
                    let _ = inbox.send(WorkerMessage::Batch {
                        generation,
                        offset,
                        result,
                    });
                });
            }
            Effect::Dispatch(request) => {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    let result = dispatcher.dispatch(request.clone()).await;
                    let _ = inbox.send(WorkerMessage::ActionFinished { request, result });
                });
            }
            Effect::LoadDetails {
                generation,
                source,
                id,
            } => {
                tokio::spawn(async move {
                    let result = source.details(&id).await;
                    let _ = inbox.send(WorkerMessage::Details {
                        generation,
                        id,
                        result,
                    });
                });
            }
        }
    }
}
