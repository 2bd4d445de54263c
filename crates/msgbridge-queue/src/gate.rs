//! FIFO ordering gate for concurrently-prepared effects.
//!
//! Handlers race: one may await a slow profile lookup while a later one is
//! already done. The gate guarantees the *commit* order of their effects
//! equals their enrollment order. A handler enrolls before doing any async
//! work, prepares, awaits its ticket, performs the ordered effect, then
//! commits to release the next ticket.

use crate::{QueueError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// A FIFO gate over enrollment tickets. Cheap to clone; clones share the
/// same queue.
#[derive(Clone, Default)]
pub struct OrderingGate {
    state: Arc<Mutex<GateState>>,
}

#[derive(Default)]
struct GateState {
    waiting: VecDeque<Slot>,
    draining: bool,
    terminated: bool,
}

struct Slot {
    ready: oneshot::Sender<()>,
    committed: oneshot::Receiver<()>,
}

/// A reserved position in the gate's FIFO.
///
/// Dropping a ticket without committing releases the next ticket, so a
/// failed handler cannot wedge the queue.
pub struct Ticket {
    ready: Option<oneshot::Receiver<()>>,
    granted: bool,
    commit: Option<oneshot::Sender<()>>,
}

impl Ticket {
    /// Resolve once every earlier ticket has committed.
    ///
    /// Returns [`QueueError::Interrupted`] if the gate was terminated before
    /// this ticket's turn. Repeated calls keep the first outcome: a granted
    /// position stays granted, an interrupted one stays interrupted.
    pub async fn ready(&mut self) -> Result<()> {
        if self.granted {
            return Ok(());
        }
        match self.ready.take() {
            Some(rx) => match rx.await {
                Ok(()) => {
                    self.granted = true;
                    Ok(())
                }
                Err(_) => Err(QueueError::Interrupted),
            },
            None => Err(QueueError::Interrupted),
        }
    }

    /// Release the next ticket.
    pub fn commit(mut self) {
        if let Some(tx) = self.commit.take() {
            let _ = tx.send(());
        }
    }
}

impl OrderingGate {
    /// Create an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a ticket to the FIFO.
    ///
    /// The drain loop is started lazily on first enrollment and stops when
    /// the queue empties; there is no idle background work.
    pub fn enroll(&self) -> Ticket {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (commit_tx, commit_rx) = oneshot::channel();

        let start_drain = {
            let mut state = self.state.lock();
            if state.terminated {
                // Dropping ready_tx here makes the ticket's ready() fail
                // with Interrupted instead of hanging forever.
                false
            } else {
                state.waiting.push_back(Slot {
                    ready: ready_tx,
                    committed: commit_rx,
                });
                if state.draining {
                    false
                } else {
                    state.draining = true;
                    true
                }
            }
        };

        if start_drain {
            let state = self.state.clone();
            tokio::spawn(drain(state));
        }

        Ticket {
            ready: Some(ready_rx),
            granted: false,
            commit: Some(commit_tx),
        }
    }

    /// Stop draining. Pending tickets' `ready()` calls fail with
    /// [`QueueError::Interrupted`]; an already-released ticket's effect is
    /// not aborted.
    pub fn terminate(&self) {
        let mut state = self.state.lock();
        state.terminated = true;
        // Dropping the slots closes their ready senders.
        state.waiting.clear();
    }

    #[cfg(test)]
    fn is_draining(&self) -> bool {
        self.state.lock().draining
    }
}

async fn drain(state: Arc<Mutex<GateState>>) {
    debug!("ordering gate drain started");
    loop {
        let slot = {
            let mut guard = state.lock();
            if guard.terminated {
                guard.draining = false;
                break;
            }
            match guard.waiting.pop_front() {
                Some(slot) => slot,
                None => {
                    guard.draining = false;
                    break;
                }
            }
        };

        if slot.ready.send(()).is_err() {
            // Enrollee dropped its ticket before its turn; skip it.
            continue;
        }
        // Err means the ticket was dropped mid-effect; release the next
        // ticket either way.
        let _ = slot.committed.await;
    }
    debug!("ordering gate drain stopped");
}
