//! Broker wiring: ingestion, dispatch, and shutdown.

use crate::adapter::PlatformAdapter;
use crate::attachment::{AttachmentStore, Fetcher};
use crate::kv::{KvStore, Prefixed};
use crate::throttle::Throttle;
use crate::worker::TaskWorker;
use crate::{BrokerError, Result};
use msgbridge_core::config::Config;
use msgbridge_core::types::{IncomingEvent, OutgoingMessage, TaskOutput, TaskResponse};
use msgbridge_queue::{Consumer, EntryId, OrderingGate, Producer, StreamLog};
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Log connections split by role.
///
/// A blocking group read parks its connection, so each long-lived reader
/// gets a dedicated handle; appends and administrative calls (group setup,
/// pending ranges, acks) share the other two.
#[derive(Clone)]
pub struct LogHandles {
    /// Appends from producers.
    pub producer: Arc<dyn StreamLog>,

    /// Group administration and acknowledgments.
    pub admin: Arc<dyn StreamLog>,

    /// Dedicated handle parked on the outgoing stream.
    pub outgoing_reader: Arc<dyn StreamLog>,

    /// Dedicated handle parked on the task stream.
    pub task_reader: Arc<dyn StreamLog>,
}

impl LogHandles {
    /// Use one connection for every role.
    ///
    /// Fine for in-process logs, where a parked read holds no connection.
    pub fn single(log: Arc<dyn StreamLog>) -> Self {
        Self {
            producer: log.clone(),
            admin: log.clone(),
            outgoing_reader: log.clone(),
            task_reader: log,
        }
    }
}

/// Outcome of a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// This call started the drain.
    Initiated,

    /// A drain was already in progress; nothing further happens.
    InProgress,

    /// The broker had already stopped.
    Finished,
}

const RUNNING: u8 = 0;
const DRAINING: u8 = 1;
const FINISHED: u8 = 2;

/// Cloneable handle through which platform event handlers relay inbound
/// events.
#[derive(Clone)]
pub struct Ingestor {
    gate: OrderingGate,
    incoming: Arc<Producer<IncomingEvent>>,
}

impl Ingestor {
    /// Relay one inbound event, preserving handler start order.
    ///
    /// The gate ticket is enrolled synchronously, in this call, so the
    /// append order on the incoming stream equals the order `ingest` was
    /// called in even when preparation finishes out of order. A failed
    /// preparation drops its ticket, which releases the next one.
    pub fn ingest<F>(&self, prepare: F) -> impl Future<Output = Result<EntryId>>
    where
        F: Future<Output = Result<IncomingEvent>>,
    {
        let mut ticket = self.gate.enroll();
        let incoming = self.incoming.clone();
        async move {
            let event = prepare.await?;

            ticket.ready().await?;
            info!("{}", event.summarize());
            let id = incoming.push(&event).await?;
            ticket.commit();
            Ok(id)
        }
    }
}

/// Outgoing dispatch loop.
struct Dispatcher {
    outgoing: Consumer<OutgoingMessage>,
    responses: Producer<TaskResponse>,
    adapter: Arc<dyn PlatformAdapter>,
    throttle: Throttle,
    sent_ids: Prefixed,
}

impl Dispatcher {
    async fn run(mut self) -> Result<()> {
        loop {
            let (id, message) = match self.outgoing.next().await {
                Ok(entry) => entry,
                Err(err) if err.is_interrupted() => {
                    info!("dispatch loop interrupted, stopping");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            self.throttle.acquire().await;

            let uuid = message.metadata.uuid;
            match self.adapter.deliver(&message).await {
                Ok(receipt) => {
                    debug!(%uuid, message_id = %receipt.message_id, "message delivered");
                    self.sent_ids
                        .set(&uuid.to_string(), &receipt.message_id)
                        .await?;
                    self.responses
                        .push(&TaskResponse::success(
                            uuid,
                            TaskOutput::Sent {
                                message_id: receipt.message_id,
                            },
                        ))
                        .await?;
                }
                Err(err) => {
                    // An envelope the platform rejects would be redelivered
                    // forever if left pending, stalling every entry behind
                    // it. Log it with its payload and move on.
                    let payload = serde_json::to_string(&message).unwrap_or_default();
                    error!(%uuid, %id, %err, payload, "delivery failed, dropping envelope");
                }
            }
            self.outgoing.commit(id).await?;
        }
    }
}

/// Ties the relay loops together over one platform adapter.
pub struct Broker {
    config: Config,
    handles: LogHandles,
    adapter: Arc<dyn PlatformAdapter>,
    kv: Arc<dyn KvStore>,
    gate: OrderingGate,
    cancel: CancellationToken,
    state: Arc<AtomicU8>,
}

impl Broker {
    pub fn new(
        config: Config,
        handles: LogHandles,
        adapter: Arc<dyn PlatformAdapter>,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            config,
            handles,
            adapter,
            kv,
            gate: OrderingGate::new(),
            cancel: CancellationToken::new(),
            state: Arc::new(AtomicU8::new(RUNNING)),
        }
    }

    /// Handle for platform event handlers to relay inbound events through.
    pub fn ingestor(&self) -> Ingestor {
        Ingestor {
            gate: self.gate.clone(),
            incoming: Arc::new(Producer::new(
                self.handles.producer.clone(),
                self.config.streams.incoming.clone(),
            )),
        }
    }

    /// Run the dispatch and task-worker loops until a shutdown request
    /// drains them.
    pub async fn run(&self) -> Result<()> {
        let store = AttachmentStore::open(&self.config.attachments.root)?;
        let fetcher = Fetcher::new(
            store,
            self.config.attachments.default_mime.clone(),
            self.config.delivery.max_retries,
        );

        // One throttle paces every platform call, dispatch and upload alike.
        let throttle = Throttle::new(Duration::from_millis(
            self.config.delivery.throttle_interval_ms,
        ));

        let worker = TaskWorker::new(
            Consumer::new(
                self.handles.task_reader.clone(),
                self.handles.admin.clone(),
                self.config.streams.task.clone(),
                self.cancel.clone(),
            ),
            Producer::new(
                self.handles.producer.clone(),
                self.config.streams.task_response.clone(),
            ),
            fetcher,
            self.adapter.clone(),
            throttle.clone(),
            self.config.delivery.max_retries,
        );

        let dispatcher = Dispatcher {
            outgoing: Consumer::new(
                self.handles.outgoing_reader.clone(),
                self.handles.admin.clone(),
                self.config.streams.outgoing.clone(),
                self.cancel.clone(),
            ),
            responses: Producer::new(
                self.handles.producer.clone(),
                self.config.streams.task_response.clone(),
            ),
            adapter: self.adapter.clone(),
            throttle,
            sent_ids: Prefixed::new(self.kv.clone(), "sent"),
        };

        info!(
            incoming = %self.config.streams.incoming,
            outgoing = %self.config.streams.outgoing,
            "broker running"
        );

        let mut dispatch = tokio::spawn(dispatcher.run());
        let mut tasks = tokio::spawn(worker.run());

        // Whichever loop finishes first ends the broker. A loop that dies
        // with a substrate error must not leave its sibling parked on a
        // blocking read, so release it before waiting.
        let (first, second) = tokio::select! {
            result = &mut dispatch => (result, &mut tasks),
            result = &mut tasks => (result, &mut dispatch),
        };
        self.gate.terminate();
        self.cancel.cancel();
        let second = second.await;

        self.state.store(FINISHED, Ordering::SeqCst);
        info!("broker stopped");

        flatten_join(first)?;
        flatten_join(second)?;
        Ok(())
    }

    /// Request a drain: terminate the ordering gate and cancel the blocking
    /// reads, letting in-flight work finish.
    ///
    /// Idempotent. Repeated calls report progress instead of escalating.
    pub fn request_shutdown(&self) -> ShutdownSignal {
        match self
            .state
            .compare_exchange(RUNNING, DRAINING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                info!("shutdown requested, draining");
                self.gate.terminate();
                self.cancel.cancel();
                ShutdownSignal::Initiated
            }
            Err(DRAINING) => {
                warn!("shutdown already in progress");
                ShutdownSignal::InProgress
            }
            Err(_) => ShutdownSignal::Finished,
        }
    }
}

fn flatten_join(
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(BrokerError::Aborted(err.to_string())),
    }
}
