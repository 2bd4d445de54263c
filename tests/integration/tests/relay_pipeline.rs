//! End-to-end relay tests over an in-process log.
//!
//! These exercise the full broker: ingestion through the ordering gate,
//! routing between streams, throttled dispatch, and the task worker's
//! fetch path against a local HTTP server.

use async_trait::async_trait;
use msgbridge_broker::{
    AttachmentStore, Broker, BrokerError, DeliveryReceipt, KvStore, LogHandles, MemoryKvStore,
    PlatformAdapter, UploadReceipt,
};
use msgbridge_core::config::Config;
use msgbridge_core::types::{
    IncomingEvent, IncomingMessage, MessageComponent, MessageMetadata, OutgoingMessage,
    SenderInfo, StoredFile, Task, TaskOutput, TaskResult,
};
use msgbridge_queue::{Consumer, MemoryLog, Producer, StreamLog, TaskClient};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Default)]
struct RecordingAdapter {
    delivered: Mutex<Vec<String>>,
}

#[async_trait]
impl PlatformAdapter for RecordingAdapter {
    async fn deliver(
        &self,
        message: &OutgoingMessage,
    ) -> Result<DeliveryReceipt, BrokerError> {
        let body = match message.components.first() {
            Some(MessageComponent::Text { body }) => body.clone(),
            _ => String::new(),
        };
        let mut delivered = self.delivered.lock();
        delivered.push(body);
        Ok(DeliveryReceipt {
            message_id: format!("m-{}", delivered.len()),
        })
    }

    async fn upload_attachment(
        &self,
        _path: &Path,
        file: &StoredFile,
        _target: &str,
    ) -> Result<UploadReceipt, BrokerError> {
        Ok(UploadReceipt {
            attachment_id: file.uuid.to_string(),
            url: String::new(),
        })
    }
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.delivery.throttle_interval_ms = 1;
    config.attachments.root = root.to_path_buf();
    config
}

fn requester(log: &Arc<MemoryLog>, config: &Config, group: &str) -> TaskClient {
    TaskClient::new(
        Producer::new(log.clone() as Arc<dyn StreamLog>, &config.streams.task),
        Consumer::with_identity(
            log.clone() as Arc<dyn StreamLog>,
            log.clone() as Arc<dyn StreamLog>,
            &config.streams.task_response,
            group,
            "poller",
            CancellationToken::new(),
        ),
    )
}

fn incoming(body: &str) -> IncomingEvent {
    IncomingEvent::Message(IncomingMessage {
        metadata: MessageMetadata {
            channel_id: "room-1".to_string(),
            uuid: Uuid::new_v4(),
            quoted_id: None,
        },
        timestamp: chrono::Utc::now(),
        sender: SenderInfo {
            id: "u-1".to_string(),
            display_name: "someone".to_string(),
        },
        components: vec![MessageComponent::Text {
            body: body.to_string(),
        }],
    })
}

fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(1, 1));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Submit a fetch task, let the worker download and store the attachment,
/// and confirm the response round trip leaves nothing pending.
#[tokio::test]
async fn test_fetch_task_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/attachment.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(tiny_png())
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let log = Arc::new(MemoryLog::new());
    let broker = Arc::new(Broker::new(
        config.clone(),
        LogHandles::single(log.clone() as Arc<dyn StreamLog>),
        Arc::new(RecordingAdapter::default()),
        Arc::new(MemoryKvStore::new()),
    ));
    let run = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.run().await })
    };

    let mut client = requester(&log, &config, "req-fetch");
    let uuid = Uuid::new_v4();
    client
        .submit(&Task::FetchAttachment {
            uuid,
            url: format!("{}/attachment.png", server.url()),
            mime_hint: None,
        })
        .await
        .unwrap();

    let response = client.poll_response(uuid).await.unwrap();
    let file = match response.result {
        TaskResult::Success {
            output: TaskOutput::Fetched { file },
        } => file,
        ref other => panic!("unexpected result: {other:?}"),
    };
    assert_eq!(file.uuid, uuid);
    assert_eq!(file.mime, "image/png");

    let store = AttachmentStore::open(dir.path()).unwrap();
    assert!(store.path_for(&file).exists());

    broker.request_shutdown();
    run.await.unwrap().unwrap();

    // Nothing left in flight on either side of the correlation.
    assert_eq!(
        log.pending_count(&config.streams.task, "consumers", "consumer"),
        0
    );
    assert_eq!(
        log.pending_count(&config.streams.task_response, "req-fetch", "poller"),
        0
    );
}

/// Full relay: ingest inbound events, route them to the outgoing stream,
/// and watch the dispatcher deliver them in order with sent-id bookkeeping.
#[tokio::test]
async fn test_ingest_route_deliver() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let log = Arc::new(MemoryLog::new());
    let adapter = Arc::new(RecordingAdapter::default());
    let kv = Arc::new(MemoryKvStore::new());
    let broker = Arc::new(Broker::new(
        config.clone(),
        LogHandles::single(log.clone() as Arc<dyn StreamLog>),
        adapter.clone(),
        kv.clone(),
    ));
    let run = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.run().await })
    };

    let ingestor = broker.ingestor();
    let bodies = ["one", "two", "three"];
    for body in bodies {
        ingestor.ingest(async { Ok(incoming(body)) }).await.unwrap();
    }

    // Routing layer: echo every incoming message back out.
    let mut inbound: Consumer<IncomingEvent> = Consumer::new(
        log.clone() as Arc<dyn StreamLog>,
        log.clone() as Arc<dyn StreamLog>,
        &config.streams.incoming,
        CancellationToken::new(),
    );
    let outbound: Producer<OutgoingMessage> =
        Producer::new(log.clone() as Arc<dyn StreamLog>, &config.streams.outgoing);

    let mut uuids = Vec::new();
    for _ in bodies {
        let (id, event) = inbound.next().await.unwrap();
        let message = match event {
            IncomingEvent::Message(msg) => OutgoingMessage {
                metadata: msg.metadata,
                components: msg.components,
            },
            ref other => panic!("unexpected event: {other:?}"),
        };
        uuids.push(message.metadata.uuid);
        outbound.push(&message).await.unwrap();
        inbound.commit(id).await.unwrap();
    }

    // Every delivery is acknowledged on the response stream.
    let mut client = requester(&log, &config, "req-relay");
    for &uuid in &uuids {
        let response = client.poll_response(uuid).await.unwrap();
        assert!(response.is_success());
        // The correlation id maps to the platform-assigned message id.
        assert!(kv
            .get(&format!("sent:{uuid}"))
            .await
            .unwrap()
            .is_some());
    }

    assert_eq!(*adapter.delivered.lock(), ["one", "two", "three"]);

    broker.request_shutdown();
    run.await.unwrap().unwrap();
    assert_eq!(
        log.pending_count(&config.streams.outgoing, "consumers", "consumer"),
        0
    );
}
