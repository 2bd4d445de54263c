//! Task worker: executes delegated attachment operations.

use crate::adapter::PlatformAdapter;
use crate::attachment::Fetcher;
use crate::throttle::Throttle;
use crate::Result;
use msgbridge_core::types::{Task, TaskOutput, TaskResponse};
use msgbridge_queue::{retry, Consumer, Producer};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consumes tasks from the task stream and broadcasts exactly one response
/// per task on the response stream.
///
/// The response is pushed *before* the task entry is committed, so a crash
/// between the two can only duplicate a response, never lose one. Requesters
/// already tolerate duplicates because they match by correlation id.
pub struct TaskWorker {
    tasks: Consumer<Task>,
    responses: Producer<TaskResponse>,
    fetcher: Fetcher,
    adapter: Arc<dyn PlatformAdapter>,
    throttle: Throttle,
    max_retries: u32,
}

impl TaskWorker {
    pub fn new(
        tasks: Consumer<Task>,
        responses: Producer<TaskResponse>,
        fetcher: Fetcher,
        adapter: Arc<dyn PlatformAdapter>,
        throttle: Throttle,
        max_retries: u32,
    ) -> Self {
        Self {
            tasks,
            responses,
            fetcher,
            adapter,
            throttle,
            max_retries,
        }
    }

    /// Run until the consumer's cancellation token fires.
    ///
    /// Execution failures become error responses and the loop continues;
    /// only substrate failures abort the worker.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let (id, task) = match self.tasks.next().await {
                Ok(entry) => entry,
                Err(err) if err.is_interrupted() => {
                    info!("task worker interrupted, stopping");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let uuid = task.uuid();
            debug!(%uuid, %id, "executing task");

            let response = match self.execute(task).await {
                Ok(output) => TaskResponse::success(uuid, output),
                Err(err) => {
                    warn!(%uuid, %err, "task failed");
                    TaskResponse::error(uuid, err.to_string())
                }
            };

            self.responses.push(&response).await?;
            self.tasks.commit(id).await?;
        }
    }

    async fn execute(&self, task: Task) -> Result<TaskOutput> {
        match task {
            Task::FetchAttachment {
                uuid,
                url,
                mime_hint,
            } => {
                let file = self.fetcher.fetch(uuid, &url, mime_hint.as_deref()).await?;
                Ok(TaskOutput::Fetched { file })
            }
            Task::UploadAttachment { file, target, .. } => {
                let path = self.fetcher.store().path_for(&file);
                // Uploads share the dispatcher's throttle; every attempt
                // takes a fresh permit.
                let receipt = retry(
                    || async {
                        self.throttle.acquire().await;
                        self.adapter.upload_attachment(&path, &file, &target).await
                    },
                    self.max_retries,
                )
                .await?;
                Ok(TaskOutput::Uploaded {
                    attachment_id: receipt.attachment_id,
                    url: receipt.url,
                })
            }
        }
    }
}
