//! # Example: generation
//!
//! Runs two generation jobs side by side and cancels one of them halfway.
//!
//! Shows how to:
//! - Wire a [`TaskExecutor`] over the in-memory store with [`RecordAdapter`].
//! - Attach [`LogListener`] globally and a custom listener scoped to videos.
//! - Retry a flaky "upload" with [`RetryPolicy::network`].
//! - Cancel a running task and read back its last checkpoint.
//!
//! ## Flow
//! ```text
//! spawn(image)  ──► RUNNING ──► retry(upload) x3 ──► progress ──► SUCCESS
//! spawn(video)  ──► RUNNING ──► progress 20/40 ──► cancel() ──► stays RUNNING
//! remove([image, video]) ──► DELETE (records kept) ──► on_tasks_removed (scoped subset + global batch)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example generation --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use gentask::{
    ExecutorCallback, JobContext, JobFn, ListenerRegistry, LogListener, MemoryStore,
    RecordAdapter, RetryPolicy, TaskError, TaskEvent, TaskExecutor, TaskListener, TaskRecord,
    TaskStore, TaskType,
};
use tracing_subscriber::EnvFilter;

/// Listener that only cares about video tasks.
struct VideoBadge;

#[async_trait::async_trait]
impl TaskListener for VideoBadge {
    async fn on_task_status_changed(&self, e: &TaskEvent) {
        println!("[badge] {} → {} ({}%)", e.task_id(), e.status(), e.progress());
    }

    async fn on_tasks_removed(&self, events: &[TaskEvent]) {
        println!("[badge] {} video(s) removed", events.len());
    }
}

/// Prints progress as a bar.
struct ProgressBar;

impl ExecutorCallback for ProgressBar {
    fn on_progress_update(&self, e: &TaskEvent, progress: u8) {
        let filled = usize::from(progress / 10);
        println!("[{}] [{:<10}] {progress}%", e.task_id(), "#".repeat(filled));
    }

    fn on_success(&self, e: &TaskEvent) {
        println!("[{}] done", e.task_id());
    }

    fn on_failure(&self, e: &TaskEvent, reason: &str) {
        println!("[{}] failed: {reason}", e.task_id());
    }
}

static UPLOADS: AtomicU32 = AtomicU32::new(0);

async fn generate(ctx: JobContext<TaskRecord>) -> Result<String, TaskError> {
    let step = match ctx.task().task_type {
        TaskType::VIDEO_GENERATION => Duration::from_millis(400),
        _ => Duration::from_millis(100),
    };
    for p in [20u8, 40, 60, 80] {
        ctx.sleep(step).await?;
        ctx.set_progress(p).await?;
    }

    let policy = RetryPolicy::network();
    let job = &ctx;
    let url = ctx
        .retry(&policy, move || async move {
            let n = UPLOADS.fetch_add(1, Ordering::Relaxed) + 1;
            if n <= 2 {
                Err(TaskError::connection(format!("upload reset #{n}")))
            } else {
                Ok(format!("https://cdn.example/{}.out", job.task_id()))
            }
        })
        .await?;
    Ok(url)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Storage + adapter
    let store = Arc::new(MemoryStore::<TaskRecord>::new());
    let adapter = Arc::new(RecordAdapter::new(store.clone()));

    // 2. Listeners: log everything, badge only for videos
    let listeners = Arc::new(ListenerRegistry::new());
    listeners.add_listener(Arc::new(LogListener::new()));
    listeners.add_listener_for(Arc::new(VideoBadge), TaskType::VIDEO_GENERATION);

    // 3. Executor for both kinds
    let job = JobFn::arc(
        vec![TaskType::TEXT_TO_IMAGE, TaskType::VIDEO_GENERATION],
        generate,
    );
    let executor = Arc::new(
        TaskExecutor::new(job, adapter, listeners).with_callback(Arc::new(ProgressBar)),
    );

    // 4. Run both; cancel the video once it got going
    let image = TaskRecord::new("img-1", TaskType::TEXT_TO_IMAGE, "demo");
    let video = TaskRecord::new("vid-1", TaskType::VIDEO_GENERATION, "demo");
    let image_run = executor.spawn(image.clone());
    let video_run = executor.spawn(video.clone());

    tokio::time::sleep(Duration::from_millis(900)).await;
    println!("[main] cancel vid-1: {}", executor.cancel(&video));

    println!("[main] img-1 → {:?}", image_run.await??);
    println!("[main] vid-1 → {:?}", video_run.await??);

    // 5. Storage keeps the last checkpoint of the cancelled video
    let mut stored = video.clone();
    let status = executor.update_task_status(&mut stored).await?;
    println!("[main] vid-1 stored: {status:?} at {}%", stored.progress);

    // 6. Soft-delete both
    let mut image_now = image.clone();
    executor.update_task_status(&mut image_now).await?;
    let removed = executor.remove(vec![image_now, stored]).await?;
    println!("[main] removed {} task(s)", removed.len());
    for record in store.get_all().await? {
        println!("[main] {} stored: {} (deleted={})", record.task_id, record.status, record.deleted);
    }

    Ok(())
}
