//! End-to-end executor scenarios over the in-memory store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use gentask::{
    ExecutionOutcome, ExecutorCallback, ExecutorConfig, Job, JobContext, JobFn, ListenerRef,
    ListenerRegistry, MemoryStore, RecordAdapter, RetryPolicy, TaskAdapter, TaskError, TaskEvent,
    TaskExecutor, TaskListener, TaskRecord, TaskStatus, TaskStore, TaskType,
};

type Seen = (&'static str, String, TaskStatus, u8);

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Seen>>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl Recorder {
    fn push(&self, hook: &'static str, ev: &TaskEvent) {
        self.seen.lock().unwrap().push((
            hook,
            ev.task_id().to_string(),
            ev.status(),
            ev.progress(),
        ));
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn statuses(&self) -> Vec<TaskStatus> {
        self.seen().into_iter().map(|(_, _, s, _)| s).collect()
    }

    fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskListener for Recorder {
    async fn on_task_added(&self, ev: &TaskEvent) {
        self.push("added", ev);
    }

    async fn on_task_status_changed(&self, ev: &TaskEvent) {
        self.push("changed", ev);
    }

    async fn on_tasks_removed(&self, evs: &[TaskEvent]) {
        let ids = evs.iter().map(|e| e.task_id().to_string()).collect();
        self.batches.lock().unwrap().push(ids);
    }
}

#[derive(Default)]
struct Hooks {
    calls: Mutex<Vec<String>>,
}

impl Hooks {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExecutorCallback for Hooks {
    fn on_progress_update(&self, _event: &TaskEvent, progress: u8) {
        self.calls.lock().unwrap().push(format!("progress:{progress}"));
    }

    fn on_success(&self, event: &TaskEvent) {
        self.calls.lock().unwrap().push(format!("success:{}", event.task_id()));
    }

    fn on_failure(&self, event: &TaskEvent, reason: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("failure:{}:{reason}", event.task_id()));
    }
}

/// Only overrides the generic hook.
#[derive(Default)]
struct AnyChange {
    count: AtomicU32,
}

impl ExecutorCallback for AnyChange {
    fn on_status_changed(&self, _event: &TaskEvent) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    store: Arc<MemoryStore<TaskRecord>>,
    adapter: Arc<RecordAdapter>,
    listeners: Arc<ListenerRegistry>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::<TaskRecord>::new());
        let adapter = Arc::new(RecordAdapter::new(store.clone()));
        Self {
            store,
            adapter,
            listeners: Arc::new(ListenerRegistry::new()),
        }
    }

    async fn stored(&self, task_id: &str) -> TaskRecord {
        self.store.get(task_id).await.unwrap().expect("record persisted")
    }
}

fn image(id: &str) -> TaskRecord {
    TaskRecord::new(id, TaskType::TEXT_TO_IMAGE, "user-1")
}

fn video(id: &str) -> TaskRecord {
    TaskRecord::new(id, TaskType::VIDEO_GENERATION, "user-1")
}

/// Reports progress, signals `started`, then waits to be cancelled.
async fn park(ctx: JobContext<TaskRecord>, started: Arc<Notify>) -> Result<String, TaskError> {
    ctx.set_progress(30).await?;
    started.notify_one();
    loop {
        ctx.sleep(Duration::from_secs(1)).await?;
    }
}

fn parked_job(types: Vec<TaskType>, started: Arc<Notify>) -> Arc<dyn Job<TaskRecord>> {
    JobFn::arc(types, move |ctx: JobContext<TaskRecord>| park(ctx, started.clone()))
}

#[tokio::test(start_paused = true)]
async fn text_to_image_succeeds_after_two_timeouts() {
    let fx = Fixture::new();
    let rec = Arc::new(Recorder::default());
    fx.listeners.add_listener(rec.clone());
    let hooks = Arc::new(Hooks::default());

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], move |ctx: JobContext<TaskRecord>| {
        let counter = counter.clone();
        async move {
            let policy = RetryPolicy::network();
            let url = ctx
                .retry(&policy, || {
                    let counter = counter.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        if n <= 2 {
                            Err(TaskError::timeout("generation request"))
                        } else {
                            Ok("https://cdn.example/cat.png".to_string())
                        }
                    }
                })
                .await?;
            ctx.set_progress(60).await?;
            Ok::<_, TaskError>(url)
        }
    });
    let executor =
        TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()).with_callback(hooks.clone());

    let outcome = executor.execute(image("t-1")).await.unwrap();

    assert_eq!(
        outcome,
        ExecutionOutcome::Succeeded("https://cdn.example/cat.png".into())
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let stored = fx.stored("t-1").await;
    assert_eq!(stored.status, TaskStatus::Success);
    assert_eq!(stored.progress, 100);
    assert_eq!(stored.result.as_deref(), Some("https://cdn.example/cat.png"));

    assert_eq!(
        rec.statuses(),
        vec![
            TaskStatus::Create,
            TaskStatus::Running,
            TaskStatus::Running,
            TaskStatus::Success
        ]
    );
    let progress: Vec<u8> = rec.seen().iter().map(|(_, _, _, p)| *p).collect();
    assert!(progress.iter().any(|p| *p > 0 && *p < 100));
    assert_eq!(
        hooks.calls(),
        vec!["progress:0", "progress:60", "success:t-1"]
    );
    assert!(executor.active_tasks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelling_a_running_video_leaves_last_checkpoint() {
    let fx = Fixture::new();
    let rec = Arc::new(Recorder::default());
    fx.listeners.add_listener(rec.clone());
    let hooks = Arc::new(Hooks::default());

    let started = Arc::new(Notify::new());
    let job = parked_job(vec![TaskType::VIDEO_GENERATION], started.clone());
    let executor = Arc::new(
        TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()).with_callback(hooks.clone()),
    );

    let handle = executor.spawn(video("v-1"));
    started.notified().await;
    assert_eq!(executor.active_tasks(), vec!["v-1".to_string()]);

    assert!(executor.cancel(&video("v-1")));
    assert!(!executor.cancel_by_id("v-1"), "second signal is not delivered");

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, ExecutionOutcome::Cancelled);
    assert!(executor.active_tasks().is_empty());

    let mut local = video("v-1");
    let status = executor.update_task_status(&mut local).await.unwrap();
    assert_eq!(status, Some(TaskStatus::Running));
    assert_eq!(local.progress, 30);

    assert!(!rec
        .statuses()
        .iter()
        .any(|s| matches!(s, TaskStatus::Success | TaskStatus::Failure)));
    assert!(hooks
        .calls()
        .iter()
        .all(|c| !c.starts_with("success") && !c.starts_with("failure")));
}

#[tokio::test(start_paused = true)]
async fn cancel_all_signals_every_execution() {
    let fx = Fixture::new();
    let started = Arc::new(Notify::new());
    let job = parked_job(vec![TaskType::VIDEO_GENERATION], started.clone());
    let executor = Arc::new(TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()));

    assert!(!executor.cancel_all(), "nothing in flight yet");

    let a = executor.spawn(video("v-a"));
    started.notified().await;
    let b = executor.spawn(video("v-b"));
    started.notified().await;
    assert_eq!(executor.active_tasks(), vec!["v-a".to_string(), "v-b".to_string()]);

    assert!(executor.cancel_all());
    assert_eq!(a.await.unwrap().unwrap(), ExecutionOutcome::Cancelled);
    assert_eq!(b.await.unwrap().unwrap(), ExecutionOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn failing_job_stores_reason() {
    let fx = Fixture::new();
    let hooks = Arc::new(Hooks::default());
    let job = JobFn::arc(vec![TaskType::VIDEO_EDIT], |_ctx: JobContext<TaskRecord>| async move {
        Err::<String, _>(TaskError::fail("quota exceeded"))
    });
    let executor =
        TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()).with_callback(hooks.clone());

    let task = TaskRecord::new("e-1", TaskType::VIDEO_EDIT, "user-1");
    let outcome = executor.execute(task).await.unwrap();

    let ExecutionOutcome::Failed(reason) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.contains("quota exceeded"));

    let stored = fx.stored("e-1").await;
    assert_eq!(stored.status, TaskStatus::Failure);
    assert_eq!(stored.result.as_deref(), Some(reason.as_str()));
    assert_eq!(hooks.calls().last(), Some(&format!("failure:e-1:{reason}")));
}

#[tokio::test(start_paused = true)]
async fn rejects_unsupported_type_and_duplicate_execution() {
    let fx = Fixture::new();
    let started = Arc::new(Notify::new());
    let job = parked_job(vec![TaskType::VIDEO_GENERATION], started.clone());
    let executor = Arc::new(TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()));

    assert!(executor.is_supported_task_type(TaskType::VIDEO_GENERATION));
    assert!(!executor.is_supported_task_type(TaskType::TEXT_TO_IMAGE));
    assert_eq!(
        executor.execute(image("i-1")).await,
        Err(TaskError::UnsupportedType {
            task_type: TaskType::TEXT_TO_IMAGE
        })
    );
    assert!(fx.store.is_empty().await, "rejected task is never persisted");

    let first = executor.spawn(video("v-1"));
    started.notified().await;
    assert_eq!(
        executor.execute(video("v-1")).await,
        Err(TaskError::AlreadyActive {
            task_id: "v-1".into()
        })
    );

    executor.cancel_by_id("v-1");
    assert_eq!(first.await.unwrap().unwrap(), ExecutionOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn known_task_is_not_announced_again() {
    let fx = Fixture::new();
    let rec = Arc::new(Recorder::default());
    fx.listeners.add_listener(rec.clone());
    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |_ctx: JobContext<TaskRecord>| async move {
        Ok::<_, TaskError>("done".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone());

    fx.adapter.save_task(&image("t-9")).await.unwrap();
    executor.execute(image("t-9")).await.unwrap();

    assert!(rec.seen().iter().all(|(hook, ..)| *hook != "added"));
}

#[tokio::test(start_paused = true)]
async fn remove_splits_batch_between_scoped_and_global() {
    let fx = Fixture::new();
    let scoped = Arc::new(Recorder::default());
    let global = Arc::new(Recorder::default());
    fx.listeners
        .add_listener_for(scoped.clone(), TaskType::VIDEO_GENERATION);
    fx.listeners.add_listener(global.clone());

    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |_ctx: JobContext<TaskRecord>| async move {
        Ok::<_, TaskError>("done".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone());

    for task in [image("t-1"), video("v-1"), video("v-2")] {
        fx.adapter.save_task(&task).await.unwrap();
    }

    let events = executor
        .remove(vec![image("t-1"), video("v-1"), video("v-2")])
        .await
        .unwrap();

    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.status() == TaskStatus::Delete));
    assert_eq!(scoped.batches(), vec![vec!["v-1".to_string(), "v-2".to_string()]]);
    assert_eq!(global.batches().len(), 1);
    assert_eq!(global.batches()[0].len(), 3);

    assert_eq!(fx.store.len().await, 3, "removal keeps the records");
    for id in ["t-1", "v-1", "v-2"] {
        let stored = fx.stored(id).await;
        assert_eq!((stored.status, stored.deleted), (TaskStatus::Delete, true), "{id}");
    }
}

#[tokio::test(start_paused = true)]
async fn removing_a_running_task_persists_delete_last() {
    let fx = Fixture::new();
    let rec = Arc::new(Recorder::default());
    fx.listeners.add_listener(rec.clone());
    let started = Arc::new(Notify::new());
    let job = parked_job(vec![TaskType::VIDEO_GENERATION], started.clone());
    let executor = Arc::new(TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()));

    let handle = executor.spawn(video("v-1"));
    started.notified().await;

    let events = executor.remove(vec![video("v-1")]).await.unwrap();
    assert_eq!(events[0].status(), TaskStatus::Delete);
    assert_eq!(handle.await.unwrap().unwrap(), ExecutionOutcome::Cancelled);

    let stored = fx.stored("v-1").await;
    assert_eq!((stored.status, stored.deleted), (TaskStatus::Delete, true));
    assert_eq!(stored.progress, 30);
    assert_eq!(rec.batches(), vec![vec!["v-1".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn fresh_copy_of_finished_task_is_rejected() {
    let fx = Fixture::new();
    let rec = Arc::new(Recorder::default());
    fx.listeners.add_listener(rec.clone());
    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |_ctx: JobContext<TaskRecord>| async move {
        Ok::<_, TaskError>("second".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone());

    let mut done = image("t-1");
    done.status = TaskStatus::Success;
    done.progress = 100;
    done.result = Some("first".into());
    fx.store.save(&done).await.unwrap();

    assert_eq!(
        executor.execute(image("t-1")).await,
        Err(TaskError::InvalidTransition {
            from: TaskStatus::Success,
            to: TaskStatus::Running,
        })
    );

    let stored = fx.stored("t-1").await;
    assert_eq!(stored.status, TaskStatus::Success);
    assert_eq!(stored.result.as_deref(), Some("first"));
    assert!(rec.seen().is_empty());
    assert!(executor.active_tasks().is_empty());
}

/// Store that can stall or fail selected updates.
struct Gated {
    inner: MemoryStore<TaskRecord>,
    stall_at: Option<u8>,
    fail_terminal: bool,
}

impl Gated {
    fn stalling(progress: u8) -> Self {
        Self {
            inner: MemoryStore::new(),
            stall_at: Some(progress),
            fail_terminal: false,
        }
    }

    fn failing_terminal() -> Self {
        Self {
            inner: MemoryStore::new(),
            stall_at: None,
            fail_terminal: true,
        }
    }
}

#[async_trait]
impl TaskStore<TaskRecord> for Gated {
    async fn save(&self, record: &TaskRecord) -> Result<(), TaskError> {
        self.inner.save(record).await
    }

    async fn update(&self, record: &TaskRecord) -> Result<(), TaskError> {
        if self.fail_terminal && record.status.is_terminal() {
            return Err(TaskError::storage("disk full"));
        }
        if self.stall_at == Some(record.progress) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.inner.update(record).await
    }

    async fn delete(&self, ids: &[String]) -> Result<usize, TaskError> {
        self.inner.delete(ids).await
    }

    async fn get_all(&self) -> Result<Vec<TaskRecord>, TaskError> {
        self.inner.get_all().await
    }

    async fn get(&self, id: &str) -> Result<Option<TaskRecord>, TaskError> {
        self.inner.get(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_progress_writes_land_in_order() {
    let store = Arc::new(Gated::stalling(40));
    let adapter = Arc::new(RecordAdapter::new(store.clone()));
    let listeners = Arc::new(ListenerRegistry::new());

    let reader = store.clone();
    let job = JobFn::arc(vec![TaskType::VIDEO_GENERATION], move |ctx: JobContext<TaskRecord>| {
        let reader = reader.clone();
        async move {
            let other = ctx.clone();
            let (slow, fast) = tokio::join!(ctx.set_progress(40), other.set_progress(80));
            slow?;
            fast?;
            let stored = reader.get(ctx.task_id()).await?.map(|r| r.progress);
            Ok::<_, TaskError>(format!("{stored:?}"))
        }
    });
    let executor = TaskExecutor::new(job, adapter, listeners);

    let outcome = executor.execute(video("v-1")).await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Succeeded("Some(80)".into()));
}

#[tokio::test(start_paused = true)]
async fn failed_terminal_write_still_notifies() {
    let store = Arc::new(Gated::failing_terminal());
    let adapter = Arc::new(RecordAdapter::new(store.clone()));
    let listeners = Arc::new(ListenerRegistry::new());
    let rec = Arc::new(Recorder::default());
    listeners.add_listener(rec.clone());
    let hooks = Arc::new(Hooks::default());

    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |_ctx: JobContext<TaskRecord>| async move {
        Ok::<_, TaskError>("cat.png".to_string())
    });
    let executor = TaskExecutor::new(job, adapter, listeners).with_callback(hooks.clone());

    let outcome = executor.execute(image("t-1")).await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Succeeded("cat.png".into()));
    assert_eq!(hooks.calls().last(), Some(&"success:t-1".to_string()));
    assert_eq!(rec.statuses().last(), Some(&TaskStatus::Success));
    assert!(executor.active_tasks().is_empty());

    let stored = store.get("t-1").await.unwrap().expect("record persisted");
    assert_eq!(stored.status, TaskStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn callback_defaults_forward_to_status_changed() {
    let fx = Fixture::new();
    let cb = Arc::new(AnyChange::default());
    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |ctx: JobContext<TaskRecord>| async move {
        ctx.set_progress(50).await?;
        Ok::<_, TaskError>("done".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone());
    executor.set_callback(cb.clone());

    executor.execute(image("t-1")).await.unwrap();

    // RUNNING, progress 0, progress 50, success
    assert_eq!(cb.count.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn job_timeout_is_reported_as_failure() {
    let fx = Fixture::new();
    let job = JobFn::arc(vec![TaskType::VIDEO_GENERATION], |ctx: JobContext<TaskRecord>| async move {
        ctx.sleep(Duration::from_secs(600)).await?;
        Ok::<_, TaskError>("late".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone()).with_config(
        ExecutorConfig {
            timeout: Duration::from_secs(5),
            progress_on_start: false,
        },
    );

    let outcome = executor.execute(video("v-1")).await.unwrap();

    let ExecutionOutcome::Failed(reason) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.starts_with("timed out"), "{reason}");
    assert_eq!(fx.stored("v-1").await.status, TaskStatus::Failure);
}

#[tokio::test(start_paused = true)]
async fn panicking_job_is_reported_as_failure() {
    let fx = Fixture::new();
    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |ctx: JobContext<TaskRecord>| async move {
        if ctx.task_id() == "t-1" {
            panic!("decoder exploded");
        }
        Ok::<_, TaskError>("unreachable".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone());

    let outcome = executor.execute(image("t-1")).await.unwrap();

    let ExecutionOutcome::Failed(reason) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(reason.contains("job panicked: decoder exploded"), "{reason}");
    assert!(executor.active_tasks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scoped_listener_runs_before_global() {
    struct Tagged(&'static str, Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl TaskListener for Tagged {
        async fn on_task_status_changed(&self, _ev: &TaskEvent) {
            self.1.lock().unwrap().push(self.0);
        }
    }

    let fx = Fixture::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let global: ListenerRef = Arc::new(Tagged("global", order.clone()));
    let scoped: ListenerRef = Arc::new(Tagged("scoped", order.clone()));
    fx.listeners.add_listener(global.clone());
    fx.listeners
        .add_listener_for(scoped.clone(), TaskType::TEXT_TO_IMAGE);
    assert_eq!(fx.listeners.global_count(), 1);
    assert_eq!(fx.listeners.scoped_count(TaskType::TEXT_TO_IMAGE), 1);

    let job = JobFn::arc(vec![TaskType::TEXT_TO_IMAGE], |_ctx: JobContext<TaskRecord>| async move {
        Ok::<_, TaskError>("done".to_string())
    });
    let executor = TaskExecutor::new(job, fx.adapter.clone(), fx.listeners.clone());
    executor.execute(image("t-1")).await.unwrap();

    // RUNNING and SUCCESS, scoped first each time
    assert_eq!(
        *order.lock().unwrap(),
        vec!["scoped", "global", "scoped", "global"]
    );

    assert!(fx.listeners.remove_listener(&scoped));
    assert_eq!(fx.listeners.scoped_count(TaskType::TEXT_TO_IMAGE), 0);
    assert!(fx.listeners.scoped_types().is_empty());
}
