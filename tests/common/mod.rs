// ABOUTME: Shared helpers for switchyard integration tests
// ABOUTME: Task builders and a concurrency probe used across test files

#![allow(dead_code)]

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use switchyard::engine::{Task, WorkflowContext};

/// Route engine logs through the test writer so they show up under
/// `--nocapture`. Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Task that immediately succeeds with the given string result.
pub fn ok_task(name: &str, value: &str) -> Task {
    let value = value.to_string();
    Task::new(name, move |_ctx| {
        let value = value.clone();
        async move { Ok(json!(value)) }
    })
}

/// Task that always fails with a fixed error message.
pub fn failing_task(name: &str) -> Task {
    Task::new(name, |_ctx| async {
        Err::<serde_json::Value, _>("deliberate failure".to_string())
    })
}

/// Task that sleeps before succeeding, for ordering and parallelism tests.
pub fn sleeping_task(name: &str, busy: Duration) -> Task {
    Task::new(name, move |_ctx| async move {
        tokio::time::sleep(busy).await;
        Ok(json!("slept"))
    })
}

/// Task that echoes an upstream result from the shared context.
pub fn chained_task(name: &str, upstream: &str) -> Task {
    let dependency = upstream.to_string();
    let upstream = upstream.to_string();
    let task_name = name.to_string();
    Task::new(name, move |ctx: WorkflowContext| {
        let upstream = upstream.clone();
        let task_name = task_name.clone();
        async move {
            match ctx.get_str(&upstream) {
                Some(value) => Ok(json!(format!("ok-{}:{}", task_name, value))),
                None => Err(format!("'{}' result missing from context", upstream)),
            }
        }
    })
    .depends_on([dependency])
}

/// Tracks how many probe tasks run at once and the high-water mark.
pub struct ConcurrencyProbe {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn task(self: &Arc<Self>, name: &str, busy: Duration) -> Task {
        let probe = Arc::clone(self);
        Task::new(name, move |_ctx| {
            let probe = Arc::clone(&probe);
            async move {
                let now_active = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
                probe.peak.fetch_max(now_active, Ordering::SeqCst);
                tokio::time::sleep(busy).await;
                probe.active.fetch_sub(1, Ordering::SeqCst);
                Ok(json!("done"))
            }
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
