use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tandem_core::{AsyncQueue, QueueOptions, TaskError, TaskHandler};

/// Run a batch of demo tasks through a sequential queue.
#[derive(Debug, Parser)]
#[command(name = "tandem", version, about)]
struct Args {
    /// Number of tasks to enqueue.
    #[arg(long, default_value_t = 6)]
    tasks: usize,

    /// Per-task timeout in milliseconds (overrides --options).
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// How long each "slow" task sleeps, in milliseconds.
    #[arg(long, default_value_t = 50)]
    slow_ms: u64,

    /// The first N "hello" tasks fail on purpose.
    #[arg(long, default_value_t = 1)]
    fail_first: u32,

    /// Queue options as JSON, e.g. '{"timeout": 1000}'.
    #[arg(long)]
    options: Option<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct HelloPayload {
    name: String,
}

struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl TaskHandler<Value> for HelloHandler {
    async fn call(&self, args: Vec<Value>) -> Result<Value, TaskError> {
        let payload = args.into_iter().next().unwrap_or(Value::Null);
        let p: HelloPayload = serde_json::from_value(payload).map_err(TaskError::failed)?;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(TaskError::failed(format!("intentional failure (left={left})")));
        }

        Ok(json!(format!("Hello, {}!", p.name)))
    }
}

/// Sleeps for the duration given as its only argument (milliseconds).
struct SlowHandler;

#[async_trait]
impl TaskHandler<Value> for SlowHandler {
    async fn call(&self, args: Vec<Value>) -> Result<Value, TaskError> {
        let ms = args.first().and_then(Value::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    // (A) options: JSON を読んでから CLI の timeout で上書き
    let mut options = match &args.options {
        Some(json) => QueueOptions::from_json(json).context("parsing --options")?,
        None => QueueOptions::default(),
    };
    if let Some(ms) = args.timeout_ms {
        options.timeout_ms = ms;
    }

    let queue = AsyncQueue::<Value>::builder()
        .options(options)
        .register("hello", Arc::new(HelloHandler::new(args.fail_first)))?
        .register("slow", Arc::new(SlowHandler))?
        .start_stopped()
        .build()?;

    // (B) listeners: 各イベントをログに流すだけ
    queue.on_enqueue(|task, q| info!(task_id = %task.id(), label = task.label(), len = q.len() + 1, "enqueue"));
    queue.on_dequeue(|task, q| info!(task_id = %task.id(), label = task.label(), remaining = q.len(), "dequeue"));
    queue.on_start(|q| info!(pending = q.len(), "start"));
    queue.on_stop(|q| info!(pending = q.len(), "stop"));
    queue.on_empty(|| info!("empty"));

    // (C) stopped のままタスクを投入
    let mut handles = Vec::with_capacity(args.tasks);
    for i in 0..args.tasks {
        let handle = if i % 2 == 0 {
            queue.enqueue_named("hello", vec![json!({ "name": format!("tandem-{i}") })])?
        } else {
            queue.enqueue_named("slow", vec![json!(args.slow_ms)])?
        };
        handles.push(handle);
    }
    if let Err(e) = queue.enqueue_named("missing", vec![]) {
        warn!("rejected as expected: {e}");
    }

    // (D) start して投入順に結果を待つ
    queue.start();
    for handle in handles {
        let id = handle.id();
        match handle.await {
            Ok(value) => println!("{id}: ok {value}"),
            Err(err) => println!("{id}: error {err}"),
        }
    }

    println!("stats: {}", serde_json::to_string(&queue.stats())?);
    Ok(())
}
