//! Flow execution and task orchestration.
//!
//! A flow is a chain of tasks joined by bounded channels. Task `i` sends on
//! its own channel and receives from the channel of task `i - 1`, so a full
//! channel holds its producer back. When a task ends its sender is dropped,
//! the next task sees its input close, and the whole chain winds down after
//! the source finishes.

use crate::config::{FlowConfig, TaskType};
use avroflow_core::{event::Event, task::runner::Runner};
use std::fmt::Write;
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, Instrument};

const DEFAULT_EVENT_BUFFER_SIZE: usize = 10000;

/// Errors that can occur during flow execution.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error in generate subscriber task.
    #[error(transparent)]
    GenerateSubscriber(#[from] avroflow_core::task::generate::subscriber::Error),
    /// Error in filter processor task.
    #[error(transparent)]
    FilterProcessor(#[from] avroflow_core::task::filter::processor::Error),
    /// Error in map processor task.
    #[error(transparent)]
    MapProcessor(#[from] avroflow_core::task::map::processor::Error),
    /// Error in convert processor task.
    #[error(transparent)]
    ConvertProcessor(#[from] avroflow_core::task::convert::processor::Error),
    /// Error in log processor task.
    #[error(transparent)]
    LogProcessor(#[from] avroflow_core::task::log::processor::Error),
    /// Missing required configuration attribute.
    #[error("Missing required attribute: {0}")]
    MissingRequiredAttribute(String),
    /// Channels cannot be created with no capacity.
    #[error("Event buffer size must be greater than zero")]
    ZeroBufferSize,
    /// The flow output has no tasks behind it or was already taken.
    #[error("Output of flow {0} is not available")]
    OutputUnavailable(String),
}

pub struct Flow {
    /// The flow's static configuration, loaded from a file.
    pub config: Arc<FlowConfig>,
    /// Per-channel capacity for this flow (from app config or DEFAULT).
    event_buffer_size: Option<usize>,
    /// The shared context for all tasks in this flow. Initialized by `init()`.
    task_context: Option<Arc<avroflow_core::task::context::TaskContext>>,
    /// Sending half of each task's output channel. Initialized by `init()`.
    senders: Vec<Sender<Event>>,
    /// Receiving half of each task's output channel, consumed by the next
    /// task. The last one is the flow output.
    receivers: Vec<Option<Receiver<Event>>>,
}

impl Flow {
    /// Returns the name of the flow.
    pub fn name(&self) -> &str {
        &self.config.flow.name
    }

    /// Initializes the task context and one channel per task.
    /// This must be called before `run`.
    #[tracing::instrument(skip(self), name = "flow.init", fields(flow = %self.config.flow.name))]
    pub async fn init(&mut self) -> Result<(), Error> {
        if self.task_context.is_some() {
            return Ok(());
        }

        let buffer_size = self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE);
        if buffer_size == 0 {
            return Err(Error::ZeroBufferSize);
        }

        let task_context = Arc::new(
            avroflow_core::task::context::TaskContextBuilder::new()
                .flow_name(self.config.flow.name.clone())
                .flow_labels(self.config.flow.labels.clone())
                .build()
                .map_err(|e| Error::MissingRequiredAttribute(e.to_string()))?,
        );

        for _ in &self.config.flow.tasks {
            let (tx, rx) = mpsc::channel(buffer_size);
            self.senders.push(tx);
            self.receivers.push(Some(rx));
        }
        self.task_context = Some(task_context);

        Ok(())
    }

    /// Takes the receiver of the last task's output.
    ///
    /// A flow that is not subscribed discards its output.
    pub fn subscribe(&mut self) -> Result<Receiver<Event>, Error> {
        if self.task_context.is_none() {
            return Err(Error::MissingRequiredAttribute(
                "task_context: init() must be called first".to_string(),
            ));
        }
        self.receivers
            .last_mut()
            .and_then(Option::take)
            .ok_or_else(|| Error::OutputUnavailable(self.config.flow.name.clone()))
    }

/// Renders the task chain, one node per task:
    ///
    /// ```text
    /// Flow: users
    ///   Source: GENERATE-0000 (users)
    ///     --> FILTER-0001
    ///   Sink: FILTER-0001 (positive)
    ///     <-- GENERATE-0000
    /// ```
    pub fn describe(&self) -> String {
        let tasks = &self.config.flow.tasks;
        let node = |i: usize| format!("{}-{:04}", tasks[i].as_str().to_uppercase(), i);

        let mut out = format!("Flow: {}\n", self.config.flow.name);
        for (i, task) in tasks.iter().enumerate() {
            let role = if i == 0 {
                "Source"
            } else if i + 1 == tasks.len() {
                "Sink"
            } else {
                "Processor"
            };
            let _ = writeln!(out, "  {}: {} ({})", role, node(i), task.name());
            if i + 1 < tasks.len() {
                let _ = writeln!(out, "    --> {}", node(i + 1));
            }
            if i > 0 {
                let _ = writeln!(out, "    <-- {}", node(i - 1));
            }
        }
        out
    }

    /// Starts the flow in the background.
    ///
    /// The returned handle resolves once every task has finished.
    #[tracing::instrument(skip(self), name = "flow.run", fields(flow = %self.config.flow.name))]
    pub fn run(self) -> JoinHandle<()> {
        let flow_name = self.config.flow.name.clone();
        tokio::spawn(
            async move {
                if let Err(e) = self.run_tasks().await {
                    error!("Flow {} terminated with an error: {}", flow_name, e);
                }
            }
            .instrument(tracing::Span::current()),
        )
    }

    async fn run_tasks(self) -> Result<(), Error> {
        let task_context = self.task_context.ok_or_else(|| {
            Error::MissingRequiredAttribute("task_context: init() must be called first".to_string())
        })?;

        if self.config.flow.tasks.is_empty() {
            info!("Flow {} has no tasks to run.", self.config.flow.name);
            return Ok(());
        }

        let mut upstream: Option<Receiver<Event>> = None;
        let mut tasks = Vec::with_capacity(self.senders.len());
        for ((i, task), (tx, rx)) in self
            .config
            .flow
            .tasks
            .iter()
            .enumerate()
            .zip(self.senders.into_iter().zip(self.receivers))
        {
            tasks.push((i, task.clone(), tx, upstream.take()));
            upstream = rx;
        }

        if let Some(mut output) = upstream {
            debug!("Flow {} output is not subscribed, discarding it", self.config.flow.name);
            tokio::spawn(async move { while output.recv().await.is_some() {} });
        }

        let handles = spawn_tasks(tasks, &task_context);
        for result in futures_util::future::join_all(handles).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("{}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        info!("All tasks completed for flow {}", self.config.flow.name);
        Ok(())
    }
}

/// Spawns one tokio task per flow task.
///
/// Each entry carries the task's own sender and the previous task's receiver.
/// A processor without a previous task fails to build.
fn spawn_tasks(
    tasks: Vec<(usize, TaskType, Sender<Event>, Option<Receiver<Event>>)>,
    task_context: &Arc<avroflow_core::task::context::TaskContext>,
) -> Vec<JoinHandle<Result<(), Error>>> {
    let mut background_tasks = Vec::new();

    for (i, task, tx, rx) in tasks {
        let task_context = Arc::clone(task_context);
        let task_type = task.as_str();
        let span = tracing::Span::current();
        let upstream = rx.ok_or_else(|| Error::MissingRequiredAttribute("receiver".to_string()));

        let handle: JoinHandle<Result<(), Error>> = match task {
            TaskType::generate(config) => {
                drop(upstream);
                let config = Arc::new(config);
                tokio::spawn(
                    async move {
                        avroflow_core::task::generate::subscriber::SubscriberBuilder::new()
                            .config(config)
                            .sender(tx)
                            .task_id(i)
                            .task_type(task_type)
                            .task_context(task_context)
                            .build()
                            .await?
                            .run()
                            .await?;
                        Ok(())
                    }
                    .instrument(span),
                )
            }
            TaskType::filter(config) => {
                let config = Arc::new(config);
                tokio::spawn(
                    async move {
                        avroflow_core::task::filter::processor::ProcessorBuilder::new()
                            .config(config)
                            .receiver(upstream?)
                            .sender(tx)
                            .task_id(i)
                            .task_type(task_type)
                            .task_context(task_context)
                            .build()
                            .await?
                            .run()
                            .await?;
                        Ok(())
                    }
                    .instrument(span),
                )
            }
            TaskType::map(config) => {
                let config = Arc::new(config);
                tokio::spawn(
                    async move {
                        avroflow_core::task::map::processor::ProcessorBuilder::new()
                            .config(config)
                            .receiver(upstream?)
                            .sender(tx)
                            .task_id(i)
                            .task_type(task_type)
                            .task_context(task_context)
                            .build()
                            .await?
                            .run()
                            .await?;
                        Ok(())
                    }
                    .instrument(span),
                )
            }
            TaskType::convert(config) => {
                let config = Arc::new(config);
                tokio::spawn(
                    async move {
                        avroflow_core::task::convert::processor::ProcessorBuilder::new()
                            .config(config)
                            .receiver(upstream?)
                            .sender(tx)
                            .task_id(i)
                            .task_type(task_type)
                            .task_context(task_context)
                            .build()
                            .await?
                            .run()
                            .await?;
                        Ok(())
                    }
                    .instrument(span),
                )
            }
            TaskType::log(config) => {
                let config = Arc::new(config);
                tokio::spawn(
                    async move {
                        avroflow_core::task::log::processor::ProcessorBuilder::new()
                            .config(config)
                            .receiver(upstream?)
                            .sender(tx)
                            .task_id(i)
                            .task_type(task_type)
                            .task_context(task_context)
                            .build()
                            .await?
                            .run()
                            .await?;
                        Ok(())
                    }
                    .instrument(span),
                )
            }
        };
        background_tasks.push(handle);
    }

    background_tasks
}

/// Builder for creating Flow instances.
#[derive(Default)]
pub struct FlowBuilder {
    /// Optional flow configuration.
    config: Option<Arc<FlowConfig>>,
    /// Optional per-channel capacity.
    event_buffer_size: Option<usize>,
}

impl FlowBuilder {
    /// Creates a new FlowBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flow configuration.
    pub fn config(mut self, config: Arc<FlowConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the capacity of each channel between tasks.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds a Flow instance from the configured options.
    ///
    /// # Errors
    /// Returns `Error::MissingRequiredAttribute` if required fields are not set.
    pub fn build(self) -> Result<Flow, Error> {
        Ok(Flow {
            config: self
                .config
                .ok_or_else(|| Error::MissingRequiredAttribute("config".to_string()))?,
            event_buffer_size: self.event_buffer_size,
            task_context: None,
            senders: Vec::new(),
            receivers: Vec::new(),
        })
    }
}
