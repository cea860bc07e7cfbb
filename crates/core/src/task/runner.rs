//! Common lifecycle of every pipeline task.

/// A task that can be initialized and then run until its input closes.
#[async_trait::async_trait]
pub trait Runner {
    type Error;
    type EventHandler;

    /// Prepares the handler that processes individual events.
    async fn init(&self) -> Result<Self::EventHandler, Self::Error>;

    /// Runs the task loop.
    async fn run(self) -> Result<(), Self::Error>;
}
