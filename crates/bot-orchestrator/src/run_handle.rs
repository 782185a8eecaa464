use crate::commands::{RunCommand, RunSnapshot};
use crate::events::RunEvent;
use anyhow::Result;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Cloneable handle over a run actor's mailbox.
///
/// Every mutation goes through the mpsc sender, so the actor remains the
/// single writer for its run record no matter how many handles exist.
#[derive(Clone)]
pub struct RunHandle {
    tx: mpsc::Sender<RunCommand>,
    event_tx: broadcast::Sender<RunEvent>,
    status_rx: watch::Receiver<RunSnapshot>,
}

impl RunHandle {
    #[must_use]
    pub const fn new(
        tx: mpsc::Sender<RunCommand>,
        event_tx: broadcast::Sender<RunEvent>,
        status_rx: watch::Receiver<RunSnapshot>,
    ) -> Self {
        Self {
            tx,
            event_tx,
            status_rx,
        }
    }

    /// Starts the run.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn start(&self) -> Result<()> {
        self.tx.send(RunCommand::Start).await?;
        Ok(())
    }

    /// Stops the run. Outstanding orders are left alone; only [`kill`](Self::kill)
    /// cancels them.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn stop(&self) -> Result<()> {
        self.tx.send(RunCommand::Stop).await?;
        Ok(())
    }

    /// Pauses a running run.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn pause(&self) -> Result<()> {
        self.tx.send(RunCommand::Pause).await?;
        Ok(())
    }

    /// Resumes a paused run.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn resume(&self) -> Result<()> {
        self.tx.send(RunCommand::Resume).await?;
        Ok(())
    }

    /// Emergency stop: cancels all outstanding orders, then stops.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn kill(&self) -> Result<()> {
        self.tx.send(RunCommand::Kill).await?;
        Ok(())
    }

    /// Arms the run for live order submission.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn arm(&self) -> Result<()> {
        self.tx.send(RunCommand::Arm).await?;
        Ok(())
    }

    /// Clears the live-arming flag.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn disarm(&self) -> Result<()> {
        self.tx.send(RunCommand::Disarm).await?;
        Ok(())
    }

    /// Requests one decision cycle. Driven by the external scheduler.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn tick(&self) -> Result<()> {
        self.tx.send(RunCommand::Tick).await?;
        Ok(())
    }

    /// Fetches a fresh snapshot from the actor. Because the mailbox is FIFO,
    /// the reply reflects every command sent through this handle before it.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed or the actor dropped
    /// the reply channel.
    pub async fn status(&self) -> Result<RunSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(RunCommand::GetStatus(tx)).await?;
        Ok(rx.await?)
    }

    /// Last published snapshot, without a round trip to the actor.
    #[must_use]
    pub fn latest_snapshot(&self) -> RunSnapshot {
        self.status_rx.borrow().clone()
    }

    /// Subscribes to the run's event stream.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<RunEvent> {
        self.event_tx.subscribe()
    }

    /// Shuts the actor down. The run record stays persisted; a new actor can
    /// resume it later.
    ///
    /// # Errors
    /// Returns an error if the actor's mailbox is closed.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(RunCommand::Shutdown).await?;
        Ok(())
    }
}
