use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};
use uuid::Uuid;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorType {
    /// Live sonification of one symbol's trade stream.
    Performer(String),
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Performer(symbol) => write!(f, "Performer({})", symbol),
        }
    }
}

/// Messages sent from Actors to the Supervisor
#[derive(Debug)]
pub enum ControlMessage {
    Heartbeat(Uuid),
    /// Recoverable problem, the actor keeps running.
    Error(Uuid, String),
    /// Unrecoverable for the whole process (e.g. the MIDI sink is gone).
    Fatal(Uuid, String),
}

/// Aborts the heartbeat task when the owning actor run ends, however it ends.
pub struct HeartbeatGuard(JoinHandle<()>);

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The trait that all restartable services must implement
#[async_trait]
pub trait Actor: Send {
    fn name(&self) -> ActorType;

    fn id(&self) -> Uuid;

    /// The main loop of the actor.
    /// Heartbeats must keep flowing for as long as the loop is alive.
    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()>;

    fn spawn_heartbeat(&self, supervisor_tx: mpsc::Sender<ControlMessage>) -> HeartbeatGuard {
        let id = self.id();
        HeartbeatGuard(tokio::spawn(async move {
            loop {
                if supervisor_tx
                    .send(ControlMessage::Heartbeat(id))
                    .await
                    .is_err()
                {
                    break;
                }
                tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            }
        }))
    }
}
