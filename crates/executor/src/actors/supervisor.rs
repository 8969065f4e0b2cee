use std::{collections::HashMap, future::Future, time::Duration};

use anyhow::anyhow;
use tokio::{
    signal,
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

pub type ActorFactory = Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

const CHECK_INTERVAL: Duration = Duration::from_secs(1);
const PULSE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct Supervisor {
    actor_factories: HashMap<ActorType, ActorFactory>,
    pulses: HashMap<ActorType, Instant>,
    handles: HashMap<ActorType, JoinHandle<()>>,
    /// Live actor instance ids. A restarted actor gets a fresh id.
    instances: HashMap<Uuid, ActorType>,
    supervisor_tx: mpsc::Sender<ControlMessage>,
    supervisor_rx: mpsc::Receiver<ControlMessage>,
}

impl Supervisor {
    pub fn new() -> Self {
        let (supervisor_tx, supervisor_rx) = mpsc::channel::<ControlMessage>(512);
        Self {
            actor_factories: HashMap::new(),
            pulses: HashMap::new(),
            handles: HashMap::new(),
            instances: HashMap::new(),
            supervisor_tx,
            supervisor_rx,
        }
    }

    pub fn register_actor(&mut self, actor_type: ActorType, factory: ActorFactory) {
        self.actor_factories.insert(actor_type, factory);
    }

    /// Runs until Ctrl-C or a fatal actor error.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.run_until(signal::ctrl_c()).await
    }

    pub async fn run_until<F: Future>(&mut self, shutdown: F) -> anyhow::Result<()> {
        let mut check_interval = time::interval(CHECK_INTERVAL);
        tokio::pin!(shutdown);

        let actors: Vec<ActorType> = self.actor_factories.keys().cloned().collect();
        actors.into_iter().for_each(|actor| self.spawn_actor(actor));

        loop {
            tokio::select! {
                Some(msg) = self.supervisor_rx.recv() => {
                    match msg {
                        ControlMessage::Heartbeat(id) => {
                            if let Some(actor_type) = self.instances.get(&id) {
                                self.pulses.insert(actor_type.clone(), Instant::now());
                            }
                        }
                        ControlMessage::Error(id, error_msg) => {
                            if let Some(actor_type) = self.instances.get(&id) {
                                error!("Actor {} reported error: {}", actor_type, error_msg);
                            }
                        }
                        ControlMessage::Fatal(id, error_msg) => {
                            let actor_type = self
                                .instances
                                .get(&id)
                                .map(ToString::to_string)
                                .unwrap_or_else(|| id.to_string());
                            error!("Actor {} hit a fatal error: {}. Stopping all actors.", actor_type, error_msg);
                            self.stop_all().await;
                            return Err(anyhow!("{} failed: {}", actor_type, error_msg));
                        }
                    }
                }

                _ = check_interval.tick() => {
                    let dead_timeout = Instant::now() - PULSE_TIMEOUT;

                    let dead_actors: Vec<ActorType> = self
                        .pulses
                        .iter()
                        .filter(|(_, last)| **last < dead_timeout)
                        .map(|(actor_type, _)| actor_type.clone())
                        .collect();

                    for actor_type in dead_actors {
                        warn!("{} is unresponsive! Restarting.", actor_type);
                        if let Some(handle) = self.handles.remove(&actor_type) {
                            handle.abort();
                            let _ = handle.await;
                        }
                        self.spawn_actor(actor_type);
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping {} actor(s).", self.handles.len());
                    self.stop_all().await;
                    return Ok(());
                }
            }
        }
    }

    /// Aborts every actor and waits for each task to be dropped.
    async fn stop_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
            let _ = handle.await;
        }
        self.pulses.clear();
        self.instances.clear();
    }

    fn spawn_actor(&mut self, actor_type: ActorType) {
        let Some(factory) = self.actor_factories.get(&actor_type) else {
            return;
        };
        let mut new_actor = factory();
        let id = new_actor.id();
        let tx = self.supervisor_tx.clone();

        self.instances.retain(|_, existing| *existing != actor_type);
        self.instances.insert(id, actor_type.clone());

        let name = actor_type.clone();
        let new_actor_handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx).await {
                error!("Actor {} crashed: {}", name, e);
            }
        });
        self.handles.insert(actor_type.clone(), new_actor_handle);
        self.pulses.insert(actor_type, Instant::now());
    }
}
