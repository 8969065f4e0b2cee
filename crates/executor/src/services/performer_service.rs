use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::bail;
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::{sync::mpsc, time};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use common::{
    actors::{Actor, ActorType, ControlMessage},
    config::{AppConfig, SymbolAssignment},
    models::Trade,
};
use composer::{EventScheduler, Mapper, SymbolState};
use market_data::{TradeFeed, TransportError};
use midi_out::{OutputError, OutputSink};

/// Plays one symbol: feed -> indicators -> mapping -> scheduler.
///
/// Everything mutable about the symbol lives here and is touched by this
/// actor's task only.
pub struct SymbolPerformer {
    id: Uuid,
    state: SymbolState,
    mapper: Mapper,
    scheduler: EventScheduler,
    rng: StdRng,
    feed: Box<dyn TradeFeed>,
    reconnect_delay: Duration,
}

#[async_trait]
impl Actor for SymbolPerformer {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::Performer(self.state.symbol().to_string())
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let _heartbeat = self.spawn_heartbeat(supervisor_tx.clone());

        info!(
            "Performing {} on {}",
            self.state.symbol(),
            self.scheduler.channel()
        );

        loop {
            match self.feed.connect().await {
                Ok(()) => {
                    let reason = self.consume(&supervisor_tx).await?;
                    warn!(
                        "{} stream lost: {}. Reconnecting in {:?}...",
                        self.state.symbol(),
                        reason,
                        self.reconnect_delay
                    );
                    supervisor_tx
                        .send(ControlMessage::Error(self.id, reason.to_string()))
                        .await?;
                }
                Err(e) => {
                    error!(
                        "{}: {}. Retrying in {:?}...",
                        self.state.symbol(),
                        e,
                        self.reconnect_delay
                    );
                    supervisor_tx
                        .send(ControlMessage::Error(self.id, e.to_string()))
                        .await?;
                }
            }
            time::sleep(self.reconnect_delay).await;
        }
    }
}

impl SymbolPerformer {
    pub fn new(
        assignment: &SymbolAssignment,
        config: &AppConfig,
        sink: Arc<dyn OutputSink>,
        feed: Box<dyn TradeFeed>,
    ) -> Self {
        let rng = match config.humanize_seed {
            Some(seed) => StdRng::seed_from_u64(symbol_seed(seed, &assignment.symbol)),
            None => StdRng::from_entropy(),
        };

        Self {
            id: Uuid::new_v4(),
            state: SymbolState::new(&assignment.symbol, assignment.channel, &config.indicators),
            mapper: Mapper::new(config.music),
            scheduler: EventScheduler::new(assignment.channel, config.percussion_channel, sink),
            rng,
            feed,
            reconnect_delay: config.feed.reconnect_delay,
        }
    }

    pub fn state(&self) -> &SymbolState {
        &self.state
    }

    /// Reads trades until the connection is lost, returning the reason.
    /// A dead output sink ends the actor instead.
    async fn consume(
        &mut self,
        supervisor_tx: &mpsc::Sender<ControlMessage>,
    ) -> anyhow::Result<TransportError> {
        loop {
            let trade = match self.feed.next_trade().await {
                Ok(trade) => trade,
                Err(e) if e.is_discard() => {
                    warn!("Discarding {} message: {}", self.state.symbol(), e);
                    continue;
                }
                Err(e) => return Ok(e),
            };

            if let Err(e) = self.process_trade(&trade).await {
                error!("{} lost MIDI output: {}", self.state.symbol(), e);
                supervisor_tx
                    .send(ControlMessage::Fatal(self.id, e.to_string()))
                    .await?;
                bail!("MIDI output failed for {}: {}", self.state.symbol(), e);
            }
        }
    }

    async fn process_trade(&mut self, trade: &Trade) -> Result<(), OutputError> {
        let indicators = self.state.update(trade);
        let wall_clock = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let plan = self.mapper.plan(&indicators, wall_clock, &mut self.rng);

        debug!(
            "{} price={} rsi={:.1} trend={:+.4} spike={} -> {:?}",
            self.state.symbol(),
            indicators.price,
            indicators.rsi,
            indicators.trend,
            indicators.volume_spike,
            plan.melody.pitches
        );

        self.scheduler.perform(&plan).await
    }
}

/// Per-symbol seed, so symbols sharing one configured seed still differ.
fn symbol_seed(seed: u64, symbol: &str) -> u64 {
    symbol
        .bytes()
        .fold(seed ^ 0x9E37_79B9_7F4A_7C15, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0000_0100_0000_01B3)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{MidiChannel, MidiMessage};
    use midi_out::RecordingSink;
    use mockall::mock;

    mock! {
        pub Feed {}

        #[async_trait]
        impl TradeFeed for Feed {
            async fn connect(&mut self) -> Result<(), TransportError>;
            async fn next_trade(&mut self) -> Result<Trade, TransportError>;
        }
    }

    fn config() -> AppConfig {
        let lookup = |key: &str| match key {
            "HUMANIZE_SEED" => Some("7".to_string()),
            "MIDI_OUTPUT" => Some("log".to_string()),
            _ => None,
        };
        AppConfig::from_lookup(lookup).unwrap()
    }

    fn performer(feed: MockFeed, sink: Arc<dyn OutputSink>) -> SymbolPerformer {
        let config = config();
        SymbolPerformer::new(&config.symbols[0], &config, sink, Box::new(feed))
    }

    fn trade(price: f64) -> Trade {
        Trade::new(price, 1.0).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<ControlMessage>) -> Vec<ControlMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_message_is_skipped_and_reconnects_after_loss() {
        let mut feed = MockFeed::new();
        let mut connects = 0;
        feed.expect_connect().returning(move || {
            connects += 1;
            if connects == 1 {
                Err(TransportError::Connection("refused".into()))
            } else {
                Ok(())
            }
        });
        let mut reads = 0;
        feed.expect_next_trade().returning(move || {
            reads += 1;
            match reads {
                1 => Err(TransportError::Malformed("not json".into())),
                2 => Ok(trade(100.0)),
                _ => Err(TransportError::Disconnected("stream ended".into())),
            }
        });

        let sink = Arc::new(RecordingSink::new());
        let mut performer = performer(feed, sink.clone());
        let (tx, mut rx) = mpsc::channel(256);

        let outcome = time::timeout(Duration::from_secs(5), performer.run(tx)).await;
        assert!(outcome.is_err(), "performer should keep running");

        // Only the valid trade reached the indicator state.
        assert_eq!(performer.state().prices().len(), 1);

        let ch1 = MidiChannel::try_from(1).unwrap();
        let played = sink.messages();
        assert_eq!(played.len(), 4);
        assert!(played.iter().all(|m| m.channel() == ch1));
        assert!(matches!(played[0], MidiMessage::NoteOn { .. }));
        assert!(matches!(played[3], MidiMessage::NoteOff { .. }));

        let messages = drain(&mut rx);
        let errors: Vec<&String> = messages
            .iter()
            .filter_map(|m| match m {
                ControlMessage::Error(_, msg) => Some(msg),
                _ => None,
            })
            .collect();
        assert!(errors.iter().any(|m| m.contains("refused")));
        assert!(errors.iter().any(|m| m.contains("stream ended")));
        assert!(errors.len() >= 2);
        assert!(messages.iter().any(|m| matches!(m, ControlMessage::Heartbeat(_))));
        assert!(!messages.iter().any(|m| matches!(m, ControlMessage::Fatal(..))));
    }

    #[tokio::test(start_paused = true)]
    async fn sink_failure_is_fatal() {
        let mut feed = MockFeed::new();
        feed.expect_connect().returning(|| Ok(()));
        feed.expect_next_trade().returning(|| Ok(trade(100.0)));

        let sink = Arc::new(RecordingSink::failing_after(0));
        let mut performer = performer(feed, sink);
        let (tx, mut rx) = mpsc::channel(256);

        let err = performer.run(tx).await.unwrap_err();
        assert!(err.to_string().contains("btcusdt"));

        let id = performer.id();
        assert!(drain(&mut rx)
            .iter()
            .any(|m| matches!(m, ControlMessage::Fatal(sender, _) if *sender == id)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_performer_leaves_no_hanging_notes() {
        let mut feed = MockFeed::new();
        feed.expect_connect().returning(|| Ok(()));
        feed.expect_next_trade().returning(|| Ok(trade(100.0)));

        let sink = Arc::new(RecordingSink::new());
        let mut actor: Box<dyn Actor> = Box::new(performer(feed, sink.clone()));
        let (tx, _rx) = mpsc::channel(1024);

        let handle = tokio::spawn(async move {
            let _ = actor.run(tx).await;
        });
        time::sleep(Duration::from_millis(1_250)).await;
        handle.abort();
        let _ = handle.await;

        let played = sink.messages();
        let ons = played
            .iter()
            .filter(|m| matches!(m, MidiMessage::NoteOn { .. }))
            .count();
        let offs = played.len() - ons;
        assert!(ons > 0);
        assert_eq!(ons, offs);
    }

    #[test]
    fn seeded_symbols_get_distinct_streams() {
        assert_eq!(symbol_seed(7, "btcusdt"), symbol_seed(7, "btcusdt"));
        assert_ne!(symbol_seed(7, "btcusdt"), symbol_seed(7, "ethusdt"));
        assert_ne!(symbol_seed(7, "btcusdt"), symbol_seed(8, "btcusdt"));
    }

    #[test]
    fn actor_is_named_after_symbol() {
        let performer = performer(MockFeed::new(), Arc::new(RecordingSink::new()));
        assert_eq!(performer.name(), ActorType::Performer("btcusdt".to_string()));
    }
}
