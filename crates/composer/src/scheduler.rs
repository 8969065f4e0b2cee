use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::{debug, warn};

use common::models::{MidiChannel, MidiMessage};
use midi_out::{OutputError, OutputSink};

use crate::mapping::MusicalPlan;

/// Notes that have been switched on and still await their note-off.
///
/// Releasing consumes the value, so a released event can never be held again.
#[derive(Debug)]
struct HeldEvent {
    channel: MidiChannel,
    pitches: Vec<u8>,
}

impl HeldEvent {
    fn release(self, sink: &dyn OutputSink) -> Result<(), OutputError> {
        let mut first_error = None;
        for &note in &self.pitches {
            let off = MidiMessage::NoteOff {
                channel: self.channel,
                note,
            };
            if let Err(e) = sink.send(&off) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Plays one symbol's plans on its own channel, strictly one event at a time.
pub struct EventScheduler {
    channel: MidiChannel,
    percussion_channel: MidiChannel,
    sink: Arc<dyn OutputSink>,
    held: Option<HeldEvent>,
}

impl EventScheduler {
    pub fn new(
        channel: MidiChannel,
        percussion_channel: MidiChannel,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            channel,
            percussion_channel,
            sink,
            held: None,
        }
    }

    pub fn channel(&self) -> MidiChannel {
        self.channel
    }

    /// True while a note-on has been sent without its note-off.
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// Melodic notes on, hold, notes off; then the percussion hit if any.
    pub async fn perform(&mut self, plan: &MusicalPlan) -> Result<(), OutputError> {
        self.play(
            self.channel,
            &plan.melody.pitches,
            plan.melody.velocity,
            plan.melody.hold,
        )
        .await?;

        if let Some(hit) = plan.percussion {
            self.play(self.percussion_channel, &[hit.note], hit.velocity, hit.hold)
                .await?;
        }
        Ok(())
    }

    async fn play(
        &mut self,
        channel: MidiChannel,
        pitches: &[u8],
        velocity: u8,
        hold: Duration,
    ) -> Result<(), OutputError> {
        // A previous event interrupted by an error is closed before anything new starts.
        self.release()?;

        self.held = Some(HeldEvent {
            channel,
            pitches: pitches.to_vec(),
        });
        for &note in pitches {
            self.sink.send(&MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            })?;
        }

        time::sleep(hold).await;
        self.release()
    }

    fn release(&mut self) -> Result<(), OutputError> {
        match self.held.take() {
            Some(event) => event.release(self.sink.as_ref()),
            None => Ok(()),
        }
    }

    /// Best-effort release of whatever is still held. Used on shutdown.
    pub fn flush(&mut self) {
        if let Some(event) = self.held.take() {
            debug!(
                "Flushing {} held note(s) on {}",
                event.pitches.len(),
                event.channel
            );
            if let Err(e) = event.release(self.sink.as_ref()) {
                warn!("Failed to flush held notes on {}: {}", self.channel, e);
            }
        }
    }
}

impl Drop for EventScheduler {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MelodicEvent, PercussionHit};
    use midi_out::RecordingSink;

    fn channel(n: u8) -> MidiChannel {
        MidiChannel::try_from(n).unwrap()
    }

    fn plan(pitches: &[u8], hold_ms: u64, drum: Option<u8>) -> MusicalPlan {
        MusicalPlan {
            melody: MelodicEvent {
                pitches: pitches.to_vec(),
                velocity: 80,
                hold: Duration::from_millis(hold_ms),
            },
            percussion: drum.map(|note| PercussionHit {
                note,
                velocity: 100,
                hold: Duration::from_millis(100),
            }),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn note_offs_follow_note_ons_after_hold() {
        let sink = Arc::new(RecordingSink::new());
        let mut scheduler = EventScheduler::new(channel(1), channel(10), sink.clone());

        let started = time::Instant::now();
        scheduler.perform(&plan(&[64, 60], 300, None)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));

        let ch = channel(1);
        assert_eq!(
            sink.messages(),
            [
                MidiMessage::NoteOn { channel: ch, note: 64, velocity: 80 },
                MidiMessage::NoteOn { channel: ch, note: 60, velocity: 80 },
                MidiMessage::NoteOff { channel: ch, note: 64 },
                MidiMessage::NoteOff { channel: ch, note: 60 },
            ]
        );
        assert!(!scheduler.is_holding());
    }

    #[tokio::test(start_paused = true)]
    async fn percussion_uses_its_own_channel_after_melody() {
        let sink = Arc::new(RecordingSink::new());
        let mut scheduler = EventScheduler::new(channel(2), channel(10), sink.clone());

        let started = time::Instant::now();
        scheduler.perform(&plan(&[60, 57], 200, Some(38))).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));

        let bytes: Vec<[u8; 3]> = sink.messages().iter().map(MidiMessage::to_bytes).collect();
        assert_eq!(
            bytes,
            [
                [0x91, 60, 80],
                [0x91, 57, 80],
                [0x81, 60, 0],
                [0x81, 57, 0],
                [0x99, 38, 100],
                [0x89, 38, 0],
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_event_is_flushed_on_drop() {
        let sink = Arc::new(RecordingSink::new());
        let mut scheduler = EventScheduler::new(channel(1), channel(10), sink.clone());

        let outcome = time::timeout(
            Duration::from_millis(50),
            scheduler.perform(&plan(&[64, 60], 500, None)),
        )
        .await;
        assert!(outcome.is_err(), "hold should still be running");
        assert!(scheduler.is_holding());
        assert_eq!(sink.len(), 2);

        drop(scheduler);
        let offs: Vec<u8> = sink
            .messages()
            .iter()
            .filter(|m| matches!(m, MidiMessage::NoteOff { .. }))
            .map(MidiMessage::note)
            .collect();
        assert_eq!(offs, [64, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_surfaces_as_error() {
        let sink = Arc::new(RecordingSink::failing_after(1));
        let mut scheduler = EventScheduler::new(channel(1), channel(10), sink.clone());

        let err = scheduler.perform(&plan(&[64, 60], 100, None)).await.unwrap_err();
        assert!(matches!(err, OutputError::SendFailed(_)));
    }

    #[test]
    fn idle_flush_sends_nothing() {
        let sink = Arc::new(RecordingSink::new());
        let mut scheduler = EventScheduler::new(channel(1), channel(10), sink.clone());
        scheduler.flush();
        drop(scheduler);
        assert!(sink.is_empty());
    }
}
