use std::fmt;

use thiserror::Error;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("MIDI channel must be within 1..=16, got {0}")]
pub struct InvalidChannel(pub u8);

/// A MIDI channel in the user-facing 1..=16 numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MidiChannel(u8);

impl MidiChannel {
    pub fn number(self) -> u8 {
        self.0
    }

    /// Low nibble of the status byte (0..=15).
    pub fn status_nibble(self) -> u8 {
        self.0 - 1
    }
}

impl TryFrom<u8> for MidiChannel {
    type Error = InvalidChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=16).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidChannel(value))
        }
    }
}

impl fmt::Display for MidiChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn {
        channel: MidiChannel,
        note: u8,
        velocity: u8,
    },
    NoteOff {
        channel: MidiChannel,
        note: u8,
    },
}

impl MidiMessage {
    pub fn channel(&self) -> MidiChannel {
        match *self {
            Self::NoteOn { channel, .. } | Self::NoteOff { channel, .. } => channel,
        }
    }

    pub fn note(&self) -> u8 {
        match *self {
            Self::NoteOn { note, .. } | Self::NoteOff { note, .. } => note,
        }
    }

    /// Channel-voice wire encoding. Data bytes are masked to 7 bits.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            Self::NoteOn {
                channel,
                note,
                velocity,
            } => [
                NOTE_ON | channel.status_nibble(),
                note & 0x7f,
                velocity & 0x7f,
            ],
            Self::NoteOff { channel, note } => {
                [NOTE_OFF | channel.status_nibble(), note & 0x7f, 0]
            }
        }
    }
}
