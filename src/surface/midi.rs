//! MIDI message types for the control surface
//!
//! Provides parsing and encoding of the channel messages a Mackie-Control
//! surface exchanges, plus the MCU value conversions.

use std::fmt;

/// MIDI channel messages used by the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    ///
    /// Running status, system and unsupported channel messages yield `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        if !(0x80..0xF0).contains(&status) || rest.len() < 2 {
            return None;
        }

        let channel = status & 0x0F;
        let (d1, d2) = (rest[0] & 0x7F, rest[1] & 0x7F);

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: d1,
                velocity: d2,
            }),
            // Note On with velocity 0 = Note Off
            0x90 if d2 == 0 => Some(MidiMessage::NoteOff {
                channel,
                note: d1,
                velocity: 0,
            }),
            0x90 => Some(MidiMessage::NoteOn {
                channel,
                note: d1,
                velocity: d2,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: d1,
                value: d2,
            }),
            0xE0 => Some(MidiMessage::PitchBend {
                channel,
                value: ((d2 as u16) << 7) | d1 as u16,
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity),
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
        }
    }
}

/// Mackie-Control value conversions
pub mod convert {
    /// Full scale of a 14-bit pitch-bend fader
    pub const PITCH_BEND_MAX: u16 = 16383;

    /// Decode a relative V-Pot value: bit 6 = counter-clockwise, low 6 bits = ticks
    pub fn relative_ticks(value: u8) -> i32 {
        let ticks = (value & 0x3F) as i32;
        if value & 0x40 != 0 {
            -ticks
        } else {
            ticks
        }
    }

    /// Normalized level to motor-fader position
    pub fn level_to_pitch_bend(level: f32) -> u16 {
        (level.clamp(0.0, 1.0) * PITCH_BEND_MAX as f32).round() as u16
    }

    /// Normalized level to an LED ring value (fan mode, 11 positions)
    pub fn level_to_ring(level: f32) -> u8 {
        0x20 | (1 + (level.clamp(0.0, 1.0) * 10.0).round() as u8)
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
