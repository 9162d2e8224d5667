//! Mixer state type definitions
//!
//! Defines channel strips, their sends, and the parameters addressed on the wire.

use std::fmt;

/// Number of control-surface positions per bank
pub const SLOTS_PER_BANK: usize = 8;

/// Number of sends on an input strip (6 aux buses followed by 4 effects)
pub const SENDS_PER_CHANNEL: usize = 10;

/// Encoder ticks that span the full 0..1 range
pub const TICKS_PER_FULL_SCALE: f32 = 200.0;

/// Normalized level of 0 dB on the X-Air fader law
pub const UNITY_LEVEL: f32 = 0.75;

/// Bus selector values that map the surface onto channel fader and mute
pub const FADER_MODE_BUSES: [usize; 2] = [8, 9];

/// Bus selected at startup
pub const DEFAULT_BUS: usize = 8;

/// Clamp a level into the normalized range
pub fn clamp_level(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Apply an encoder delta to a level
pub fn step_level(current: f32, delta: i32) -> f32 {
    clamp_level(current + delta as f32 / TICKS_PER_FULL_SCALE)
}

/// Whether a bus selector value means "fader/mute mode"
pub fn is_fader_mode(bus: usize) -> bool {
    FADER_MODE_BUSES.contains(&bus)
}

/// A channel's routing into one bus
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusSend {
    /// Last level set while enabled; kept while the send is disabled
    pub level: f32,
    pub enabled: bool,
}

impl Default for BusSend {
    fn default() -> Self {
        Self {
            level: 0.0,
            enabled: true,
        }
    }
}

impl BusSend {
    /// Level the device should currently be running
    pub fn wire_level(&self) -> f32 {
        if self.enabled {
            self.level
        } else {
            0.0
        }
    }
}

/// What kind of strip a channel is
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelKind {
    /// Input strip with per-bus sends; send `i` routes to bus `i + 1`
    Input { sends: [BusSend; SENDS_PER_CHANNEL] },
    /// Bus, return or main strip: fader and mute only
    Bus,
    /// Mic preamp: gain only, stored in the fader field
    Headamp,
}

/// One addressable mixer strip
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Base OSC address (e.g. "/ch/01/mix")
    pub base_addr: String,
    pub kind: ChannelKind,
    /// Fader level, or gain for headamps
    pub fader: f32,
    pub on: bool,
}

impl Channel {
    pub fn input(base_addr: impl Into<String>) -> Self {
        Self::with_kind(
            base_addr,
            ChannelKind::Input {
                sends: [BusSend::default(); SENDS_PER_CHANNEL],
            },
        )
    }

    pub fn bus(base_addr: impl Into<String>) -> Self {
        Self::with_kind(base_addr, ChannelKind::Bus)
    }

    pub fn headamp(base_addr: impl Into<String>) -> Self {
        Self::with_kind(base_addr, ChannelKind::Headamp)
    }

    fn with_kind(base_addr: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            base_addr: base_addr.into(),
            kind,
            fader: 0.0,
            on: true,
        }
    }

    pub fn is_headamp(&self) -> bool {
        matches!(self.kind, ChannelKind::Headamp)
    }

    pub fn sends(&self) -> Option<&[BusSend; SENDS_PER_CHANNEL]> {
        match &self.kind {
            ChannelKind::Input { sends } => Some(sends),
            _ => None,
        }
    }

    pub fn send_mut(&mut self, bus: usize) -> Option<&mut BusSend> {
        match &mut self.kind {
            ChannelKind::Input { sends } => sends.get_mut(bus),
            _ => None,
        }
    }

    /// Full OSC address of one of this strip's parameters
    pub fn address(&self, param: Param) -> String {
        format!("{}{}", self.base_addr, param)
    }

    /// Parameters replayed at startup, in query order
    pub fn queried_params(&self) -> Vec<Param> {
        match &self.kind {
            ChannelKind::Headamp => vec![Param::Gain],
            ChannelKind::Bus => vec![Param::Fader, Param::On],
            ChannelKind::Input { sends } => {
                let mut params = vec![Param::Fader, Param::On];
                params.extend((0..sends.len()).map(Param::SendLevel));
                params
            }
        }
    }

    /// Whether `address` lies inside this strip's namespace
    pub fn owns(&self, address: &str) -> bool {
        address
            .strip_prefix(self.base_addr.as_str())
            .map(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(false)
    }
}

/// A channel parameter as it appears at the end of an OSC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    Fader,
    On,
    /// Send level, zero-based bus index
    SendLevel(usize),
    Gain,
}

impl Param {
    /// Classify the tail of an inbound address
    pub fn parse_suffix(address: &str) -> Option<Self> {
        if address.ends_with("/fader") {
            Some(Param::Fader)
        } else if address.ends_with("/on") {
            Some(Param::On)
        } else if address.ends_with("/gain") {
            Some(Param::Gain)
        } else if let Some(head) = address.strip_suffix("/level") {
            // "<base>/NN/level", NN is the one-based bus number
            let (_, digits) = head.rsplit_once('/')?;
            if digits.len() != 2 {
                return None;
            }
            let bus: usize = digits.parse().ok()?;
            if (1..=SENDS_PER_CHANNEL).contains(&bus) {
                Some(Param::SendLevel(bus - 1))
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Fader => write!(f, "/fader"),
            Param::On => write!(f, "/on"),
            Param::SendLevel(bus) => write!(f, "/{:02}/level", bus + 1),
            Param::Gain => write!(f, "/gain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_suffixes() {
        assert_eq!(Param::parse_suffix("/ch/03/mix/fader"), Some(Param::Fader));
        assert_eq!(Param::parse_suffix("/lr/mix/on"), Some(Param::On));
        assert_eq!(Param::parse_suffix("/headamp/12/gain"), Some(Param::Gain));
        assert_eq!(
            Param::parse_suffix("/ch/01/mix/07/level"),
            Some(Param::SendLevel(6))
        );
        assert_eq!(
            Param::parse_suffix("/ch/01/mix/10/level"),
            Some(Param::SendLevel(9))
        );
        assert_eq!(Param::parse_suffix("/ch/01/mix/11/level"), None);
        assert_eq!(Param::parse_suffix("/ch/01/mix/00/level"), None);
        assert_eq!(Param::parse_suffix("/ch/01/mix/pan"), None);
    }

    #[test]
    fn test_param_display() {
        let ch = Channel::input("/ch/02/mix");
        assert_eq!(ch.address(Param::SendLevel(0)), "/ch/02/mix/01/level");
        assert_eq!(ch.address(Param::On), "/ch/02/mix/on");
    }

    #[test]
    fn test_owns_requires_path_boundary() {
        let ch = Channel::bus("/bus/1/mix");
        assert!(ch.owns("/bus/1/mix/fader"));
        assert!(!ch.owns("/bus/1/mixer/fader"));
        assert!(!ch.owns("/bus/10/mix/fader"));
    }

    #[test]
    fn test_only_inputs_have_sends() {
        assert!(Channel::input("/ch/01/mix").sends().is_some());
        assert!(Channel::bus("/lr/mix").sends().is_none());
        assert!(Channel::headamp("/headamp/01").sends().is_none());
    }

    #[test]
    fn test_disabled_send_goes_silent_on_wire() {
        let send = BusSend {
            level: 0.4,
            enabled: false,
        };
        assert_eq!(send.wire_level(), 0.0);
        assert_eq!(send.level, 0.4);
    }

    #[test]
    fn test_step_level_clamps() {
        assert_eq!(step_level(0.0, -5), 0.0);
        assert_eq!(step_level(0.99, 10), 1.0);
        assert!((step_level(0.5, 20) - 0.6).abs() < 1e-6);
        assert_eq!(clamp_level(f32::NAN), 0.0);
    }
}
