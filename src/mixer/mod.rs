//! Mixer state module - mirrored subset of the X-Air parameters
//!
//! Holds the five fixed banks of channel strips, the active selection, and the
//! rules that keep the mixer, this mirror and the control surface in sync.
//! All access goes through the [`MixerActor`] via a [`MixerHandle`].

mod actor;
mod actor_handle;
mod banks;
mod commands;
mod input;
mod model;
pub mod replay;
mod types;

pub use actor::MixerActor;
pub use actor_handle::MixerHandle;
pub use banks::{
    default_banks, Bank, BANK_COUNT, BANK_HEADAMPS_HIGH, BANK_HEADAMPS_LOW, BANK_INPUTS_HIGH,
    BANK_INPUTS_LOW, BANK_OUTPUTS,
};
pub use commands::MixerCommand;
pub use input::SurfaceInput;
pub use model::{MixerModel, Selection};
pub use replay::read_initial_state;
pub use types::{
    is_fader_mode, BusSend, Channel, ChannelKind, Param, DEFAULT_BUS, FADER_MODE_BUSES,
    SENDS_PER_CHANNEL, SLOTS_PER_BANK, UNITY_LEVEL,
};

use crate::osc::OscParams;

/// Outbound path to the mixer
///
/// Sends are fire-and-forget: no acknowledgment, no retry.
pub trait MixerLink: Send + Sync {
    fn send(&self, address: &str, params: OscParams);
}
