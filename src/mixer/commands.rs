//! Command enum for the mixer state actor
//!
//! Hot-path commands (mutations, inbound events) are fire-and-forget.
//! Queries carry a oneshot channel for the reply.

use tokio::sync::oneshot;

use super::input::SurfaceInput;
use super::model::Selection;
use super::types::Channel;

pub enum MixerCommand {
    // -------------------------------------------------------------------------
    // Local mutations (from the control surface)
    // -------------------------------------------------------------------------
    ToggleMute { slot: usize },
    ToggleSendMute { slot: usize, bus: usize },
    ChangeFader { slot: usize, delta: i32 },
    SetFader { slot: usize, value: f32 },
    ChangeBusSend { slot: usize, bus: usize, delta: i32 },
    SetBusSend { slot: usize, bus: usize, value: f32 },
    ChangeHeadamp { slot: usize, delta: i32 },
    /// Raw surface gesture, resolved against the active selection
    Input(SurfaceInput),

    // -------------------------------------------------------------------------
    // Inbound (from the mixer)
    // -------------------------------------------------------------------------
    /// Parameter value reported by the mixer
    Receive { address: String, value: f32 },

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------
    SelectBank { bank: usize },
    SelectBus { bus: usize },

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------
    GetSelection {
        response: oneshot::Sender<Selection>,
    },
    GetChannel {
        bank: usize,
        slot: usize,
        response: oneshot::Sender<Option<Channel>>,
    },
    /// Startup replay queries in scan order
    GetInitialQueries {
        response: oneshot::Sender<Vec<String>>,
    },

    Shutdown,
}

impl std::fmt::Debug for MixerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MixerCommand::ToggleMute { slot } => write!(f, "ToggleMute({})", slot),
            MixerCommand::ToggleSendMute { slot, bus } => {
                write!(f, "ToggleSendMute({}, {})", slot, bus)
            }
            MixerCommand::ChangeFader { slot, delta } => {
                write!(f, "ChangeFader({}, {:+})", slot, delta)
            }
            MixerCommand::SetFader { slot, value } => write!(f, "SetFader({}, {})", slot, value),
            MixerCommand::ChangeBusSend { slot, bus, delta } => {
                write!(f, "ChangeBusSend({}, {}, {:+})", slot, bus, delta)
            }
            MixerCommand::SetBusSend { slot, bus, value } => {
                write!(f, "SetBusSend({}, {}, {})", slot, bus, value)
            }
            MixerCommand::ChangeHeadamp { slot, delta } => {
                write!(f, "ChangeHeadamp({}, {:+})", slot, delta)
            }
            MixerCommand::Input(input) => write!(f, "Input({:?})", input),
            MixerCommand::Receive { address, value } => {
                write!(f, "Receive({}, {})", address, value)
            }
            MixerCommand::SelectBank { bank } => write!(f, "SelectBank({})", bank),
            MixerCommand::SelectBus { bus } => write!(f, "SelectBus({})", bus),
            MixerCommand::GetSelection { .. } => write!(f, "GetSelection"),
            MixerCommand::GetChannel { bank, slot, .. } => {
                write!(f, "GetChannel({}, {})", bank, slot)
            }
            MixerCommand::GetInitialQueries { .. } => write!(f, "GetInitialQueries"),
            MixerCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}
