//! MixerHandle - public API of the MixerActor
//!
//! Fire-and-forget methods for the hot paths (surface input, inbound mixer
//! events) and async methods with oneshot replies for queries.

use tokio::sync::{mpsc, oneshot};

use super::commands::MixerCommand;
use super::input::SurfaceInput;
use super::model::Selection;
use super::types::Channel;

/// Cloneable handle to the mixer state
///
/// All slot/bus arguments are relative to the active bank. Requests that map
/// to no channel, or to a send on a strip without sends, are ignored.
#[derive(Clone)]
pub struct MixerHandle {
    cmd_tx: mpsc::UnboundedSender<MixerCommand>,
}

impl MixerHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<MixerCommand>) -> Self {
        Self { cmd_tx }
    }

    fn post(&self, cmd: MixerCommand) {
        let _ = self.cmd_tx.send(cmd);
    }

    // =========================================================================
    // Mutations (fire-and-forget)
    // =========================================================================

    pub fn toggle_mute(&self, slot: usize) {
        self.post(MixerCommand::ToggleMute { slot });
    }

    pub fn toggle_send_mute(&self, slot: usize, bus: usize) {
        self.post(MixerCommand::ToggleSendMute { slot, bus });
    }

    pub fn change_fader(&self, slot: usize, delta: i32) {
        self.post(MixerCommand::ChangeFader { slot, delta });
    }

    pub fn set_fader(&self, slot: usize, value: f32) {
        self.post(MixerCommand::SetFader { slot, value });
    }

    pub fn change_bus_send(&self, slot: usize, bus: usize, delta: i32) {
        self.post(MixerCommand::ChangeBusSend { slot, bus, delta });
    }

    pub fn set_bus_send(&self, slot: usize, bus: usize, value: f32) {
        self.post(MixerCommand::SetBusSend { slot, bus, value });
    }

    pub fn change_headamp(&self, slot: usize, delta: i32) {
        self.post(MixerCommand::ChangeHeadamp { slot, delta });
    }

    /// Forward a raw surface gesture
    pub fn input(&self, input: SurfaceInput) {
        self.post(MixerCommand::Input(input));
    }

    /// Reconcile a value reported by the mixer
    pub fn receive(&self, address: impl Into<String>, value: f32) {
        self.post(MixerCommand::Receive {
            address: address.into(),
            value,
        });
    }

    pub fn select_bank(&self, bank: usize) {
        self.post(MixerCommand::SelectBank { bank });
    }

    pub fn select_bus(&self, bus: usize) {
        self.post(MixerCommand::SelectBus { bus });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn selection(&self) -> Option<Selection> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(MixerCommand::GetSelection { response })
            .ok()?;
        rx.await.ok()
    }

    /// Snapshot of one channel strip
    pub async fn channel(&self, bank: usize, slot: usize) -> Option<Channel> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(MixerCommand::GetChannel {
                bank,
                slot,
                response,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn initial_queries(&self) -> Vec<String> {
        let (response, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(MixerCommand::GetInitialQueries { response })
            .is_err()
        {
            return Vec::new();
        }
        rx.await.ok().unwrap_or_default()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    pub fn shutdown(&self) {
        self.post(MixerCommand::Shutdown);
    }
}
