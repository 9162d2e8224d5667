//! MixerActor - single owner of the mirrored mixer state
//!
//! Both the receive loop and the surface input path mutate the same
//! channels. Routing every command through one task serializes those writes,
//! so operator-entered and mixer-echoed values always converge.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::actor_handle::MixerHandle;
use super::commands::MixerCommand;
use super::model::MixerModel;
use super::MixerLink;
use crate::surface::ControlSurface;

pub struct MixerActor {
    model: MixerModel,
    command_rx: mpsc::UnboundedReceiver<MixerCommand>,
    /// Inbound events processed, for the shutdown log line
    received_count: u64,
}

impl MixerActor {
    /// Spawn the actor on the current runtime and return its handle
    pub fn spawn(link: Arc<dyn MixerLink>, surface: Arc<dyn ControlSurface>) -> MixerHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = MixerActor {
            model: MixerModel::new(link, surface),
            command_rx: cmd_rx,
            received_count: 0,
        };

        tokio::spawn(actor.run());
        info!("MixerActor spawned");

        MixerHandle::new(cmd_tx)
    }

    async fn run(mut self) {
        debug!("MixerActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                MixerCommand::ToggleMute { slot } => self.model.toggle_mute(slot),
                MixerCommand::ToggleSendMute { slot, bus } => {
                    self.model.toggle_send_mute(slot, bus)
                }
                MixerCommand::ChangeFader { slot, delta } => self.model.change_fader(slot, delta),
                MixerCommand::SetFader { slot, value } => self.model.set_fader(slot, value),
                MixerCommand::ChangeBusSend { slot, bus, delta } => {
                    self.model.change_bus_send(slot, bus, delta)
                }
                MixerCommand::SetBusSend { slot, bus, value } => {
                    self.model.set_bus_send(slot, bus, value)
                }
                MixerCommand::ChangeHeadamp { slot, delta } => {
                    self.model.change_headamp(slot, delta)
                }
                MixerCommand::Input(input) => self.model.handle_input(input),

                MixerCommand::Receive { address, value } => {
                    self.received_count += 1;
                    self.model.receive(&address, value);
                }

                MixerCommand::SelectBank { bank } => self.model.select_bank(bank),
                MixerCommand::SelectBus { bus } => self.model.select_bus(bus),

                MixerCommand::GetSelection { response } => {
                    let _ = response.send(self.model.selection());
                }
                MixerCommand::GetChannel {
                    bank,
                    slot,
                    response,
                } => {
                    let _ = response.send(self.model.channel(bank, slot).cloned());
                }
                MixerCommand::GetInitialQueries { response } => {
                    let _ = response.send(self.model.initial_queries());
                }

                MixerCommand::Shutdown => {
                    info!("MixerActor received shutdown command");
                    break;
                }
            }
        }

        info!(
            received = self.received_count,
            "MixerActor run loop terminated"
        );
    }
}
