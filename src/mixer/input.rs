//! Physical input resolution
//!
//! The surface reports what was touched; which mixer parameter that means
//! depends on the active bank and bus, so the state model decides.

use super::banks::{BANK_COUNT, BANK_HEADAMPS_HIGH, BANK_HEADAMPS_LOW};
use super::model::MixerModel;
use super::types::UNITY_LEVEL;

/// A control-surface gesture on one of the eight positions or the pager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceInput {
    /// Encoder turned by `delta` ticks (negative = counter-clockwise)
    Rotate { slot: usize, delta: i32 },
    /// Encoder pushed
    Press { slot: usize },
    /// Mute button of a position
    Button { slot: usize },
    BankPrev,
    BankNext,
    /// Map the positions onto a bus (8 and 9 select fader/mute mode)
    SelectBus { bus: usize },
}

impl MixerModel {
    /// Turn a surface gesture into the matching mutation
    pub fn handle_input(&mut self, input: SurfaceInput) {
        let selection = self.selection();
        let headamps = matches!(selection.bank, BANK_HEADAMPS_LOW | BANK_HEADAMPS_HIGH);

        match input {
            SurfaceInput::Rotate { slot, delta } => {
                if headamps {
                    self.change_headamp(slot, delta);
                } else if selection.fader_mode() {
                    self.change_fader(slot, delta);
                } else {
                    self.change_bus_send(slot, selection.bus, delta);
                }
            }
            SurfaceInput::Press { slot } => {
                if headamps {
                    return;
                }
                if selection.fader_mode() {
                    self.set_fader(slot, UNITY_LEVEL);
                } else {
                    self.set_bus_send(slot, selection.bus, UNITY_LEVEL);
                }
            }
            SurfaceInput::Button { slot } => {
                if selection.fader_mode() {
                    self.toggle_mute(slot);
                } else {
                    self.toggle_send_mute(slot, selection.bus);
                }
            }
            SurfaceInput::BankPrev => {
                self.select_bank((selection.bank + BANK_COUNT - 1) % BANK_COUNT);
            }
            SurfaceInput::BankNext => {
                self.select_bank((selection.bank + 1) % BANK_COUNT);
            }
            SurfaceInput::SelectBus { bus } => self.select_bus(bus),
        }
    }
}
