//! Recording doubles for the mixer link and the control surface

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::mixer::MixerLink;
use crate::osc::OscParams;
use crate::surface::ControlSurface;

/// Records every message sent to the mixer
#[derive(Default)]
pub(crate) struct RecordingLink {
    pub sent: Mutex<Vec<(String, OscParams)>>,
}

impl MixerLink for RecordingLink {
    fn send(&self, address: &str, params: OscParams) {
        self.sent.lock().push((address.to_string(), params));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Push {
    Fader(usize, f32),
    Mute(usize, bool),
    Ring(usize, f32),
    Bus(usize),
}

/// Records every indicator push
#[derive(Default)]
pub(crate) struct RecordingSurface {
    pub pushes: Mutex<Vec<Push>>,
}

impl RecordingSurface {
    pub fn take(&self) -> Vec<Push> {
        std::mem::take(&mut *self.pushes.lock())
    }
}

#[async_trait]
impl ControlSurface for RecordingSurface {
    fn name(&self) -> &str {
        "recording"
    }

    fn set_channel_fader(&self, slot: usize, value: f32) {
        self.pushes.lock().push(Push::Fader(slot, value));
    }

    fn set_channel_mute(&self, slot: usize, on: bool) {
        self.pushes.lock().push(Push::Mute(slot, on));
    }

    fn set_ring(&self, slot: usize, value: f32) {
        self.pushes.lock().push(Push::Ring(slot, value));
    }

    fn activate_bus(&self, bus: usize) {
        self.pushes.lock().push(Push::Bus(bus));
    }
}
