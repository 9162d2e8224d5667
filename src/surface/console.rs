//! Console surface - logs every indicator push
//!
//! Used when no hardware surface is configured, e.g. to watch the mixer
//! state mirror without an X-Touch attached.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::ControlSurface;

pub struct ConsoleSurface {
    name: String,
    /// Push counter for debugging
    push_count: Mutex<u64>,
}

impl ConsoleSurface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            push_count: Mutex::new(0),
        }
    }

    pub fn push_count(&self) -> u64 {
        *self.push_count.lock()
    }

    fn bump(&self) -> u64 {
        let mut count = self.push_count.lock();
        *count += 1;
        *count
    }
}

#[async_trait]
impl ControlSurface for ConsoleSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_channel_fader(&self, slot: usize, value: f32) {
        let n = self.bump();
        debug!("🎚️  [{}] fader {} → {:.3} [push #{}]", self.name, slot, value, n);
    }

    fn set_channel_mute(&self, slot: usize, on: bool) {
        let n = self.bump();
        debug!(
            "🔇 [{}] mute {} → {} [push #{}]",
            self.name,
            slot,
            if on { "on" } else { "muted" },
            n
        );
    }

    fn set_ring(&self, slot: usize, value: f32) {
        let n = self.bump();
        debug!("🎛️  [{}] ring {} → {:.3} [push #{}]", self.name, slot, value, n);
    }

    fn activate_bus(&self, bus: usize) {
        self.bump();
        info!("🔀 [{}] active bus → {}", self.name, bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_pushes() {
        let surface = ConsoleSurface::new("console");
        surface.set_ring(0, 0.5);
        surface.set_channel_mute(1, false);
        surface.activate_bus(8);
        assert_eq!(surface.push_count(), 3);
        assert_eq!(surface.name(), "console");
    }
}
