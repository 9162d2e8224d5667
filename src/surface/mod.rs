//! Control-surface adapters
//!
//! The state model pushes indicator updates through [`ControlSurface`]; the
//! adapter turns physical input into [`crate::mixer::SurfaceInput`] events.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub mod console;
pub mod midi;
pub mod xtouch;

pub use console::ConsoleSurface;
pub use xtouch::XTouchSurface;

/// Capabilities the state model needs from a physical surface
///
/// All push methods are fire-and-forget: they are called from the state
/// actor and must never block on hardware I/O.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Surface name for logging
    fn name(&self) -> &str;

    /// Move the motor fader of a position
    fn set_channel_fader(&self, slot: usize, value: f32);

    /// Light the mute indicator of a position (`on == false` means muted)
    fn set_channel_mute(&self, slot: usize, on: bool);

    /// Show the currently mapped parameter on the encoder ring
    fn set_ring(&self, slot: usize, value: f32);

    /// Re-map the secondary function of the eight positions to a bus
    fn activate_bus(&self, bus: usize);

    /// Watch the surface connection until `shutdown` is cancelled
    ///
    /// Implementations cancel `shutdown` themselves when the surface goes
    /// away. Default implementation: wait for cancellation.
    async fn monitor_ports(&self, shutdown: CancellationToken) -> Result<()> {
        shutdown.cancelled().await;
        Ok(())
    }
}

/// Run the surface watchdog in the background
///
/// The task resolves to the watchdog error when the surface went away, so
/// the caller can report the disconnect once shutdown completes.
pub fn spawn_watchdog(
    surface: Arc<dyn ControlSurface>,
    shutdown: CancellationToken,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let result = surface.monitor_ports(shutdown.clone()).await;
        if result.is_err() {
            shutdown.cancel();
        }
        result
    })
}
