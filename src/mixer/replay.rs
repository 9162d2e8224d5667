//! Startup state replay
//!
//! Pulls the full mirrored state from the mixer with one value-less query per
//! parameter. Replies come back through the normal receive path. The queries
//! are paced because the mixer drops messages when its input queue overruns.

use std::time::Duration;

use tracing::info;

use super::actor_handle::MixerHandle;
use super::MixerLink;
use crate::osc::OscParams;

/// Pause between two replay queries
pub const DEFAULT_REPLAY_DELAY: Duration = Duration::from_millis(2);

/// Send each query in order, sleeping `delay` after every one
pub async fn replay_queries(link: &dyn MixerLink, queries: &[String], delay: Duration) {
    for address in queries {
        link.send(address, OscParams::None);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Query every mirrored parameter of the mixer
pub async fn read_initial_state(mixer: &MixerHandle, link: &dyn MixerLink, delay: Duration) {
    let queries = mixer.initial_queries().await;
    info!("🔄 Reading initial mixer state ({} queries)", queries.len());
    replay_queries(link, &queries, delay).await;
    info!("✅ Initial state requested");
}
