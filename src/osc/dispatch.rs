//! Inbound message routing
//!
//! An inbound message is an info reply (used for validation), a meter blob
//! (not mirrored), a parameter value for the state model, or noise that is
//! only logged.

use rosc::OscMessage;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::codec::arg_as_f32;
use super::discovery::MixerInfo;
use super::INFO_ADDRESS;
use crate::mixer::MixerHandle;

const METERS_PREFIX: &str = "/meters";
const MUTE_GROUP_PREFIX: &str = "/config/mute";
const STATE_SUFFIXES: [&str; 4] = ["/fader", "/on", "/level", "/gain"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Info,
    Meters,
    State,
    Unhandled,
}

impl Route {
    pub fn classify(address: &str) -> Self {
        if address == INFO_ADDRESS {
            Route::Info
        } else if address == METERS_PREFIX || address.starts_with("/meters/") {
            Route::Meters
        } else if address.starts_with(MUTE_GROUP_PREFIX)
            || STATE_SUFFIXES.iter().any(|suffix| address.ends_with(suffix))
        {
            Route::State
        } else {
            Route::Unhandled
        }
    }
}

/// Route one decoded message
pub fn dispatch(msg: OscMessage, mixer: &MixerHandle, info_tx: &watch::Sender<Option<MixerInfo>>) {
    match Route::classify(&msg.addr) {
        Route::Info => match MixerInfo::from_reply(&msg) {
            Ok(info) => {
                debug!("Info reply: {}", info);
                info_tx.send_replace(Some(info));
            }
            Err(e) => warn!("⚠️  {}", e),
        },
        Route::Meters => trace!("Meter data on {} ({} args)", msg.addr, msg.args.len()),
        Route::State => match msg.args.first().and_then(arg_as_f32) {
            Some(value) => mixer.receive(msg.addr, value),
            None => debug!("Ignoring {} without numeric argument", msg.addr),
        },
        Route::Unhandled => debug!("Unhandled message {} {:?}", msg.addr, msg.args),
    }
}
