//! OSC transport to X-Air mixers
//!
//! Encoding, discovery, the connected client and routing of inbound messages.

pub mod client;
pub mod codec;
pub mod discovery;
pub mod dispatch;

pub use client::{XAirClient, KEEPALIVE_INTERVAL, VALIDATE_TIMEOUT};
pub use codec::{decode_packet, encode_message, OscParams};
pub use discovery::{discover, discover_at, MixerInfo, DISCOVERY_TIMEOUT};
pub use dispatch::{dispatch, Route};

/// UDP port X-Air mixers listen on
pub const XAIR_PORT: u16 = 10024;

/// Info query, answered with `[ip, name, model, firmware]`
pub const INFO_ADDRESS: &str = "/xinfo";

/// Subscribe to parameter updates without echo of our own changes
pub const KEEPALIVE_ADDRESS: &str = "/xremotenfb";
