//! X-Air remote - control Behringer X-Air mixers from a MIDI control surface
//!
//! The [`osc`] transport talks to the mixer, the [`mixer`] state model
//! mirrors its parameters and decides what the [`surface`] shows.

pub mod config;
pub mod error;
pub mod mixer;
pub mod osc;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, XairError};
