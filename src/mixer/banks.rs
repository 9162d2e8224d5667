//! Fixed bank layout of the X-Air 18
//!
//! Five pages of eight strips each. The layout never changes at runtime.

use super::types::{Channel, SLOTS_PER_BANK};

pub const BANK_COUNT: usize = 5;

pub const BANK_INPUTS_LOW: usize = 0;
pub const BANK_INPUTS_HIGH: usize = 1;
pub const BANK_HEADAMPS_LOW: usize = 2;
pub const BANK_HEADAMPS_HIGH: usize = 3;
pub const BANK_OUTPUTS: usize = 4;

pub type Bank = [Channel; SLOTS_PER_BANK];

/// Build the five banks in scan order
pub fn default_banks() -> [Bank; BANK_COUNT] {
    [
        std::array::from_fn(|i| Channel::input(format!("/ch/{:02}/mix", i + 1))),
        std::array::from_fn(|i| Channel::input(format!("/ch/{:02}/mix", i + 9))),
        std::array::from_fn(|i| Channel::headamp(format!("/headamp/{:02}", i + 1))),
        std::array::from_fn(|i| Channel::headamp(format!("/headamp/{:02}", i + 9))),
        std::array::from_fn(|i| match i {
            0..=5 => Channel::bus(format!("/bus/{}/mix", i + 1)),
            6 => Channel::bus("/rtn/aux/mix"),
            _ => Channel::bus("/lr/mix"),
        }),
    ]
}
