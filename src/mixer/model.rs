//! Mirrored mixer state
//!
//! `MixerModel` owns the banked channel strips and the active selection. Local
//! mutations are written through to the mixer and echoed to the surface;
//! inbound mixer events are reconciled and pushed to the surface only when
//! the changed parameter is the one currently mapped onto it.

use std::sync::Arc;

use tracing::{debug, trace};

use super::banks::{default_banks, Bank, BANK_COUNT};
use super::types::{
    clamp_level, is_fader_mode, step_level, Channel, Param, DEFAULT_BUS, SLOTS_PER_BANK,
};
use super::MixerLink;
use crate::surface::ControlSurface;

/// Which bank is shown and which bus the secondary function is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub bank: usize,
    pub bus: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            bank: 0,
            bus: DEFAULT_BUS,
        }
    }
}

impl Selection {
    pub fn fader_mode(&self) -> bool {
        is_fader_mode(self.bus)
    }
}

/// Canonical in-process mirror of the mixer parameters
pub struct MixerModel {
    banks: [Bank; BANK_COUNT],
    selection: Selection,
    link: Arc<dyn MixerLink>,
    surface: Arc<dyn ControlSurface>,
}

impl MixerModel {
    pub fn new(link: Arc<dyn MixerLink>, surface: Arc<dyn ControlSurface>) -> Self {
        Self {
            banks: default_banks(),
            selection: Selection::default(),
            link,
            surface,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn channel(&self, bank: usize, slot: usize) -> Option<&Channel> {
        self.banks.get(bank)?.get(slot)
    }

    pub fn banks(&self) -> &[Bank; BANK_COUNT] {
        &self.banks
    }

    fn active_channel_mut(&mut self, slot: usize) -> Option<&mut Channel> {
        self.banks.get_mut(self.selection.bank)?.get_mut(slot)
    }

    fn send_to_mixer(&self, address: String, value: impl Into<crate::osc::OscParams>) {
        let params = value.into();
        debug!("📤 {} {:?}", address, params);
        self.link.send(&address, params);
    }

    // =========================================================================
    // Local mutations (from the control surface)
    // =========================================================================

    /// Flip a strip's on/off state
    pub fn toggle_mute(&mut self, slot: usize) {
        let Some(ch) = self.active_channel_mut(slot) else {
            return;
        };
        if ch.is_headamp() {
            return;
        }
        ch.on = !ch.on;
        let (addr, on) = (ch.address(Param::On), ch.on);
        self.send_to_mixer(addr, on);
        self.surface.set_channel_mute(slot, on);
    }

    /// Flip a send's enable flag
    ///
    /// Disabling sends 0.0 to the mixer but keeps the level locally so that
    /// enabling again restores it exactly.
    pub fn toggle_send_mute(&mut self, slot: usize, bus: usize) {
        let Some(ch) = self.active_channel_mut(slot) else {
            return;
        };
        let addr = ch.address(Param::SendLevel(bus));
        let Some(send) = ch.send_mut(bus) else {
            return;
        };
        send.enabled = !send.enabled;
        let (wire, enabled) = (send.wire_level(), send.enabled);
        self.send_to_mixer(addr, wire);
        self.surface.set_channel_mute(slot, enabled);
    }

    /// Move a fader by encoder ticks
    pub fn change_fader(&mut self, slot: usize, delta: i32) {
        if let Some(level) = self.fader_level(slot) {
            self.set_fader(slot, step_level(level, delta));
        }
    }

    /// Set a fader to an absolute normalized level
    pub fn set_fader(&mut self, slot: usize, value: f32) {
        let Some(ch) = self.active_channel_mut(slot) else {
            return;
        };
        if ch.is_headamp() {
            return;
        }
        ch.fader = clamp_level(value);
        let (addr, level) = (ch.address(Param::Fader), ch.fader);
        self.send_to_mixer(addr, level);
        self.surface.set_channel_fader(slot, level);
        self.surface.set_ring(slot, level);
    }

    /// Move a bus send by encoder ticks
    pub fn change_bus_send(&mut self, slot: usize, bus: usize, delta: i32) {
        let current = self
            .channel(self.selection.bank, slot)
            .and_then(|ch| ch.sends())
            .and_then(|sends| sends.get(bus))
            .map(|send| send.level);
        if let Some(level) = current {
            self.set_bus_send(slot, bus, step_level(level, delta));
        }
    }

    /// Set a bus send to an absolute normalized level
    pub fn set_bus_send(&mut self, slot: usize, bus: usize, value: f32) {
        let Some(ch) = self.active_channel_mut(slot) else {
            return;
        };
        let addr = ch.address(Param::SendLevel(bus));
        let Some(send) = ch.send_mut(bus) else {
            return;
        };
        send.level = clamp_level(value);
        let (wire, level) = (send.wire_level(), send.level);
        self.send_to_mixer(addr, wire);
        self.surface.set_ring(slot, level);
    }

    /// Move a mic preamp gain by encoder ticks
    pub fn change_headamp(&mut self, slot: usize, delta: i32) {
        let Some(ch) = self.active_channel_mut(slot) else {
            return;
        };
        if !ch.is_headamp() {
            return;
        }
        ch.fader = step_level(ch.fader, delta);
        let (addr, gain) = (ch.address(Param::Gain), ch.fader);
        self.send_to_mixer(addr, gain);
        self.surface.set_channel_fader(slot, gain);
        self.surface.set_ring(slot, gain);
    }

    fn fader_level(&self, slot: usize) -> Option<f32> {
        self.channel(self.selection.bank, slot)
            .filter(|ch| !ch.is_headamp())
            .map(|ch| ch.fader)
    }

    // =========================================================================
    // Inbound reconciliation (from the mixer)
    // =========================================================================

    /// Apply a parameter value reported by the mixer
    ///
    /// Returns false when the address matches no strip parameter.
    pub fn receive(&mut self, address: &str, value: f32) -> bool {
        let Some((bank, slot)) = self.locate(address) else {
            debug!("Unmapped address {} = {}", address, value);
            return false;
        };
        let Some(param) = Param::parse_suffix(address) else {
            debug!("Unhandled parameter {} = {}", address, value);
            return false;
        };

        let selection = self.selection;
        let visible_bank = bank == selection.bank;
        let ch = &mut self.banks[bank][slot];

        match (param, ch.is_headamp()) {
            (Param::Fader, false) => {
                let level = clamp_level(value);
                let changed = ch.fader != level;
                ch.fader = level;
                trace!("{} fader = {}", ch.base_addr, level);
                if changed && visible_bank {
                    self.surface.set_channel_fader(slot, level);
                    if selection.fader_mode() {
                        self.surface.set_ring(slot, level);
                    }
                }
            }
            (Param::On, false) => {
                let on = value != 0.0;
                let changed = ch.on != on;
                ch.on = on;
                trace!("{} on = {}", ch.base_addr, on);
                if changed && visible_bank && selection.fader_mode() {
                    self.surface.set_channel_mute(slot, on);
                }
            }
            (Param::SendLevel(bus), false) => {
                let level = clamp_level(value);
                let Some(send) = ch.send_mut(bus) else {
                    debug!("Send level for strip without sends: {}", address);
                    return false;
                };
                // A silent send that is disabled locally keeps its restore level
                if !send.enabled && level == 0.0 {
                    return true;
                }
                let changed = send.level != level;
                send.level = level;
                trace!("{} send {} = {}", address, bus, level);
                if changed && visible_bank && bus == selection.bus {
                    self.surface.set_ring(slot, level);
                }
            }
            (Param::Gain, true) => {
                let gain = clamp_level(value);
                let changed = ch.fader != gain;
                ch.fader = gain;
                trace!("{} gain = {}", ch.base_addr, gain);
                if changed && visible_bank {
                    self.surface.set_channel_fader(slot, gain);
                    self.surface.set_ring(slot, gain);
                }
            }
            _ => {
                debug!("Parameter does not apply to strip: {}", address);
                return false;
            }
        }
        true
    }

    /// Find the strip owning an address, bank-major then slot-minor
    pub fn locate(&self, address: &str) -> Option<(usize, usize)> {
        self.banks.iter().enumerate().find_map(|(b, bank)| {
            bank.iter()
                .position(|ch| ch.owns(address))
                .map(|slot| (b, slot))
        })
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Show another bank on the surface
    pub fn select_bank(&mut self, bank: usize) {
        if bank >= BANK_COUNT {
            return;
        }
        self.selection.bank = bank;
        debug!("Active bank → {}", bank);
        self.refresh_surface();
    }

    /// Map the secondary function onto a bus, or back to fader/mute mode
    pub fn select_bus(&mut self, bus: usize) {
        if bus >= SLOTS_PER_BANK && !is_fader_mode(bus) {
            return;
        }
        self.selection.bus = bus;
        debug!("Active bus → {}", bus);
        self.surface.activate_bus(bus);
        self.refresh_surface();
    }

    /// Push every visible value of the active bank to the surface
    ///
    /// Slots without a mute parameter get their mute LED cleared.
    pub fn refresh_surface(&self) {
        let selection = self.selection;
        let Some(bank) = self.banks.get(selection.bank) else {
            return;
        };
        for (slot, ch) in bank.iter().enumerate() {
            self.surface.set_channel_fader(slot, ch.fader);
            if ch.is_headamp() {
                self.surface.set_ring(slot, ch.fader);
                self.surface.set_channel_mute(slot, true);
            } else if selection.fader_mode() {
                self.surface.set_ring(slot, ch.fader);
                self.surface.set_channel_mute(slot, ch.on);
            } else if let Some(send) = ch.sends().and_then(|s| s.get(selection.bus)) {
                self.surface.set_ring(slot, send.level);
                self.surface.set_channel_mute(slot, send.enabled);
            } else {
                self.surface.set_ring(slot, 0.0);
                self.surface.set_channel_mute(slot, true);
            }
        }
    }

    // =========================================================================
    // Startup replay
    // =========================================================================

    /// Value-less queries that pull the full mirrored state, in scan order
    pub fn initial_queries(&self) -> Vec<String> {
        self.banks
            .iter()
            .flat_map(|bank| bank.iter())
            .flat_map(|ch| {
                ch.queried_params()
                    .into_iter()
                    .map(move |param| ch.address(param))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::osc::OscParams;
    use crate::testing::{Push, RecordingLink, RecordingSurface};
    use rosc::OscType;
    use std::collections::HashSet;

    pub(crate) fn make_model() -> (MixerModel, Arc<RecordingLink>, Arc<RecordingSurface>) {
        let link = Arc::new(RecordingLink::default());
        let surface = Arc::new(RecordingSurface::default());
        let model = MixerModel::new(link.clone(), surface.clone());
        (model, link, surface)
    }

    fn last_sent(link: &RecordingLink) -> (String, OscParams) {
        link.sent.lock().last().cloned().unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut model, link, surface) = make_model();
        assert_eq!(model.selection(), Selection { bank: 0, bus: 8 });

        assert!(model.receive("/ch/03/mix/fader", 0.75));
        assert_eq!(model.channel(0, 2).unwrap().fader, 0.75);
        assert_eq!(surface.take(), vec![Push::Fader(2, 0.75), Push::Ring(2, 0.75)]);

        model.select_bus(1);
        surface.take();

        model.set_bus_send(1, 0, 0.3);
        assert_eq!(
            last_sent(&link),
            ("/ch/02/mix/01/level".to_string(), OscParams::One(OscType::Float(0.3)))
        );
        assert_eq!(surface.take(), vec![Push::Ring(1, 0.3)]);

        model.toggle_send_mute(1, 0);
        assert_eq!(
            last_sent(&link),
            ("/ch/02/mix/01/level".to_string(), OscParams::One(OscType::Float(0.0)))
        );
        let send = model.channel(0, 1).unwrap().sends().unwrap()[0];
        assert!(!send.enabled);
        assert_eq!(send.level, 0.3);
    }

    #[test]
    fn test_toggle_send_mute_round_trip() {
        let (mut model, link, _surface) = make_model();
        model.set_bus_send(4, 2, 0.6);
        let before = model.channel(0, 4).unwrap().sends().unwrap()[2];

        model.toggle_send_mute(4, 2);
        model.toggle_send_mute(4, 2);

        let after = model.channel(0, 4).unwrap().sends().unwrap()[2];
        assert_eq!(before, after);
        assert_eq!(
            last_sent(&link),
            ("/ch/05/mix/03/level".to_string(), OscParams::One(OscType::Float(0.6)))
        );
    }

    #[test]
    fn test_toggle_mute_writes_through() {
        let (mut model, link, surface) = make_model();
        model.toggle_mute(0);
        assert!(!model.channel(0, 0).unwrap().on);
        assert_eq!(
            last_sent(&link),
            ("/ch/01/mix/on".to_string(), OscParams::One(OscType::Int(0)))
        );
        assert_eq!(surface.take(), vec![Push::Mute(0, false)]);
    }

    #[test]
    fn test_set_then_echo_pushes_once() {
        let (mut model, _link, surface) = make_model();
        model.set_fader(3, 0.42);
        model.receive("/ch/04/mix/fader", 0.42);
        assert_eq!(model.channel(0, 3).unwrap().fader, 0.42);
        assert_eq!(surface.take(), vec![Push::Fader(3, 0.42), Push::Ring(3, 0.42)]);
    }

    #[test]
    fn test_out_of_range_mutations_are_ignored() {
        let (mut model, link, surface) = make_model();
        model.toggle_mute(8);
        model.set_fader(42, 0.5);
        model.change_bus_send(0, 10, 5);
        model.toggle_send_mute(0, 99);

        // Outputs bank has no sends
        model.select_bank(4);
        surface.take();
        model.set_bus_send(0, 0, 0.5);
        model.toggle_send_mute(0, 0);

        // Headamps have no fader, mute or send
        model.select_bank(2);
        surface.take();
        model.toggle_mute(0);
        model.set_fader(0, 0.3);

        assert!(link.sent.lock().is_empty());
        assert!(surface.take().is_empty());
    }

    #[test]
    fn test_change_headamp_targets_gain() {
        let (mut model, link, surface) = make_model();
        model.select_bank(3);
        surface.take();
        model.change_headamp(1, 50);
        assert_eq!(
            last_sent(&link),
            ("/headamp/10/gain".to_string(), OscParams::One(OscType::Float(0.25)))
        );
        assert_eq!(surface.take(), vec![Push::Fader(1, 0.25), Push::Ring(1, 0.25)]);

        // No effect outside headamp banks
        model.select_bank(0);
        let count = link.sent.lock().len();
        model.change_headamp(1, 50);
        assert_eq!(link.sent.lock().len(), count);
    }

    #[test]
    fn test_change_fader_steps_by_200_ticks() {
        let (mut model, _link, _surface) = make_model();
        model.change_fader(0, 100);
        assert!((model.channel(0, 0).unwrap().fader - 0.5).abs() < 1e-6);
        model.change_fader(0, 500);
        assert_eq!(model.channel(0, 0).unwrap().fader, 1.0);
        model.change_fader(0, -1000);
        assert_eq!(model.channel(0, 0).unwrap().fader, 0.0);
    }

    /// Every (event, bank, bus) combination against the visibility rule
    #[test]
    fn test_visibility_table() {
        let buses: Vec<usize> = (0..8).chain([8, 9]).collect();
        // (address, owning bank, slot, param bus if a send, headamp)
        let events: [(&str, usize, usize, Option<usize>, bool); 7] = [
            ("/ch/03/mix/fader", 0, 2, None, false),
            ("/ch/03/mix/on", 0, 2, None, false),
            ("/ch/11/mix/02/level", 1, 2, Some(1), false),
            ("/ch/01/mix/06/level", 0, 0, Some(5), false),
            ("/headamp/05/gain", 2, 4, None, true),
            ("/headamp/16/gain", 3, 7, None, true),
            ("/lr/mix/fader", 4, 7, None, false),
        ];

        for (address, owner, slot, send_bus, headamp) in events {
            for bank in 0..BANK_COUNT {
                for &bus in &buses {
                    let (mut model, _link, surface) = make_model();
                    model.select_bank(bank);
                    model.select_bus(bus);
                    surface.take();

                    // "on" defaults to true, so report a mute to force a change
                    let value = if address.ends_with("/on") { 0.0 } else { 0.5 };
                    model.receive(address, value);
                    let (faders, mapped): (Vec<Push>, Vec<Push>) = surface
                        .take()
                        .into_iter()
                        .partition(|p| matches!(p, Push::Fader(..)));

                    let expected = bank == owner
                        && match send_bus {
                            Some(b) => b == bus,
                            None => headamp || is_fader_mode(bus),
                        };
                    assert_eq!(
                        !mapped.is_empty(),
                        expected,
                        "{} bank={} bus={}",
                        address, bank, bus
                    );

                    // The motor fader follows the strip level in every bus mode
                    let level_event = send_bus.is_none() && !address.ends_with("/on");
                    let expected_fader = bank == owner && level_event;
                    assert_eq!(
                        faders == vec![Push::Fader(slot, 0.5)],
                        expected_fader,
                        "fader {} bank={} bus={}",
                        address, bank, bus
                    );
                    assert!(expected_fader || faders.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_address_resolution_is_unique() {
        let (model, _link, _surface) = make_model();
        let mut seen = HashSet::new();
        for (b, bank) in model.banks().iter().enumerate() {
            for (s, ch) in bank.iter().enumerate() {
                let addr = format!("{}/fader", ch.base_addr);
                assert_eq!(model.locate(&addr), Some((b, s)));
                assert!(seen.insert((b, s)));
            }
        }
        assert_eq!(model.locate("/fx/1/par/01"), None);
        assert_eq!(model.locate("/config/mute/1"), None);
    }

    #[test]
    fn test_unmapped_address_changes_nothing() {
        let (mut model, _link, surface) = make_model();
        assert!(!model.receive("/config/mute/1", 1.0));
        assert!(!model.receive("/ch/01/mix/pan", 0.2));
        assert!(!model.receive("/lr/mix/01/level", 0.2));
        assert!(surface.take().is_empty());
    }

    #[test]
    fn test_disabled_send_keeps_level_on_silent_report() {
        let (mut model, _link, _surface) = make_model();
        model.set_bus_send(0, 3, 0.8);
        model.toggle_send_mute(0, 3);
        model.receive("/ch/01/mix/04/level", 0.0);
        let send = model.channel(0, 0).unwrap().sends().unwrap()[3];
        assert_eq!(send.level, 0.8);
        assert!(!send.enabled);
    }

    #[test]
    fn test_initial_queries_are_complete_and_ordered() {
        let (model, _link, _surface) = make_model();
        let queries = model.initial_queries();

        // 16 inputs x (fader + on + 10 sends) + 16 headamps + 8 outputs x 2
        assert_eq!(queries.len(), 16 * 12 + 16 + 8 * 2);
        let unique: HashSet<&String> = queries.iter().collect();
        assert_eq!(unique.len(), queries.len());

        assert_eq!(queries[0], "/ch/01/mix/fader");
        assert_eq!(queries[1], "/ch/01/mix/on");
        assert_eq!(queries[2], "/ch/01/mix/01/level");
        assert_eq!(queries[11], "/ch/01/mix/10/level");
        assert_eq!(queries[12], "/ch/02/mix/fader");
        assert_eq!(queries[16 * 12], "/headamp/01/gain");
        assert_eq!(queries.last().unwrap(), "/lr/mix/on");
        assert_eq!(queries, model.initial_queries());
    }

    #[test]
    fn test_select_bus_refreshes_sends() {
        let (mut model, _link, surface) = make_model();
        model.receive("/ch/01/mix/03/level", 0.4);
        surface.take();

        model.select_bus(2);
        let pushes = surface.take();
        assert_eq!(pushes[0], Push::Bus(2));
        assert!(pushes.contains(&Push::Ring(0, 0.4)));
        assert!(pushes.contains(&Push::Mute(0, true)));

        // Invalid selections are ignored
        model.select_bus(12);
        model.select_bank(5);
        assert!(surface.take().is_empty());
        assert_eq!(model.selection(), Selection { bank: 0, bus: 2 });
    }

    #[test]
    fn test_refresh_clears_mute_led_without_mute_parameter() {
        let (mut model, _link, surface) = make_model();
        model.toggle_mute(0);
        surface.take();

        model.select_bank(2);
        let pushes = surface.take();
        for slot in 0..SLOTS_PER_BANK {
            assert!(pushes.contains(&Push::Mute(slot, true)), "slot {}", slot);
        }

        // Outputs have no sends, so a bus selection leaves nothing to light
        model.select_bank(4);
        model.select_bus(3);
        let pushes = surface.take();
        assert!(pushes.contains(&Push::Mute(0, true)));
        assert!(pushes.contains(&Push::Ring(0, 0.0)));
    }

    #[test]
    fn test_motor_fader_follows_level_changes() {
        let (mut model, _link, surface) = make_model();
        model.change_fader(0, 100);
        assert_eq!(surface.take(), vec![Push::Fader(0, 0.5), Push::Ring(0, 0.5)]);

        model.receive("/ch/02/mix/fader", 0.6);
        assert_eq!(surface.take(), vec![Push::Fader(1, 0.6), Push::Ring(1, 0.6)]);

        // In bus mode the ring shows the send, the fader still tracks the strip
        model.select_bus(0);
        surface.take();
        model.receive("/ch/02/mix/fader", 0.2);
        assert_eq!(surface.take(), vec![Push::Fader(1, 0.2)]);

        // Other banks stay silent
        model.receive("/ch/12/mix/fader", 0.3);
        assert!(surface.take().is_empty());
    }

    mod clamp_law {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn levels_stay_normalized(deltas in proptest::collection::vec(-400i32..400, 1..64)) {
                let (mut model, _link, _surface) = make_model();
                for delta in deltas {
                    model.change_fader(0, delta);
                    model.change_bus_send(0, 1, delta);
                    let ch = model.channel(0, 0).unwrap();
                    prop_assert!((0.0..=1.0).contains(&ch.fader));
                    let send = ch.sends().unwrap()[1];
                    prop_assert!((0.0..=1.0).contains(&send.level));
                }
            }
        }
    }
}
