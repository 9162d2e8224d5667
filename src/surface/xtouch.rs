//! Behringer X-Touch surface in Mackie-Control mode
//!
//! Handles MIDI communication with the X-Touch. The output connection lives
//! on a dedicated thread fed by a channel, so indicator pushes from the
//! mixer actor never block on hardware I/O. Input arrives on the midir
//! callback thread and is translated to [`SurfaceInput`] events.

use std::time::Duration;

use async_trait::async_trait;
use midir::{MidiIO, MidiInput, MidiInputConnection, MidiOutput};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::midi::{convert, format_hex, MidiMessage};
use super::ControlSurface;
use crate::config::SurfaceConfig;
use crate::error::{Result, XairError};
use crate::mixer::{is_fader_mode, MixerHandle, SurfaceInput, DEFAULT_BUS, SLOTS_PER_BANK};

const CLIENT_NAME: &str = "xair-remote";

// Mackie-Control note and CC layout
const VPOT_ROTATE_CC: u8 = 16;
const VPOT_RING_CC: u8 = 48;
const VPOT_PRESS_NOTE: u8 = 32;
const MUTE_NOTE: u8 = 16;
const BANK_LEFT_NOTE: u8 = 46;
const BANK_RIGHT_NOTE: u8 = 47;
const FLIP_NOTE: u8 = 50;
const F1_NOTE: u8 = 54;

const LED_ON: u8 = 127;
const LED_OFF: u8 = 0;

/// Keeps the MIDI input callback alive; dropping it closes the port
pub struct XTouchInput {
    _conn: MidiInputConnection<()>,
    port_name: String,
}

impl XTouchInput {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

pub struct XTouchSurface {
    name: String,
    out_tx: mpsc::UnboundedSender<MidiMessage>,
    input_pattern: String,
    monitor_interval: Duration,
}

impl XTouchSurface {
    /// Open the configured input and output ports
    ///
    /// Returns the surface, the input connection guard and the stream of
    /// translated gestures (see [`forward_input`]).
    pub async fn connect(
        config: &SurfaceConfig,
    ) -> Result<(Self, XTouchInput, mpsc::UnboundedReceiver<SurfaceInput>)> {
        info!(
            "Connecting to X-Touch - Input: '{}', Output: '{}'",
            config.input_port, config.output_port
        );

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let input = open_input(&config.input_port, input_tx)?;
        let (out_tx, port_name) = spawn_output(&config.output_port).await?;

        info!(
            "✅ X-Touch connected (in: {}, out: {})",
            input.port_name, port_name
        );

        let surface = Self {
            name: port_name,
            out_tx,
            input_pattern: config.input_port.clone(),
            monitor_interval: config.monitor_interval(),
        };
        Ok((surface, input, input_rx))
    }

    fn send(&self, message: MidiMessage) {
        if self.out_tx.send(message).is_err() {
            warn!("⚠️  X-Touch output closed, dropping indicator update");
        }
    }
}

#[async_trait]
impl ControlSurface for XTouchSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_channel_fader(&self, slot: usize, value: f32) {
        if let Some(msg) = fader_message(slot, value) {
            self.send(msg);
        }
    }

    fn set_channel_mute(&self, slot: usize, on: bool) {
        if let Some(msg) = mute_led_message(slot, on) {
            self.send(msg);
        }
    }

    fn set_ring(&self, slot: usize, value: f32) {
        if let Some(msg) = ring_message(slot, value) {
            self.send(msg);
        }
    }

    fn activate_bus(&self, bus: usize) {
        for msg in bus_led_messages(bus) {
            self.send(msg);
        }
    }

    async fn monitor_ports(&self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "👀 Watching for X-Touch input port '{}' every {:?}",
            self.input_pattern, self.monitor_interval
        );
        let mut ticker = tokio::time::interval(self.monitor_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    if !input_port_present(&self.input_pattern) {
                        error!("❌ X-Touch input port '{}' disappeared, shutting down", self.input_pattern);
                        shutdown.cancel();
                        return Err(XairError::Surface(format!(
                            "input port '{}' disappeared",
                            self.input_pattern
                        )));
                    }
                }
            }
        }
    }
}

/// Forward translated gestures to the mixer until the input closes
pub async fn forward_input(mut rx: mpsc::UnboundedReceiver<SurfaceInput>, mixer: MixerHandle) {
    while let Some(input) = rx.recv().await {
        trace!(?input, "Surface input");
        mixer.input(input);
    }
    debug!("X-Touch input stream closed");
}

/// Find a port by case-insensitive substring match
fn find_port<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if name.to_lowercase().contains(&pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

fn input_port_present(pattern: &str) -> bool {
    match MidiInput::new(&format!("{}-monitor", CLIENT_NAME)) {
        Ok(midi_in) => find_port(&midi_in, pattern).is_some(),
        Err(e) => {
            warn!("⚠️  Cannot list MIDI ports: {}", e);
            // A transient backend failure is not a disconnect
            true
        }
    }
}

fn open_input(pattern: &str, tx: mpsc::UnboundedSender<SurfaceInput>) -> Result<XTouchInput> {
    let midi_in = MidiInput::new(&format!("{}-input", CLIENT_NAME))
        .map_err(|e| XairError::Surface(format!("Failed to create MIDI input: {}", e)))?;

    let (port, port_name) = find_port(&midi_in, pattern)
        .ok_or_else(|| XairError::Surface(format!("Input port '{}' not found", pattern)))?;

    let conn = midi_in
        .connect(
            &port,
            CLIENT_NAME,
            move |_timestamp, data, _| match MidiMessage::parse(data) {
                Some(message) => {
                    if let Some(input) = map_input(&message) {
                        let _ = tx.send(input);
                    }
                }
                None => trace!("Ignoring MIDI: {}", format_hex(data)),
            },
            (),
        )
        .map_err(|e| XairError::Surface(format!("Failed to connect to input port: {}", e)))?;

    Ok(XTouchInput {
        _conn: conn,
        port_name,
    })
}

/// Open the output port on its own thread and return its feed
async fn spawn_output(pattern: &str) -> Result<(mpsc::UnboundedSender<MidiMessage>, String)> {
    let (tx, mut rx) = mpsc::unbounded_channel::<MidiMessage>();
    let (ready_tx, ready_rx) = oneshot::channel::<Result<String>>();
    let pattern = pattern.to_string();

    std::thread::Builder::new()
        .name("xtouch-out".to_string())
        .spawn(move || {
            let opened = MidiOutput::new(&format!("{}-output", CLIENT_NAME))
                .map_err(|e| XairError::Surface(format!("Failed to create MIDI output: {}", e)))
                .and_then(|midi_out| {
                    let (port, name) = find_port(&midi_out, &pattern).ok_or_else(|| {
                        XairError::Surface(format!("Output port '{}' not found", pattern))
                    })?;
                    let conn = midi_out.connect(&port, CLIENT_NAME).map_err(|e| {
                        XairError::Surface(format!("Failed to connect to output port: {}", e))
                    })?;
                    Ok((conn, name))
                });

            let mut conn = match opened {
                Ok((conn, name)) => {
                    let _ = ready_tx.send(Ok(name));
                    conn
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while let Some(message) = rx.blocking_recv() {
                let data = message.encode();
                match conn.send(&data) {
                    Ok(()) => trace!("Sent: {} | {}", format_hex(&data), message),
                    Err(e) => warn!("⚠️  Failed to send MIDI {}: {}", message, e),
                }
            }
            debug!("X-Touch output thread finished");
        })?;

    let name = ready_rx
        .await
        .map_err(|_| XairError::Surface("MIDI output thread exited".to_string()))??;
    Ok((tx, name))
}

// =============================================================================
// Mackie-Control mapping
// =============================================================================

/// Translate a surface message into a gesture; releases are ignored
pub fn map_input(message: &MidiMessage) -> Option<SurfaceInput> {
    let slots = SLOTS_PER_BANK as u8;
    match *message {
        MidiMessage::ControlChange { cc, value, .. }
            if (VPOT_ROTATE_CC..VPOT_ROTATE_CC + slots).contains(&cc) =>
        {
            let delta = convert::relative_ticks(value);
            (delta != 0).then_some(SurfaceInput::Rotate {
                slot: (cc - VPOT_ROTATE_CC) as usize,
                delta,
            })
        }
        MidiMessage::NoteOn { note, .. } => match note {
            n if (VPOT_PRESS_NOTE..VPOT_PRESS_NOTE + slots).contains(&n) => {
                Some(SurfaceInput::Press {
                    slot: (n - VPOT_PRESS_NOTE) as usize,
                })
            }
            n if (MUTE_NOTE..MUTE_NOTE + slots).contains(&n) => Some(SurfaceInput::Button {
                slot: (n - MUTE_NOTE) as usize,
            }),
            n if (F1_NOTE..F1_NOTE + slots).contains(&n) => Some(SurfaceInput::SelectBus {
                bus: (n - F1_NOTE) as usize,
            }),
            BANK_LEFT_NOTE => Some(SurfaceInput::BankPrev),
            BANK_RIGHT_NOTE => Some(SurfaceInput::BankNext),
            FLIP_NOTE => Some(SurfaceInput::SelectBus { bus: DEFAULT_BUS }),
            _ => None,
        },
        _ => None,
    }
}

fn slot_offset(slot: usize) -> Option<u8> {
    (slot < SLOTS_PER_BANK).then_some(slot as u8)
}

fn led(note: u8, lit: bool) -> MidiMessage {
    MidiMessage::NoteOn {
        channel: 0,
        note,
        velocity: if lit { LED_ON } else { LED_OFF },
    }
}

pub fn fader_message(slot: usize, value: f32) -> Option<MidiMessage> {
    Some(MidiMessage::PitchBend {
        channel: slot_offset(slot)?,
        value: convert::level_to_pitch_bend(value),
    })
}

/// The mute LED is lit while the strip is silenced
pub fn mute_led_message(slot: usize, on: bool) -> Option<MidiMessage> {
    Some(led(MUTE_NOTE + slot_offset(slot)?, !on))
}

pub fn ring_message(slot: usize, value: f32) -> Option<MidiMessage> {
    Some(MidiMessage::ControlChange {
        channel: 0,
        cc: VPOT_RING_CC + slot_offset(slot)?,
        value: convert::level_to_ring(value),
    })
}

/// F1-F8 show the selected send bus, Flip shows fader mode
pub fn bus_led_messages(bus: usize) -> Vec<MidiMessage> {
    let mut messages: Vec<MidiMessage> = (0..SLOTS_PER_BANK)
        .map(|b| led(F1_NOTE + b as u8, b == bus))
        .collect();
    messages.push(led(FLIP_NOTE, is_fader_mode(bus)));
    messages
}
