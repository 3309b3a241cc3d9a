//! Decodes incoming bytes into `MidiMessage`s and forwards them to the UI.

use anyhow::{Result, anyhow};
use eframe::egui;
use midir::{Ignore, MidiInput, MidiInputConnection};
use std::sync::mpsc::Sender;

use crate::message::{self, MidiMessage};

/// An open subscription to one input port. Dropping it detaches the
/// callback, so selection changes and teardown can never leak a listener.
pub struct MidiListener {
    port_name: String,
    _conn: MidiInputConnection<()>, // RAII – stays alive
}

impl MidiListener {
    /// Connects to the port with the given backend id. The callback runs on
    /// the backend's thread: it decodes, forwards over `tx`, and wakes the
    /// UI so the new event renders promptly.
    pub fn connect(device_id: &str, tx: Sender<MidiMessage>, ctx: egui::Context) -> Result<Self> {
        let mut midi_in = MidiInput::new("midi-monitor")?;
        midi_in.ignore(Ignore::None);

        let port = midi_in
            .ports()
            .into_iter()
            .find(|port| port.id() == device_id)
            .ok_or_else(|| anyhow!("port {device_id} is no longer available"))?;
        let name = midi_in.port_name(&port)?;

        let cb_name = name.clone();
        let conn = midi_in
            .connect(
                &port,
                "midi-monitor-in",
                move |stamp, bytes, _| {
                    if let Some(msg) = message::decode(bytes, stamp, &cb_name) {
                        tx.send(msg).ok();
                        ctx.request_repaint();
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("connect {name}: {e}"))?;

        log::info!("🎹 Connected to {name}");
        Ok(Self {
            port_name: name,
            _conn: conn,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
