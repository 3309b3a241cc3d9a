//! Input-port enumeration.

use anyhow::Result;
use midir::MidiInput;

/// One available MIDI input, as shown in the device selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Stable backend identifier, used to reconnect across rescans.
    pub id: String,
    pub name: String,
}

/// Lists the currently available input ports. A fresh `MidiInput` is created
/// per call so hot-plugged devices show up on the next scan.
pub fn enumerate() -> Result<Vec<DeviceInfo>> {
    let midi_in = MidiInput::new("midi-monitor-scan")?;
    let devices = midi_in
        .ports()
        .iter()
        .map(|port| DeviceInfo {
            id: port.id(),
            name: midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown Device".to_string()),
        })
        .collect();
    Ok(devices)
}
