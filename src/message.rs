//! Decodes raw MIDI channel-voice bytes into structured events.

use serde::Serialize;
use std::fmt;

/// Message categories this monitor distinguishes. Everything outside the
/// channel-voice subset (SysEx, realtime, aftertouch…) lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageType {
    #[serde(rename = "Note On")]
    NoteOn,
    #[serde(rename = "Note Off")]
    NoteOff,
    #[serde(rename = "Control Change")]
    ControlChange,
    #[serde(rename = "Program Change")]
    ProgramChange,
    #[serde(rename = "Pitch Bend")]
    PitchBend,
    Unknown,
}

impl MessageType {
    /// The types the log can be filtered by, in display order.
    pub const FILTERABLE: [MessageType; 5] = [
        MessageType::NoteOn,
        MessageType::NoteOff,
        MessageType::ControlChange,
        MessageType::ProgramChange,
        MessageType::PitchBend,
    ];
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::NoteOn => "Note On",
            MessageType::NoteOff => "Note Off",
            MessageType::ControlChange => "Control Change",
            MessageType::ProgramChange => "Program Change",
            MessageType::PitchBend => "Pitch Bend",
            MessageType::Unknown => "Unknown",
        };
        f.pad(name)
    }
}

/// One decoded event. Immutable once built; only the fields relevant to
/// `kind` are populated, the rest stay `None` and are omitted from export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MidiMessage {
    /// Microseconds since the connection opened, as reported by the backend.
    pub timestamp: u64,
    pub port: String,
    /// 1-based channel from the status byte's low nibble.
    pub channel: u8,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(rename = "rawData")]
    pub raw: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<u8>,
}

impl MidiMessage {
    /// Human-readable summary of the populated fields, for the log panel.
    pub fn details(&self) -> String {
        let mut out = format!("Ch {:>2}", self.channel);
        if let Some(n) = self.note {
            out.push_str(&format!("  {} ({n})", note_name(n)));
        }
        if let Some(v) = self.velocity {
            out.push_str(&format!("  vel {v}"));
        }
        if let Some(c) = self.controller {
            out.push_str(&format!("  cc {c}"));
        }
        if let Some(v) = self.value {
            out.push_str(&format!("  val {v}"));
        }
        if let Some(p) = self.program {
            out.push_str(&format!("  prog {p}"));
        }
        out
    }
}

/// Decodes one raw message. Returns `None` only for an empty slice; any
/// other input yields an event, falling back to `Unknown` with no optional
/// fields when the status byte isn't a channel-voice type we handle.
///
/// Short messages never fail: fields whose data bytes are missing stay
/// unset. A 0x90 with velocity 0 (or no velocity byte at all) is normalized
/// to Note Off, so consumers never see a silent Note On.
pub fn decode(bytes: &[u8], timestamp: u64, port: &str) -> Option<MidiMessage> {
    let (&status, data) = bytes.split_first()?;
    let data1 = data.first().copied();
    let data2 = data.get(1).copied();

    let mut msg = MidiMessage {
        timestamp,
        port: port.to_owned(),
        channel: (status & 0x0F) + 1,
        kind: MessageType::Unknown,
        raw: bytes.to_vec(),
        note: None,
        velocity: None,
        controller: None,
        value: None,
        program: None,
    };

    match status & 0xF0 {
        0x80 => {
            msg.kind = MessageType::NoteOff;
            msg.note = data1;
            msg.velocity = data2;
        }
        0x90 => {
            msg.kind = if data2.unwrap_or(0) > 0 {
                MessageType::NoteOn
            } else {
                MessageType::NoteOff
            };
            msg.note = data1;
            msg.velocity = data2;
        }
        0xB0 => {
            msg.kind = MessageType::ControlChange;
            msg.controller = data1;
            msg.value = data2.map(u16::from);
        }
        0xC0 => {
            msg.kind = MessageType::ProgramChange;
            msg.program = data1;
        }
        0xE0 => {
            msg.kind = MessageType::PitchBend;
            // 14-bit value, data2 is the coarse half
            msg.value = match (data1, data2) {
                (Some(lo), Some(hi)) => Some((u16::from(hi) << 7) | u16::from(lo)),
                _ => None,
            };
        }
        _ => {}
    }

    Some(msg)
}

// ─────────────────── helpers ─────────────────────────────────────────────────

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note number → scientific pitch name, middle C (60) being C4.
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

/// Whether a note number falls on a black key.
pub fn is_black_key(note: u8) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(bytes: &[u8]) -> MidiMessage {
        decode(bytes, 0, "test").unwrap()
    }

    #[test]
    fn note_on_with_zero_velocity_is_note_off() {
        for ch in 0..16u8 {
            let msg = ev(&[0x90 | ch, 60, 0]);
            assert_eq!(msg.kind, MessageType::NoteOff);
            assert_eq!(msg.note, Some(60));
            assert_eq!(msg.velocity, Some(0));
        }
    }

    #[test]
    fn channel_comes_from_the_low_nibble() {
        for status in 0x00..=0xFFu8 {
            let msg = ev(&[status, 0, 0]);
            assert_eq!(msg.channel, (status & 0x0F) + 1);
            assert!((1..=16).contains(&msg.channel));
        }
    }

    #[test]
    fn pitch_bend_reassembles_fourteen_bits() {
        assert_eq!(ev(&[0xE0, 0, 0]).value, Some(0));
        assert_eq!(ev(&[0xE0, 0, 64]).value, Some(8192)); // center
        assert_eq!(ev(&[0xE3, 127, 127]).value, Some(16383));
        assert_eq!(ev(&[0xE0, 0x23, 0x51]).value, Some((0x51 << 7) | 0x23));
    }

    #[test]
    fn note_on_scenario() {
        let msg = ev(&[0x91, 60, 100]);
        assert_eq!(msg.channel, 2);
        assert_eq!(msg.kind, MessageType::NoteOn);
        assert_eq!(msg.note, Some(60));
        assert_eq!(msg.velocity, Some(100));
        assert_eq!(msg.controller, None);
        assert_eq!(msg.program, None);
    }

    #[test]
    fn program_change_uses_one_data_byte() {
        let msg = ev(&[0xC5, 42, 99]); // trailing byte ignored
        assert_eq!(msg.channel, 6);
        assert_eq!(msg.kind, MessageType::ProgramChange);
        assert_eq!(msg.program, Some(42));
        assert_eq!(msg.note, None);
        assert_eq!(msg.value, None);
    }

    #[test]
    fn short_messages_leave_fields_unset() {
        let msg = ev(&[0x80, 60]);
        assert_eq!(msg.kind, MessageType::NoteOff);
        assert_eq!(msg.note, Some(60));
        assert_eq!(msg.velocity, None);

        let msg = ev(&[0xB0]);
        assert_eq!(msg.kind, MessageType::ControlChange);
        assert_eq!(msg.controller, None);
        assert_eq!(msg.value, None);

        // pitch bend can't be reassembled from half its bits
        let msg = ev(&[0xE0, 1]);
        assert_eq!(msg.kind, MessageType::PitchBend);
        assert_eq!(msg.value, None);

        assert_eq!(decode(&[], 0, "test"), None);
    }

    #[test]
    fn unhandled_statuses_decode_as_unknown() {
        for bytes in [&[0xF8][..], &[0xA0, 1, 2][..], &[0xD3, 9][..]] {
            let msg = ev(bytes);
            assert_eq!(msg.kind, MessageType::Unknown);
            assert_eq!(msg.note, None);
            assert_eq!(msg.velocity, None);
            assert_eq!(msg.controller, None);
            assert_eq!(msg.value, None);
            assert_eq!(msg.program, None);
            assert_eq!(msg.raw, bytes);
        }
    }

    #[test]
    fn export_shape_matches_the_event() {
        let json = serde_json::to_value(ev(&[0x91, 60, 100])).unwrap();
        assert_eq!(json["type"], "Note On");
        assert_eq!(json["channel"], 2);
        assert_eq!(json["rawData"], serde_json::json!([0x91, 60, 100]));
        assert_eq!(json["note"], 60);
        assert_eq!(json["velocity"], 100);
        // absent optionals are omitted entirely
        assert!(json.get("controller").is_none());
        assert!(json.get("value").is_none());
        assert!(json.get("program").is_none());
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
        assert!(is_black_key(61));
        assert!(!is_black_key(60));
    }
}
