//! Session state: the event log and the aggregate tables derived from it.
//!
//! Single writer (the frame-start drain), read-only everywhere else. The
//! decoder stays pure; every aggregate mutation happens here in `apply`.

use anyhow::Result;

use crate::message::{MessageType, MidiMessage};

/// Retained log size; past this the oldest chunk is dropped.
const LOG_CAPACITY: usize = 10_000;
const LOG_TRIM: usize = 1_000;

/// Optional criteria for the visible log subset. Unset criteria match
/// everything; set criteria must all hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub channel: Option<u8>,
    pub kind: Option<MessageType>,
}

impl LogFilter {
    pub fn matches(&self, msg: &MidiMessage) -> bool {
        self.channel.is_none_or(|c| msg.channel == c)
            && self.kind.is_none_or(|k| msg.kind == k)
    }
}

pub struct Session {
    log: Vec<MidiMessage>,
    /// Last received value per controller number; unset until first receipt.
    cc_values: [Option<u8>; 128],
    /// Whether each note is currently sounding.
    note_states: [bool; 128],
}

impl Default for Session {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            cc_values: [None; 128],
            note_states: [false; 128],
        }
    }
}

impl Session {
    /// Appends an event, updating the aggregate tables first.
    pub fn push(&mut self, msg: MidiMessage) {
        self.apply(&msg);
        self.log.push(msg);
        if self.log.len() > LOG_CAPACITY {
            self.log.drain(..LOG_TRIM);
        }
    }

    fn apply(&mut self, msg: &MidiMessage) {
        match msg.kind {
            MessageType::NoteOn => self.set_note(msg.note, true),
            MessageType::NoteOff => self.set_note(msg.note, false),
            MessageType::ControlChange => {
                // Skip the update when either byte was missing or malformed
                // rather than writing out of range.
                if let (Some(c), Some(v)) = (msg.controller, msg.value) {
                    if let Some(slot) = self.cc_values.get_mut(c as usize) {
                        *slot = Some(v.min(127) as u8);
                    }
                }
            }
            _ => {}
        }
    }

    fn set_note(&mut self, note: Option<u8>, sounding: bool) {
        if let Some(slot) = note.and_then(|n| self.note_states.get_mut(n as usize)) {
            *slot = sounding;
        }
    }

    /// Empties the log and both aggregate tables.
    pub fn clear(&mut self) {
        self.log.clear();
        self.reset_tables();
    }

    /// Resets the aggregate tables only; the log survives. Used when the
    /// monitored device changes.
    pub fn reset_tables(&mut self) {
        self.cc_values = [None; 128];
        self.note_states = [false; 128];
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// The visible subset under `filter`, in log order. Non-destructive and
    /// re-evaluated per call.
    pub fn filtered(&self, filter: LogFilter) -> impl Iterator<Item = &MidiMessage> {
        self.log.iter().filter(move |msg| filter.matches(msg))
    }

    pub fn note_states(&self) -> &[bool; 128] {
        &self.note_states
    }

    /// Controllers seen so far with their last values, by controller number.
    pub fn observed_controllers(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.cc_values
            .iter()
            .enumerate()
            .filter_map(|(cc, value)| value.map(|v| (cc as u8, v)))
    }

    /// Serializes the retained log for download.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.log)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::decode;

    fn ev(bytes: &[u8]) -> MidiMessage {
        decode(bytes, 0, "test").unwrap()
    }

    #[test]
    fn note_scenario_updates_note_state() {
        let mut session = Session::default();

        session.push(ev(&[0x91, 60, 100]));
        assert_eq!(session.log[0].kind, MessageType::NoteOn);
        assert!(session.note_states()[60]);

        session.push(ev(&[0x91, 60, 0]));
        assert_eq!(session.log[1].kind, MessageType::NoteOff);
        assert!(!session.note_states()[60]);
    }

    #[test]
    fn control_change_scenario_updates_table() {
        let mut session = Session::default();
        session.push(ev(&[0xB0, 7, 127]));

        let msg = &session.log[0];
        assert_eq!(msg.channel, 1);
        assert_eq!(msg.kind, MessageType::ControlChange);
        assert_eq!(msg.controller, Some(7));
        assert_eq!(msg.value, Some(127));
        assert_eq!(session.cc_values[7], Some(127));
    }

    #[test]
    fn repeated_control_change_is_idempotent() {
        let mut session = Session::default();
        session.push(ev(&[0xB0, 7, 99]));
        let after_first = session.cc_values;
        session.push(ev(&[0xB0, 7, 99]));
        assert_eq!(session.cc_values, after_first);
    }

    #[test]
    fn unknown_and_short_messages_touch_no_tables() {
        let mut session = Session::default();
        session.push(ev(&[0xF8]));
        session.push(ev(&[0xE0, 1, 2]));
        session.push(ev(&[0xB0])); // CC with no data bytes
        assert_eq!(session.len(), 3);
        assert!(session.observed_controllers().next().is_none());
        assert!(session.note_states().iter().all(|sounding| !sounding));
    }

    #[test]
    fn sequential_filters_equal_simultaneous_filtering() {
        let mut session = Session::default();
        for ch in 0..4u8 {
            session.push(ev(&[0x90 | ch, 60 + ch, 100]));
            session.push(ev(&[0x80 | ch, 60 + ch, 0]));
            session.push(ev(&[0xB0 | ch, 1, ch]));
        }

        let by_channel = LogFilter {
            channel: Some(2),
            ..Default::default()
        };
        let by_kind = LogFilter {
            kind: Some(MessageType::ControlChange),
            ..Default::default()
        };
        let both = LogFilter {
            channel: Some(2),
            kind: Some(MessageType::ControlChange),
        };

        let sequential: Vec<&MidiMessage> = session
            .filtered(by_channel)
            .filter(|msg| by_kind.matches(msg))
            .collect();
        let simultaneous: Vec<&MidiMessage> = session.filtered(both).collect();
        assert_eq!(sequential, simultaneous);
        assert_eq!(simultaneous.len(), 1);
    }

    #[test]
    fn unset_filter_matches_everything() {
        let mut session = Session::default();
        session.push(ev(&[0x91, 60, 100]));
        session.push(ev(&[0xF8]));
        assert_eq!(session.filtered(LogFilter::default()).count(), session.len());
    }

    #[test]
    fn clear_resets_all_three() {
        let mut session = Session::default();
        session.push(ev(&[0x91, 60, 100]));
        session.push(ev(&[0xB0, 7, 64]));
        session.clear();

        assert!(session.is_empty());
        assert!(session.observed_controllers().next().is_none());
        assert!(session.note_states().iter().all(|sounding| !sounding));
    }

    #[test]
    fn table_reset_keeps_the_log() {
        let mut session = Session::default();
        session.push(ev(&[0x91, 60, 100]));
        session.reset_tables();

        assert_eq!(session.len(), 1);
        assert!(!session.note_states()[60]);
    }

    #[test]
    fn log_is_capped_in_chunks() {
        let mut session = Session::default();
        for i in 0..=LOG_CAPACITY {
            let mut msg = ev(&[0xB0, 7, 1]);
            msg.timestamp = i as u64;
            session.push(msg);
        }

        // One over capacity drops one leading chunk, preserving order.
        assert_eq!(session.len(), LOG_CAPACITY - LOG_TRIM + 1);
        assert_eq!(session.log.first().unwrap().timestamp, LOG_TRIM as u64);
        assert_eq!(session.log.last().unwrap().timestamp, LOG_CAPACITY as u64);
    }

    #[test]
    fn export_round_trips_the_log() {
        let mut session = Session::default();
        session.push(ev(&[0x91, 60, 100]));
        session.push(ev(&[0xB0, 7, 127]));

        let json = session.export_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["type"], "Note On");
        assert_eq!(entries[1]["controller"], 7);
    }
}
