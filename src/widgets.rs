//! Painter-based pieces of the visualizer and the log rows.

use eframe::egui::{self, Align2, Color32, FontId, Rect, RichText, Sense, Stroke, pos2, vec2};

use crate::message::{MessageType, MidiMessage, is_black_key};

// Green/purple for sounding notes, blue for controller values.
const NOTE_ACTIVE: Color32 = Color32::from_rgb(74, 222, 128);
const NOTE_ACTIVE_SOFT: Color32 = Color32::from_rgb(134, 239, 172);
const NOTE_ACTIVE_BLACK: Color32 = Color32::from_rgb(192, 132, 252);
const VALUE_FILL: Color32 = Color32::from_rgb(96, 165, 250);

pub fn kind_color(kind: MessageType) -> Color32 {
    match kind {
        MessageType::NoteOn => NOTE_ACTIVE,
        MessageType::NoteOff => Color32::from_rgb(248, 113, 113),
        MessageType::ControlChange => VALUE_FILL,
        MessageType::ProgramChange => NOTE_ACTIVE_BLACK,
        MessageType::PitchBend => Color32::from_rgb(250, 204, 21),
        MessageType::Unknown => Color32::from_gray(150),
    }
}

/// One monospace log line: time, colored type tag, decoded fields, port,
/// raw bytes.
pub fn log_row(ui: &mut egui::Ui, msg: &MidiMessage) {
    let hex: Vec<String> = msg.raw.iter().map(|b| format!("{b:02X}")).collect();
    ui.horizontal(|ui| {
        ui.monospace(format!("{:>11.6}", msg.timestamp as f64 / 1e6));
        ui.label(
            RichText::new(format!("{:<14}", msg.kind))
                .monospace()
                .color(kind_color(msg.kind)),
        );
        ui.monospace(format!("{:<28}", msg.details()));
        ui.label(RichText::new(format!("({})", msg.port)).monospace().weak());
        ui.label(
            RichText::new(format!("[{}]", hex.join(" ")))
                .monospace()
                .weak(),
        );
    });
}

/// A controller cell: vertical value bar with the number underneath.
pub fn cc_cell(ui: &mut egui::Ui, controller: u8, value: u8) {
    let (rect, _) = ui.allocate_exact_size(vec2(48.0, 76.0), Sense::hover());
    let painter = ui.painter();

    let bar = Rect::from_min_max(rect.min, pos2(rect.max.x, rect.max.y - 16.0));
    painter.rect_filled(bar, 3.0, Color32::from_gray(40));

    let frac = f32::from(value) / 127.0;
    let fill = Rect::from_min_max(pos2(bar.left(), bar.bottom() - bar.height() * frac), bar.max);
    painter.rect_filled(fill, 3.0, VALUE_FILL);

    painter.text(
        bar.center(),
        Align2::CENTER_CENTER,
        value.to_string(),
        FontId::proportional(12.0),
        Color32::WHITE,
    );
    painter.text(
        pos2(rect.center().x, rect.max.y - 7.0),
        Align2::CENTER_CENTER,
        format!("CC{controller}"),
        FontId::proportional(10.0),
        Color32::from_gray(160),
    );
}

// One-octave key geometry: 32 px white keys, black keys overlaid at fixed
// offsets.
const WHITE_OFFSETS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const BLACK_OFFSETS: [u8; 5] = [1, 3, 6, 8, 10];
const BLACK_X: [f32; 5] = [20.0, 52.0, 116.0, 148.0, 180.0];
const KEY_WIDTH: f32 = 32.0;
const KEY_HEIGHT: f32 = 80.0;

/// One piano octave, C4–B4, keys lit while sounding.
pub fn keyboard_octave(ui: &mut egui::Ui, notes: &[bool; 128]) {
    let (rect, _) = ui.allocate_exact_size(vec2(7.0 * KEY_WIDTH, KEY_HEIGHT), Sense::hover());
    let painter = ui.painter();

    for (i, offset) in WHITE_OFFSETS.iter().enumerate() {
        let sounding = notes[usize::from(60 + offset)];
        let key = Rect::from_min_size(
            pos2(rect.left() + i as f32 * KEY_WIDTH, rect.top()),
            vec2(KEY_WIDTH - 2.0, KEY_HEIGHT),
        );
        let color = if sounding { NOTE_ACTIVE } else { Color32::WHITE };
        painter.rect_filled(key, 2.0, color);
        painter.rect_stroke(key, 2.0, Stroke::new(1.0, Color32::from_gray(90)));
    }

    for (i, offset) in BLACK_OFFSETS.iter().enumerate() {
        let sounding = notes[usize::from(60 + offset)];
        let key = Rect::from_min_size(
            pos2(rect.left() + BLACK_X[i], rect.top()),
            vec2(20.0, KEY_HEIGHT * 0.6),
        );
        let color = if sounding {
            NOTE_ACTIVE_SOFT
        } else {
            Color32::from_gray(25)
        };
        painter.rect_filled(key, 2.0, color);
    }
}

/// All 128 note states as a 16-wide grid, black keys tinted darker.
pub fn note_grid(ui: &mut egui::Ui, notes: &[bool; 128]) {
    const CELL: f32 = 14.0;
    const GAP: f32 = 2.0;

    let (rect, _) =
        ui.allocate_exact_size(vec2(16.0 * (CELL + GAP), 8.0 * (CELL + GAP)), Sense::hover());
    let painter = ui.painter();

    for note in 0..128usize {
        let (row, col) = (note / 16, note % 16);
        let min = pos2(
            rect.left() + col as f32 * (CELL + GAP),
            rect.top() + row as f32 * (CELL + GAP),
        );
        let color = match (notes[note], is_black_key(note as u8)) {
            (true, true) => NOTE_ACTIVE_BLACK,
            (true, false) => NOTE_ACTIVE,
            (false, true) => Color32::from_gray(45),
            (false, false) => Color32::from_gray(70),
        };
        painter.rect_filled(Rect::from_min_size(min, vec2(CELL, CELL)), 2.0, color);
    }
}
