//! The monitor window: device selection, filters, live log, visualizer.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use chrono::Local;
use eframe::egui::{self, Color32, RichText};

use crate::devices::{self, DeviceInfo};
use crate::message::{MessageType, MidiMessage};
use crate::midi::MidiListener;
use crate::session::{LogFilter, Session};
use crate::widgets;

/// How often the port list is re-scanned for hot-plugged devices.
const SCAN_INTERVAL: Duration = Duration::from_secs(2);

const IDLE_STATUS: &str = "Select a device to start monitoring";

pub struct MonitorApp {
    devices: Vec<DeviceInfo>,
    /// Device the user wants monitored (by backend id).
    selected: Option<String>,
    /// Device the current listener is attached to. Reconciled against
    /// `selected` once per frame so detach always precedes attach.
    attached: Option<String>,
    listener: Option<MidiListener>,
    tx: Sender<MidiMessage>,
    rx: Receiver<MidiMessage>,
    session: Session,
    filter: LogFilter,
    status: String,
    last_scan: Instant,
    /// Set when the backend couldn't be initialized at startup; terminal.
    init_error: Option<String>,
}

impl MonitorApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, initial_port: Option<String>) -> Self {
        let (tx, rx) = mpsc::channel();
        let (devices, init_error) = match devices::enumerate() {
            Ok(devices) => (devices, None),
            Err(e) => {
                log::error!("MIDI unavailable: {e:#}");
                (Vec::new(), Some(format!("{e:#}")))
            }
        };

        let mut app = Self {
            devices,
            selected: None,
            attached: None,
            listener: None,
            tx,
            rx,
            session: Session::default(),
            filter: LogFilter::default(),
            status: IDLE_STATUS.to_string(),
            last_scan: Instant::now(),
            init_error,
        };

        if let Some(pattern) = initial_port {
            let pattern = pattern.to_lowercase();
            match app
                .devices
                .iter()
                .find(|device| device.name.to_lowercase().contains(&pattern))
            {
                Some(device) => app.selected = Some(device.id.clone()),
                None => log::warn!("no input port matching {pattern:?}"),
            }
        }

        app
    }

    fn drain_events(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.session.push(msg);
        }
    }

    /// Periodic hot-plug scan. If the monitored device vanished, drop the
    /// selection quietly; `reconcile_connection` detaches on the same frame.
    fn refresh_devices(&mut self) {
        if self.last_scan.elapsed() < SCAN_INTERVAL {
            return;
        }
        self.last_scan = Instant::now();

        match devices::enumerate() {
            Ok(devices) => {
                if let Some(id) = &self.selected {
                    if !devices.iter().any(|device| &device.id == id) {
                        let name = self
                            .listener
                            .as_ref()
                            .map_or("device", MidiListener::port_name);
                        log::info!("🎹 Disconnected {name}");
                        self.selected = None;
                    }
                }
                self.devices = devices;
            }
            Err(e) => log::warn!("port scan failed: {e:#}"),
        }
    }

    /// Keeps the listener in sync with the selection: detach first, then
    /// attach, so at no point are two subscriptions live.
    fn reconcile_connection(&mut self, ctx: &egui::Context) {
        if self.attached == self.selected {
            return;
        }

        let detached = self.listener.take().map(|l| l.port_name().to_string());
        self.attached = None;
        self.session.reset_tables();

        let Some(id) = self.selected.clone() else {
            self.status = match detached {
                Some(name) => format!("Stopped monitoring {name}"),
                None => IDLE_STATUS.to_string(),
            };
            return;
        };

        match MidiListener::connect(&id, self.tx.clone(), ctx.clone()) {
            Ok(listener) => {
                self.status = format!("Monitoring {}", listener.port_name());
                self.attached = Some(id);
                self.listener = Some(listener);
            }
            Err(e) => {
                log::warn!("attach failed: {e:#}");
                self.status = format!("Failed to open device: {e:#}");
                self.selected = None;
            }
        }
    }

    fn export_log(&mut self) {
        if self.session.is_empty() {
            self.status = "Nothing to export".to_string();
            return;
        }

        let path = format!("midi-log-{}.json", Local::now().format("%Y-%m-%dT%H-%M-%S"));
        let result = self
            .session
            .export_json()
            .and_then(|json| std::fs::write(&path, json).map_err(anyhow::Error::from));
        match result {
            Ok(()) => {
                log::info!("exported {} events to {path}", self.session.len());
                self.status = format!("Exported {} events to {path}", self.session.len());
            }
            Err(e) => {
                log::error!("export failed: {e:#}");
                self.status = format!("Export failed: {e:#}");
            }
        }
    }

    // ─────────────────── panels ──────────────────────────────────────────────

    fn controls_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new("MIDI Monitor").strong().size(18.0));
            ui.separator();

            ui.label("Device:");
            let device_label = self
                .selected
                .as_ref()
                .and_then(|id| self.devices.iter().find(|device| &device.id == id))
                .map_or_else(|| "Select device".to_string(), |device| device.name.clone());
            egui::ComboBox::from_id_source("device")
                .width(220.0)
                .selected_text(device_label)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.selected, None, "—");
                    for device in &self.devices {
                        ui.selectable_value(
                            &mut self.selected,
                            Some(device.id.clone()),
                            &device.name,
                        );
                    }
                });

            ui.label("Channel:");
            egui::ComboBox::from_id_source("channel-filter")
                .selected_text(
                    self.filter
                        .channel
                        .map_or_else(|| "All".to_string(), |ch| format!("Ch {ch}")),
                )
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.filter.channel, None, "All");
                    for ch in 1..=16u8 {
                        ui.selectable_value(&mut self.filter.channel, Some(ch), format!("Ch {ch}"));
                    }
                });

            ui.label("Type:");
            egui::ComboBox::from_id_source("type-filter")
                .selected_text(
                    self.filter
                        .kind
                        .map_or_else(|| "All".to_string(), |kind| kind.to_string()),
                )
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.filter.kind, None, "All");
                    for kind in MessageType::FILTERABLE {
                        ui.selectable_value(&mut self.filter.kind, Some(kind), kind.to_string());
                    }
                });

            if ui.button("Export").clicked() {
                self.export_log();
            }
            if ui.button("Clear").clicked() {
                self.session.clear();
                self.status = "Log cleared".to_string();
            }
        });
        ui.label(RichText::new(&self.status).weak());
    }

    fn log_panel(&self, ui: &mut egui::Ui) {
        let total = self.session.len();
        let shown: Vec<&MidiMessage> = self.session.filtered(self.filter).collect();

        ui.horizontal(|ui| {
            ui.heading("Message Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    RichText::new(format!("showing {} of {}", shown.len(), total)).weak(),
                );
            });
        });
        ui.separator();

        if shown.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Waiting for MIDI messages…").weak());
            });
            return;
        }

        let row_height = ui.text_style_height(&egui::TextStyle::Monospace);
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show_rows(ui, row_height, shown.len(), |ui, range| {
                for msg in &shown[range] {
                    widgets::log_row(ui, msg);
                }
            });
    }

    fn visualizer_panel(&self, ui: &mut egui::Ui) {
        ui.heading("Controllers");
        let observed: Vec<(u8, u8)> = self.session.observed_controllers().take(16).collect();
        if observed.is_empty() {
            ui.label(RichText::new("CC values appear here as they arrive").weak());
        } else {
            ui.horizontal_wrapped(|ui| {
                for (controller, value) in observed {
                    widgets::cc_cell(ui, controller, value);
                }
            });
        }

        ui.add_space(12.0);
        ui.separator();
        ui.heading("Notes");
        ui.label(RichText::new("C4–B4").weak());
        widgets::keyboard_octave(ui, self.session.note_states());
        ui.add_space(12.0);
        ui.label(RichText::new("All notes 0–127").weak());
        widgets::note_grid(ui, self.session.note_states());
    }

    fn show_unavailable(&self, ctx: &egui::Context, error: &str) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(160.0);
                ui.heading("MIDI Monitor");
                ui.add_space(12.0);
                ui.colored_label(
                    Color32::from_rgb(248, 113, 113),
                    "MIDI input is not available on this system.",
                );
                ui.label(RichText::new(error).weak());
            });
        });
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(error) = &self.init_error {
            self.show_unavailable(ctx, error);
            return;
        }

        self.drain_events();
        self.refresh_devices();
        self.reconcile_connection(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls_bar(ui));
        egui::SidePanel::right("log")
            .default_width(520.0)
            .show(ctx, |ui| self.log_panel(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.visualizer_panel(ui));

        // Keep the hot-plug scan ticking even when no messages arrive.
        ctx.request_repaint_after(SCAN_INTERVAL);
    }
}
