mod app;
mod devices;
mod message;
mod midi;
mod session;
mod widgets;

use anyhow::{Result, anyhow};
use clap::Parser;
use eframe::egui;
use env_logger::Env;

/// Live monitor for MIDI input devices.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Select the first port whose name contains NAME at startup
    #[arg(long, value_name = "NAME")]
    port: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list_ports {
        for device in devices::enumerate()? {
            println!("{}  {}", device.id, device.name);
        }
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([800.0, 560.0]),
        ..Default::default()
    };
    if let Err(e) = eframe::run_native(
        "MIDI Monitor",
        options,
        Box::new(move |cc| Box::new(app::MonitorApp::new(cc, args.port))),
    ) {
        return Err(anyhow!("eframe::run_native(): {e:?}"));
    }
    Ok(())
}
