use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vbus_frame::Packet;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PacketOutput {
    destination: u16,
    source: u16,
    protocol_revision: u8,
    command: u16,
    frame_count: u8,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

impl PacketOutput {
    fn new(packet: &Packet) -> Self {
        Self {
            destination: packet.destination,
            source: packet.source,
            protocol_revision: packet.protocol_revision,
            command: packet.command,
            frame_count: packet.frame_count,
            payload_size: packet.payload.len(),
            payload: hex(packet.payload.as_ref()),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_packet(packet: &Packet, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&PacketOutput::new(packet))
                    .unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SRC", "DST", "PROTO", "CMD", "FRAMES", "PAYLOAD"])
                .add_row(vec![
                    format!("0x{:04X}", packet.source),
                    format!("0x{:04X}", packet.destination),
                    format!("0x{:02X}", packet.protocol_revision),
                    format!("0x{:04X}", packet.command),
                    packet.frame_count.to_string(),
                    hex(packet.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{packet} payload={}", hex(packet.payload.as_ref()));
        }
        OutputFormat::Raw => {
            print_raw(packet.payload.as_ref());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
