//! Decode a recorded vbus capture and print every packet it contains.
//!
//! ```text
//! cargo run -p vbus --example decode-capture -- line.bin
//! cat line.bin | cargo run -p vbus --example decode-capture -- -
//! ```

use vbus::{start, BusConfig, Packet, WorkerExit};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "-".to_string());

    let mut count = 0usize;
    let worker = start(BusConfig::new(&path), move |packet: Option<&Packet>| {
        match packet {
            Some(packet) => {
                count += 1;
                println!("#{count} {packet} payload={:02x?}", packet.payload.as_ref());
            }
            None => println!("end of capture after {count} packets"),
        }
    })?;

    match worker.join() {
        WorkerExit::EndOfStream => Ok(()),
        other => Err(format!("reader stopped: {other}").into()),
    }
}
