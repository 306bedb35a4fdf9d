use std::sync::mpsc;

use tracing::{debug, info};
use vbus_frame::Packet;
use vbus_worker::{start, BusConfig};

use crate::cmd::ListenArgs;
use crate::exit::{worker_error, worker_exit, CliResult};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = BusConfig::new(&args.path)
        .with_raw_mode(args.raw)
        .with_baud(args.baud);

    // The worker forwards packets here; the channel closes after the
    // end-of-stream call, once the device has been released.
    let (tx, rx) = mpsc::channel::<Packet>();
    let worker = start(config, tx).map_err(|err| worker_error("start failed", err))?;
    info!(path = ?args.path, worker = worker.id(), "listening");

    let mut printed = 0u64;
    for packet in rx {
        if !matches_filters(&args, &packet) {
            debug!(%packet, "filtered");
            continue;
        }
        print_packet(&packet, format);
        printed = printed.saturating_add(1);
    }

    let exit = worker.join();
    info!(printed, %exit, "line closed");
    worker_exit(exit)
}

fn matches_filters(args: &ListenArgs, packet: &Packet) -> bool {
    args.dst.is_none_or(|dst| dst == packet.destination)
        && args.src.is_none_or(|src| src == packet.source)
        && args.command.is_none_or(|cmd| cmd == packet.command)
}
