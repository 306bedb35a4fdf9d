use clap::{Args, Subcommand};
use std::path::PathBuf;

use vbus_transport::BaudRate;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a line and print decoded packets until the stream ends.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device path, capture file, or `-` for standard input.
    pub path: PathBuf,
    /// Switch the line to raw mode for the session and restore it afterwards.
    #[arg(long)]
    pub raw: bool,
    /// Line speed used with --raw.
    #[arg(long, default_value = "9600", requires = "raw")]
    pub baud: BaudRate,
    /// Only print packets sent to this address (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_u16)]
    pub dst: Option<u16>,
    /// Only print packets sent from this address.
    #[arg(long, value_parser = parse_u16)]
    pub src: Option<u16>,
    /// Only print packets carrying this command.
    #[arg(long, value_parser = parse_u16)]
    pub command: Option<u16>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_u16(value: &str) -> Result<u16, String> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|err| format!("invalid 16-bit value {value:?}: {err}"))
}
