use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    target: String,
    target_os: &'static str,
    target_arch: &'static str,
    rustc: &'static str,
    git_hash: &'static str,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("vbus {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let output = VersionOutput {
        name: "vbus",
        version: env!("CARGO_PKG_VERSION"),
        target: target_triple(),
        target_os: std::env::consts::OS,
        target_arch: std::env::consts::ARCH,
        rustc: option_env!("RUSTC_VERSION").unwrap_or("unknown"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            println!("name: {}", output.name);
            println!("version: {}", output.version);
            println!("target: {}", output.target);
            println!("target_os: {}", output.target_os);
            println!("target_arch: {}", output.target_arch);
            println!("rustc: {}", output.rustc);
            println!("git_hash: {}", output.git_hash);
        }
    }

    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("VBUS_BUILD_TARGET") {
        return target.to_string();
    }
    format!(
        "{}-unknown-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}
