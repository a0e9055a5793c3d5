//! Print the Ethernet/IPv4/TCP headers of the frames captured on an interface

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use pcap_test::{open_live, CancelToken, CaptureConfig, Driver, StopReason, TextSink};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pcap-test")]
#[command(version, about = "Print the TCP frames captured on a network interface", long_about = None)]
struct Cli {
    /// Network interface to capture on (for ex. wlan0)
    interface: String,
}

fn usage() {
    println!("syntax: pcap-test <interface>");
    println!("sample: pcap-test wlan0");
}

fn run(cli: &Cli) -> anyhow::Result<StopReason> {
    let config = CaptureConfig::new(cli.interface.as_str());
    let source = open_live(&config)
        .with_context(|| format!("cannot capture on interface '{}'", config.interface))?;

    let stdout = io::stdout();
    let mut sink = TextSink::new(stdout.lock());
    let summary = Driver::default().run(source, &mut sink, &CancelToken::new());
    info!(
        frames = summary.stats.frames,
        decoded = summary.stats.decoded,
        "done"
    );
    Ok(summary.stop)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            usage();
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(StopReason::SinkFailed(msg)) => {
            error!("cannot write output: {}", msg);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
