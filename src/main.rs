use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use colored::*;
use rtspscout::{
    config::ScanConfig,
    output::{OutputConfig, OutputManager},
    paths::{split_list, DEFAULT_PORTS},
    Pipeline,
};
use tokio_util::sync::CancellationToken;

/// Exit code used after ctrl-c, as shells report SIGINT
const EXIT_INTERRUPTED: i32 = 130;

fn build_cli() -> Command {
    Command::new("rtspscout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Scan a network for RTSP cameras and verify which streams deliver frames")
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("CIDR")
                .help("IP address or network in CIDR notation (e.g., 192.168.1.0/24)"),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_name("PORTS")
                .help(format!("Comma-separated list of ports to scan [default: {}]", DEFAULT_PORTS)),
        )
        .arg(
            Arg::new("credentials")
                .short('c')
                .long("credentials")
                .value_name("USER:PASS,...")
                .help("Comma-separated credentials to try (e.g., admin:admin,admin:12345)"),
        )
        .arg(
            Arg::new("paths")
                .short('P')
                .long("paths")
                .value_name("PATHS")
                .help("Comma-separated list of RTSP paths to try (defaults to a built-in vendor list)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Timeout in seconds for each stream probe attempt [default: 10]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("retries")
                .short('r')
                .long("retries")
                .value_name("N")
                .help("Probe attempts per candidate stream [default: 2]")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("N")
                .help("Maximum concurrent port connects [default: 50]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("probe-workers")
                .long("probe-workers")
                .value_name("N")
                .help("Maximum concurrent stream probes [default: 20]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("connect-timeout")
                .long("connect-timeout")
                .value_name("MS")
                .help("Timeout in milliseconds for each TCP connect [default: 1000]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("max-hosts")
                .long("max-hosts")
                .value_name("N")
                .help("Refuse ranges with more hosts than this [default: 65536]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .value_name("PATH")
                .help("ffmpeg executable used to verify streams [default: ffmpeg]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file for discovered cameras (JSON format)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file (defaults to ~/.rtspscout.toml when present)"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .help("Do not draw progress bars")
                .action(ArgAction::SetTrue),
        )
}

/// Command line flags win over the configuration file
fn apply_overrides(config: &mut ScanConfig, matches: &ArgMatches) {
    if let Some(address) = matches.get_one::<String>("address") {
        config.address = address.clone();
    }
    if let Some(ports) = matches.get_one::<String>("ports") {
        config.ports = ports.clone();
    }
    if let Some(credentials) = matches.get_one::<String>("credentials") {
        config.credentials = split_list(credentials);
    }
    if let Some(paths) = matches.get_one::<String>("paths") {
        config.paths = split_list(paths);
    }
    if let Some(&timeout) = matches.get_one::<u64>("timeout") {
        config.probe_timeout_secs = timeout;
    }
    if let Some(&retries) = matches.get_one::<u32>("retries") {
        config.retries = retries;
    }
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        config.scan_workers = workers;
    }
    if let Some(&workers) = matches.get_one::<usize>("probe-workers") {
        config.probe_workers = workers;
    }
    if let Some(&timeout) = matches.get_one::<u64>("connect-timeout") {
        config.connect_timeout_ms = timeout;
    }
    if let Some(&max_hosts) = matches.get_one::<u64>("max-hosts") {
        config.max_hosts = max_hosts;
    }
    if let Some(binary) = matches.get_one::<String>("ffmpeg") {
        config.probe_binary = binary.clone();
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output = Some(PathBuf::from(output));
    }
}

/// Returns whether the run was interrupted
async fn run(matches: &ArgMatches) -> anyhow::Result<bool> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::from_toml_file(Path::new(path))
            .with_context(|| format!("failed to load config {}", path))?,
        None => ScanConfig::load_default(),
    };
    apply_overrides(&mut config, matches);
    config.validate()?;

    let output_path = config.output.clone();
    let show_progress = !matches.get_flag("no-progress") && std::io::stderr().is_terminal();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let pipeline = Pipeline::from_config(config)
        .with_cancellation(cancel)
        .with_progress(show_progress);
    let report = pipeline.run().await?;

    if report.interrupted {
        println!("\n{}", "Scan interrupted by user.".yellow());
    }

    if report.open_ports.is_empty() && !report.interrupted {
        println!("No open ports found. Try scanning different ports or address range.");
    } else {
        let output = OutputManager::new(OutputConfig {
            colored: std::io::stdout().is_terminal(),
        });
        print!("{}", output.format_text(&report));
    }

    if let Some(path) = output_path {
        report.write_json(&path)?;
        println!("\nResults saved to {}", path.display());
    }

    Ok(report.interrupted)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();

    match run(&matches).await {
        Ok(false) => {}
        Ok(true) => process::exit(EXIT_INTERRUPTED),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red(), e);
            process::exit(1);
        }
    }
}
