// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use multicast_reflector::capture::{self, Injector, PACKET_CHANNEL_BOUND};
use multicast_reflector::config::{find_config_file, read_config};
use multicast_reflector::diag::{run_debug_server, DEBUG_PORT};
use multicast_reflector::nic;
use multicast_reflector::policy::Policy;
use multicast_reflector::reflect::{
    announce, Dispatcher, ForwarderToggles, ReflectorContext, SsdpSessions,
};
use multicast_reflector::session::SWEEP_INTERVAL;

/// Reflect mDNS and SSDP discovery traffic across VLANs from one
/// 802.1Q trunk port.
#[derive(Debug, Parser)]
#[command(name = "multicast-reflector", version)]
struct Cli {
    /// Config file in TOML format
    #[arg(long)]
    config: Option<PathBuf>,

    /// See packets
    #[arg(long)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(long, conflicts_with = "verbose")]
    silent: bool,

    /// Serve runtime counters on localhost:6060
    #[arg(long)]
    debug: bool,

    /// Keep the hardware vlan filter (rx-vlan-filter)
    #[arg(long)]
    keep_vlan_filter: bool,

    /// Disable SSDP
    #[arg(long)]
    no_ssdp: bool,

    /// Disable Bonjour
    #[arg(long)]
    no_bonjour: bool,

    /// Disable NDP and ARP
    #[arg(long)]
    no_ndp_arp: bool,

    /// Enable promiscuous mode on the capture handle
    #[arg(long)]
    promiscuous: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.silent {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
    {
        eprintln!("could not initialize logging: {e}");
    }

    if let Err(e) = run(cli) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => find_config_file()?,
    };
    let cfg = read_config(&config_path)?;
    let policy = Policy::new(&cfg);

    let mac = capture::interface_mac(&cfg.net_interface)?;
    log::info!(
        "reflecting on {} ({mac}), config {}",
        cfg.net_interface,
        config_path.display()
    );

    if !cli.keep_vlan_filter {
        nic::remove_vlan_filter(&cfg.net_interface);
    }

    let ctx = Arc::new(ReflectorContext::new(mac, policy));
    let writer = Arc::new(
        Injector::open(&cfg.net_interface)
            .context("could not open injection handle")?,
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            log::info!("termination signal received, shutting down");
            stop.store(true, Ordering::Relaxed);
        })
        .context("could not install signal handler")?;
    }

    if !cli.no_ndp_arp {
        announce(writer.as_ref(), &ctx);
    }

    let capture_handle =
        capture::open_capture(&cfg.net_interface, cli.promiscuous, mac)
            .context("could not open capture handle")?;

    let (packets_tx, packets_rx) = mpsc::sync_channel(PACKET_CHANNEL_BOUND);
    let sessions = Arc::new(SsdpSessions::new());

    let capture_thread = std::thread::Builder::new()
        .name("capture".to_string())
        .spawn({
            let stop = stop.clone();
            let ctx = ctx.clone();
            move || {
                capture::run_capture_loop(
                    capture_handle,
                    packets_tx,
                    &stop,
                    &ctx.stats,
                )
            }
        })
        .context("could not spawn capture thread")?;

    let sweeper_thread = std::thread::Builder::new()
        .name("session-sweeper".to_string())
        .spawn({
            let stop = stop.clone();
            let sessions = sessions.clone();
            move || {
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(SWEEP_INTERVAL);
                    sessions.sweep();
                }
            }
        })
        .context("could not spawn session sweeper")?;

    if cli.debug {
        let stats = ctx.stats.clone();
        let stop = stop.clone();
        std::thread::Builder::new()
            .name("diagnostics".to_string())
            .spawn(move || {
                if let Err(e) = run_debug_server(DEBUG_PORT, stats, stop) {
                    log::error!(
                        "diagnostics endpoint on port {DEBUG_PORT} \
                        failed: {e}"
                    );
                }
            })
            .context("could not spawn diagnostics thread")?;
    }

    let dispatcher = Dispatcher::new(
        ctx.clone(),
        writer,
        sessions,
        ForwarderToggles {
            ssdp: !cli.no_ssdp,
            bonjour: !cli.no_bonjour,
            ndp_arp: !cli.no_ndp_arp,
        },
    );
    dispatcher.run(packets_rx, &stop);

    stop.store(true, Ordering::Relaxed);
    if capture_thread.join().is_err() {
        log::error!("capture thread panicked");
    }
    let _ = sweeper_thread.join();
    log::info!("shutdown complete");
    Ok(())
}
