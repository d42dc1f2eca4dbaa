//! Entry point for `udp-arq`.
//!
//! Parses CLI arguments and dispatches into either **send** or **recv**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, stdin/stdout).

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use udp_arq::channel::Channel;
use udp_arq::simulator::{Simulator, SimulatorConfig};
use udp_arq::socket::UdpChannel;
use udp_arq::{
    AdaptiveTimer, FixedTimeout, Receiver, SenderConfig, SenderEngine, ServeOptions, TimerConfig,
    MSS,
};

/// Reliable byte stream over UDP using stop-and-wait ARQ.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Read stdin and deliver it to a receiver.
    Send {
        /// Receiver address (e.g. 127.0.0.1:50005).
        #[arg(short, long)]
        peer: String,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:50006")]
        bind: String,
        /// Retransmission policy.
        #[arg(long, value_enum, default_value_t = Policy::Adaptive)]
        policy: Policy,
        /// Initial (and, for the fixed policy, only) timeout in milliseconds.
        #[arg(long, default_value_t = 2_000)]
        timeout_ms: u64,
        /// Adaptive policy: abort once the timeout exceeds this many milliseconds.
        #[arg(long, default_value_t = 10_000)]
        ceiling_ms: u64,
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Receive a stream and write it to stdout.
    Recv {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:50005")]
        bind: String,
        /// Stop after this many milliseconds without traffic.
        #[arg(long, default_value_t = 15_000)]
        idle_ms: u64,
        #[command(flatten)]
        link: LinkArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Back off after repeated failures and give up above the ceiling.
    Adaptive,
    /// Retry forever with a constant timeout.
    Fixed,
}

/// Shared link settings, including optional fault injection on outbound
/// traffic.
#[derive(Args)]
struct LinkArgs {
    /// Maximum segment size; must match on both ends.
    #[arg(long, default_value_t = MSS)]
    mss: usize,
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    #[arg(long, default_value_t = 0.0)]
    corrupt: f64,
    #[arg(long, default_value_t = 0.0)]
    duplicate: f64,
    #[arg(long, default_value_t = 0.0)]
    reorder: f64,
    /// Seed for the fault model.
    #[arg(long)]
    seed: Option<u64>,
}

impl LinkArgs {
    fn simulated(&self) -> bool {
        self.loss > 0.0 || self.corrupt > 0.0 || self.duplicate > 0.0 || self.reorder > 0.0
    }

    fn wrap(&self, udp: UdpChannel) -> Result<Box<dyn Channel>> {
        if !self.simulated() {
            return Ok(Box::new(udp));
        }
        let config = SimulatorConfig {
            loss_rate: self.loss,
            corrupt_rate: self.corrupt,
            duplicate_rate: self.duplicate,
            reorder_rate: self.reorder,
            seed: self.seed,
        };
        log::info!("Simulating faults: {config:?}");
        Ok(Box::new(Simulator::new(udp, config)?))
    }
}

fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            peer,
            bind,
            policy,
            timeout_ms,
            ceiling_ms,
            link,
        } => {
            let mut payload = Vec::new();
            std::io::stdin()
                .read_to_end(&mut payload)
                .context("reading stdin")?;

            let mut udp = UdpChannel::bind(&bind).with_context(|| format!("binding {bind}"))?;
            udp.connect(&peer)
                .with_context(|| format!("connecting to {peer}"))?;
            log::info!("Sending on {} to {peer}", udp.local_addr);
            let channel = link.wrap(udp)?;
            let config = SenderConfig {
                mss: link.mss,
                initial_seqnum: None,
            };

            let stats = match policy {
                Policy::Adaptive => {
                    let timer = TimerConfig {
                        initial: Duration::from_millis(timeout_ms),
                        ceiling: Duration::from_millis(ceiling_ms),
                        ..TimerConfig::default()
                    };
                    SenderEngine::new(channel, AdaptiveTimer::new(timer)?, config)?.send(&payload)?
                }
                Policy::Fixed => {
                    let fixed = FixedTimeout(Duration::from_millis(timeout_ms));
                    SenderEngine::new(channel, fixed, config)?.send(&payload)?
                }
            };
            log::info!("Done: {stats:?}");
        }
        Mode::Recv {
            bind,
            idle_ms,
            link,
        } => {
            let udp = UdpChannel::bind(&bind).with_context(|| format!("binding {bind}"))?;
            log::info!("Receiving on {}", udp.local_addr);
            let mut channel = link.wrap(udp)?;
            let mut receiver = Receiver::new(link.mss);
            let opts = ServeOptions {
                startup: None,
                idle: Duration::from_millis(idle_ms),
            };
            let n = receiver.serve(&mut channel, opts)?;
            log::info!("Received {n} bytes");
            std::io::stdout().write_all(&receiver.app_buffer)?;
        }
    }

    Ok(())
}
