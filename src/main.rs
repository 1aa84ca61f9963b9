/* Command-line front end: run JSON scripts, watch a device as a live hex
scope, or write a generated waveform once.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use scopegen::script::Script;
use scopegen::session::{JobConfig, Session, StopOutcome, WaitSpec};
use scopegen::utils::init_logger;
use scopegen::{Console, Waveform};

#[derive(Parser)]
#[command(name = "scopegen", version, about = "Paced sampling and waveform generation")]
struct Cli {
    /// Seconds `stop` waits for a background job before abandoning it
    #[arg(long, global = true, default_value_t = 5.0)]
    stop_timeout: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON command script
    Run { script: PathBuf },

    /// Print captured chunks as hex until the timer expires
    Scope {
        /// Sampling interval in milliseconds
        #[arg(long, default_value_t = 1)]
        sample_ms: u64,
        /// How long to run, in seconds
        #[arg(long)]
        wait_s: f64,
        #[arg(long, default_value = "mock://scope")]
        device: String,
        #[arg(long, default_value_t = 256)]
        chunk: usize,
    },

    /// Write a generated waveform to a device once
    Gen {
        #[arg(long)]
        out: String,
        #[arg(long, default_value = "sine")]
        wave: Waveform,
        #[arg(long, default_value_t = 1.0)]
        amp: f64,
        /// Chunks per second; unpaced when omitted
        #[arg(long)]
        rate: Option<f64>,
        #[arg(long, default_value_t = 512)]
        chunk: usize,
        /// Total bytes to write
        #[arg(long)]
        bytes: Option<u64>,
        #[arg(long)]
        loops: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let stop_timeout = Duration::try_from_secs_f64(cli.stop_timeout)
        .context("--stop-timeout must be a non-negative number of seconds")?;
    let mut session = Session::new(Console::stdout()).with_stop_timeout(stop_timeout);

    match cli.command {
        Commands::Run { script } => {
            let script = Script::load(&script)
                .with_context(|| format!("loading script {}", script.display()))?;
            script.run(&mut session);
        }
        Commands::Scope {
            sample_ms,
            wait_s,
            device,
            chunk,
        } => {
            let config = JobConfig::acquire(device)
                .with_rate(1000.0 / sample_ms.max(1) as f64)
                .with_chunk(chunk)
                .with_duration(wait_s)
                .with_echo(true);

            session
                .console()
                .line(format!("[main] start scope: sample={}ms wait={}s", sample_ms, wait_s));
            session.start(&config)?;
            session.wait(&WaitSpec::seconds(wait_s))?;
            if let StopOutcome::Abandoned = session.stop() {
                anyhow::bail!("scope reader did not stop in time");
            }
            session.console().line("[main] scope finished");
        }
        Commands::Gen {
            out,
            wave,
            amp,
            rate,
            chunk,
            bytes,
            loops,
        } => {
            let mut config = JobConfig::generate(out).with_wave(wave, amp).with_chunk(chunk);
            config.rate = rate;
            config.sample_count = bytes;
            config.loop_count = loops;

            let report = session.write(&config)?;
            if !report.result.is_ok() {
                anyhow::bail!("write finished with errors: {}", report.result);
            }
        }
    }

    Ok(())
}
