mod commands;
mod terminal;

use std::future::Future;
use std::time::Duration;

use commands::{CommandLine, Commands, Output, discover, ping, sweep};
use sweepr_common::config::{Config, SweepConfig};
use terminal::{logging, print};

/// How long exit waits for reverse lookups still blocked in the system resolver.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging();

    block_on_with_grace(run(commands), SHUTDOWN_GRACE)?
}

async fn run(commands: CommandLine) -> anyhow::Result<()> {
    let cfg = Config {
        no_banner: commands.no_banner,
        quiet: commands.quiet,
    };
    let sweep_cfg: SweepConfig = commands.sweep.to_config();
    let output = Output {
        json: commands.json,
        update_tags: commands.update_tags,
    };

    print::banner(cfg.no_banner, cfg.quiet);

    let outcome = match commands.command {
        Commands::Ping { addr } => {
            print::header("pinging host", cfg.quiet);
            ping::ping(addr, &sweep_cfg, &cfg, &output).await
        }
        Commands::Sweep { range, known } => {
            print::header("starting sweep", cfg.quiet);
            sweep::sweep(range, known.as_deref(), &sweep_cfg, &cfg, &output).await
        }
        Commands::Discover { range, known } => {
            print::header("getting ready for discovery", cfg.quiet);
            discover::discover(range, known.as_deref(), &sweep_cfg, &cfg, &output).await
        }
    };

    print::end_of_program(cfg.quiet);
    outcome
}

/// Runs `future` on a fresh runtime. Blocking tasks abandoned by a timeout
/// get at most `grace` before the runtime is torn down.
fn block_on_with_grace<F: Future>(future: F, grace: Duration) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    Ok(output)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
