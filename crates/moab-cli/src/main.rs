//! `moab` – run a balancing controller on the Moab plate.
//!
//! 1. Parses the command line; `--controller` accepts exactly the names in
//!    the controller registry.
//! 2. Layers settings: defaults → `~/.moab/config.toml` (or `--config`) →
//!    `MOAB_*` variables → flags.
//! 3. Installs a Ctrl-C / SIGTERM handler that raises the run loop's stop
//!    signal, so the plate is levelled and powered down before exit.
//! 4. Runs the selected controller until interrupted.
//!
//! Exit status: `0` on a clean stop, `2` for usage and configuration
//! errors, `1` for everything else.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::PossibleValuesParser;
use clap::{CommandFactory, FromArgMatches, Parser};
use colored::Colorize;
use tracing::{error, info, warn};

use moab_controllers::ControllerRegistry;
use moab_hal::{MoabEnv, SharedDevice, SimHat, SimPlant};
use moab_runtime::{RunLoop, RunReport, StopSignal, init_tracing};
use moab_types::MoabError;

use config::Settings;

/// Starting offset of the simulated ball, in metres.
const SIM_BALL_START: (f32, f32) = (0.03, -0.02);
/// Simulated camera jitter, in metres.
const SIM_SENSOR_NOISE: f32 = 0.0005;

/// Run a balancing controller on the Moab plate
#[derive(Parser, Debug)]
#[command(name = "moab")]
#[command(version, about, long_about = None)]
struct Args {
    /// Controller to run [default: pid]
    #[arg(short, long)]
    controller: Option<String>,

    /// Log every control cycle
    #[arg(short, long)]
    debug: bool,

    /// Control frequency in Hz [default: 30]
    #[arg(short, long)]
    frequency: Option<u32>,

    /// Largest plate tilt a controller may request, in degrees [default: 16]
    #[arg(short = 'm', long, visible_alias = "max_angle")]
    max_angle: Option<f32>,

    /// Local port of the inference service used by `brain` [default: 5000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Seed for the simulated sensor noise
    #[arg(long)]
    seed: Option<u64>,

    /// Settings file (default: ~/.moab/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the resolved settings to the settings file and exit
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// Parse the process arguments, restricting `--controller` to the
    /// registered names.  Exits with status 2 on a usage error.
    fn parse_with(registry: &ControllerRegistry) -> Self {
        let names: Vec<String> = registry.names().into_iter().map(str::to_string).collect();
        let matches = Args::command()
            .mut_arg("controller", |arg| {
                arg.value_parser(PossibleValuesParser::new(names))
            })
            .get_matches();
        Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    /// Highest-priority layer.
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(c) = &self.controller {
            settings.controller = c.clone();
        }
        if let Some(f) = self.frequency {
            settings.frequency = f;
        }
        if let Some(m) = self.max_angle {
            settings.max_angle = m;
        }
        if let Some(p) = self.port {
            settings.port = p;
        }
    }
}

fn main() -> ExitCode {
    let registry = ControllerRegistry::standard();
    let args = Args::parse_with(&registry);

    let level = if args.debug { "debug" } else { "info" };
    let _telemetry = init_tracing("moab", level);

    match run(args, registry) {
        Ok(None) => ExitCode::SUCCESS,
        Ok(Some(report)) => {
            println!(
                "  {} {} stopped after {} cycles ({:?})",
                "✓".green().bold(),
                report.controller.bold(),
                report.cycles,
                report.stop_reason
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "moab exited with an error");
            eprintln!("{}: {e}", "error".red().bold());
            if e.is_usage_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// `Ok(None)` when only the settings file was written.
fn run(args: Args, registry: ControllerRegistry) -> Result<Option<RunReport>, MoabError> {
    let path = args.config.clone().unwrap_or_else(config::config_path);
    let mut settings = match config::load_from(&path)? {
        Some(s) => {
            info!(path = %path.display(), "settings loaded");
            s
        }
        None => Settings::default(),
    };
    config::apply_env_overrides(&mut settings);
    args.apply_to(&mut settings);

    if args.save_config {
        config::save_to(&settings, &path)?;
        println!(
            "  {} Settings saved to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        );
        return Ok(None);
    }

    print_banner(&settings);

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Stop requested – levelling the plate …".yellow().bold());
        handler_stop.raise();
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop with the menu button");
    }

    let mut plant = SimPlant::builder()
        .ball_position(SIM_BALL_START.0, SIM_BALL_START.1)
        .sensor_noise(SIM_SENSOR_NOISE);
    if let Some(seed) = args.seed {
        plant = plant.seed(seed);
    }
    let plant = plant.build();

    let run_loop = RunLoop::new(registry, stop);
    let report = run_loop.run(
        &settings.to_run_config(args.debug),
        || SimHat::open().map(|hat| hat as SharedDevice),
        |device, env_cfg| MoabEnv::open(device, Box::new(plant), env_cfg),
    )?;
    Ok(Some(report))
}

fn print_banner(settings: &Settings) {
    println!();
    println!("{}", r#"   __  ___          __  "#.bold().cyan());
    println!("{}", r#"  /  |/  /__  ___ _/ /  "#.bold().cyan());
    println!("{}", r#" / /|_/ / _ \/ _ `/ _ \ "#.bold().cyan());
    println!("{}", r#"/_/  /_/\___/\_,_/_.__/ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Moab".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!(
        "  controller {}  ·  {} Hz  ·  ±{}°",
        settings.controller.bold(),
        settings.frequency,
        settings.max_angle
    );
    println!("  Press {} or the menu button to stop.", "Ctrl-C".bold());
    println!();
}
