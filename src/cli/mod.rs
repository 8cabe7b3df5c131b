use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use env_logger::Target;
use serde_json::Value;

use crate::command::{self, RUN_ANALYSIS_COMMAND};
use crate::config::{EffectiveConfig, OutputFormat};
use crate::core::ResponseEnvelope;
use crate::engine::SpotBugsProcess;
use crate::errors;

#[derive(Debug, Parser)]
#[command(
    name = "bugbridge",
    version,
    about = "Run SpotBugs over Java sources, classes or jars and report findings as a JSON envelope"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,
    #[arg(long, global = true)]
    pub pretty: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a source file, class, jar or directory.
    Run(RunArgs),
    /// Invoke a command by id with raw arguments.
    Exec(ExecArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Omitting it is reported in the envelope like any other bad argument.
    pub path: Option<String>,
    /// Analysis settings as JSON, e.g. '{"effort":"max","priorityThreshold":9}'.
    pub config_json: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    pub command_id: String,
    pub args: Vec<String>,
    /// Parse each argument as a JSON value instead of passing it as a string.
    #[arg(long)]
    pub json_args: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

/// Runs the CLI and returns the process exit status.
pub fn run() -> Result<i32> {
    let cli = parse_cli(std::env::args_os())?;
    init_logging(cli.verbose, cli.quiet);

    let home_dir = crate::platform::effective_home_dir()?;

    let env_config_path = std::env::var_os("BUGBRIDGE_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(errors::invalid_argument_err)?;

    match &cli.command {
        Commands::Run(args) => {
            let mut argv: Vec<Value> = args.path.iter().cloned().map(Value::String).collect();
            if let Some(config_json) = &args.config_json {
                argv.push(Value::String(config_json.clone()));
            }
            execute(&cli, &cfg, RUN_ANALYSIS_COMMAND, &argv)
        }
        Commands::Exec(args) => {
            let argv = if args.json_args {
                args.args
                    .iter()
                    .map(|a| {
                        serde_json::from_str(a).map_err(|err| {
                            errors::invalid_argument(format!("invalid JSON argument {a}: {err}"))
                        })
                    })
                    .collect::<Result<Vec<Value>>>()?
            } else {
                args.args.iter().cloned().map(Value::String).collect()
            };
            execute(&cli, &cfg, &args.command_id, &argv)
        }
        Commands::Config(args) => {
            if args.show {
                write_stdout(&serde_json::to_string_pretty(&cfg)?)?;
            } else if !cli.quiet {
                eprintln!("config: use `bugbridge config --show`");
            }
            Ok(0)
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "bugbridge", &mut out);
            Ok(0)
        }
    }
}

/// Help and version requests exit through clap; any other parse failure
/// becomes an `INVALID_ARGUMENT` error so it reaches stdout as an envelope.
fn parse_cli<I, T>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
        _ => errors::invalid_argument(err.render().to_string().trim().to_string()),
    })
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    // stdout carries the envelope; everything else goes to stderr.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(Target::Stderr)
        .format_timestamp(None)
        .try_init();

    std::panic::set_hook(Box::new(|info| {
        log::error!("panic: {info}");
    }));
}

fn execute(cli: &Cli, cfg: &EffectiveConfig, command_id: &str, args: &[Value]) -> Result<i32> {
    let format = cli.format.unwrap_or(cfg.output.format);
    let pretty = cli.pretty || cfg.output.pretty;

    let engine = SpotBugsProcess::from_config(&cfg.engine);
    let mut dispatcher = command::default_dispatcher(engine);

    let progress_enabled = !cli.quiet && io::stderr().is_terminal();
    let pb = if progress_enabled {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.set_message(format!("running {command_id}..."));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let envelope = dispatcher.execute(command_id, args);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    write_envelope(&envelope, format, pretty, !cli.no_color)?;
    Ok(envelope.exit_status())
}

fn write_envelope(
    envelope: &ResponseEnvelope,
    format: OutputFormat,
    pretty: bool,
    color: bool,
) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => {
            crate::ui::render_summary_with(envelope, color && io::stdout().is_terminal())
        }
        _ => crate::report::render(envelope, format, pretty)?,
    };
    write_stdout(&rendered)
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match stdout.write_all(text.as_bytes()) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    if text.ends_with('\n') {
        return Ok(());
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(errors::invalid_argument(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
