//! pm2ctl - PM2 process state reconciliation
//!
//! The main entry point for pm2ctl, handling:
//! - `facts`: report the pm2 inventory
//! - `process`: drive named processes toward a desired state
//! - Check (simulation) and diff reporting
//! - Shell completions and version information

use clap::{Args, CommandFactory, Parser, Subcommand};
use pm2ctl_common::{DesiredState, Error, OutputFormat};
use pm2ctl_core::config::{resolve_options, OptionLayer, ResolvedOptions};
use pm2ctl_core::exit_codes::ExitCode;
use pm2ctl_core::inventory::Environment;
use pm2ctl_core::log_event;
use pm2ctl_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use pm2ctl_core::output::{render_error, render_facts, render_mutate, Rendered};
use pm2ctl_core::reconcile::{reconcile, ApplyOptions};
use pm2ctl_core::supervisor::{discover_executable, RunnerConfig, SupervisorClient, SystemRunner};
use std::io::IsTerminal;
use std::path::PathBuf;

/// pm2ctl - Reconcile PM2 processes with a desired state
#[derive(Parser)]
#[command(name = "pm2ctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to the pm2 executable (default: search PATH)
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    /// Fail instead of running 'pm2 update' when in-memory pm2 is out of date
    #[arg(long, global = true)]
    no_allow_update: bool,

    /// Read options from a JSON, YAML or TOML file
    #[arg(long, global = true, env = "PM2CTL_ARGS_FILE")]
    args_file: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Compute changes without running any pm2 mutation
    #[arg(long, global = true)]
    check: bool,

    /// Include the before/after diff in the result
    #[arg(long, global = true)]
    diff: bool,

    /// Per-command timeout for pm2 (seconds)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q errors only, -qq silent)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    quiet: u8,

    /// Log format on stderr
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the pm2 version and every process it manages
    Facts,

    /// Drive processes toward a desired state
    Process(ProcessArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Process name; '*' matches every process
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// Script the process runs; needed to create a process
    #[arg(long)]
    file: Option<PathBuf>,

    /// Desired state (default: started)
    #[arg(long, value_enum)]
    state: Option<DesiredState>,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap exits with 2 on usage errors, which means "changed" here
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let level = LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet);
    init_logging(&LogConfig::from_env(level, cli.global.log_format));

    let exit_code = match &cli.command {
        Commands::Facts => run_facts(&cli.global),
        Commands::Process(args) => run_process(&cli.global, args),
        Commands::Completions { shell } => {
            print_completions(*shell);
            ExitCode::Clean
        }
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_facts(global: &GlobalOpts) -> ExitCode {
    let ctx = LogContext::new(generate_run_id()).with_operation("facts");
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting facts");

    let result = resolve(&ctx, global, None)
        .and_then(|options| load_environment(&ctx, &options))
        .and_then(|env| render_facts(&env.facts(), global.format));

    finish(&ctx, global, result.map(|rendered| (rendered, ExitCode::Clean)))
}

fn run_process(global: &GlobalOpts, args: &ProcessArgs) -> ExitCode {
    let ctx = LogContext::new(generate_run_id()).with_operation("process");
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting process");

    let result: Result<(Rendered, ExitCode), Error> = (|| {
        let options = resolve(&ctx, global, Some(args))?;
        let spec = options.desired_spec().map_err(Error::from)?;
        let env = load_environment(&ctx, &options)?;

        let apply = ApplyOptions {
            simulate: options.check,
            ..Default::default()
        };
        log_event!(
            ctx,
            DEBUG,
            event_names::APPLY_STARTED,
            Stage::Apply,
            "reconciling",
            name = spec.name.as_str(),
            state = spec.state.as_str(),
            simulate = options.check
        );
        let outcome = reconcile(&env, &spec, &apply)?;
        log_event!(
            ctx,
            INFO,
            event_names::APPLY_FINISHED,
            Stage::Apply,
            "reconciliation finished",
            changed = outcome.changed,
            records = outcome.diff.len()
        );

        let rendered = render_mutate(&spec, &outcome, options.diff, global.format)?;
        Ok((rendered, ExitCode::from_changed(outcome.changed)))
    })();

    finish(&ctx, global, result)
}

/// Merge CLI flags with the other option sources.
fn resolve(
    ctx: &LogContext,
    global: &GlobalOpts,
    args: Option<&ProcessArgs>,
) -> Result<ResolvedOptions, Error> {
    let cli = OptionLayer {
        executable: global.executable.clone(),
        allow_update: global.no_allow_update.then_some(false),
        timeout: global.timeout,
        name: args.and_then(|a| a.name.clone()),
        file: args.and_then(|a| a.file.clone()),
        state: args.and_then(|a| a.state),
        check: global.check.then_some(true),
        diff: global.diff.then_some(true),
    };

    match resolve_options(cli, global.args_file.as_deref(), |key| std::env::var(key).ok()) {
        Ok(options) => {
            log_event!(
                ctx,
                DEBUG,
                event_names::CONFIG_LOADED,
                Stage::Init,
                "options resolved",
                sources = options.sources.len(),
                allow_update = options.allow_update
            );
            Ok(options)
        }
        Err(err) => {
            log_event!(
                ctx,
                WARN,
                event_names::CONFIG_ERROR,
                Stage::Init,
                "option resolution failed",
                error = err.to_string()
            );
            Err(err.into())
        }
    }
}

fn load_environment(
    ctx: &LogContext,
    options: &ResolvedOptions,
) -> Result<Environment<SystemRunner>, Error> {
    let executable = discover_executable(options.executable.as_deref())?;
    log_event!(
        ctx,
        DEBUG,
        event_names::DISCOVER_EXECUTABLE,
        Stage::Discover,
        "pm2 executable resolved",
        executable = executable.display().to_string()
    );

    let runner = SystemRunner::new(RunnerConfig {
        timeout: options.timeout,
        ..Default::default()
    });
    Environment::load(SupervisorClient::new(executable, runner), options.allow_update)
}

/// Write the result or the failure, and pick the exit code.
fn finish(
    ctx: &LogContext,
    global: &GlobalOpts,
    result: Result<(Rendered, ExitCode), Error>,
) -> ExitCode {
    let (rendered, exit_code) = match result {
        Ok(done) => done,
        Err(err) => {
            log_event!(
                ctx,
                ERROR,
                event_names::RUN_FINISHED,
                Stage::Report,
                "run failed",
                code = err.code(),
                error = err.to_string()
            );
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            (render_error(&err, global.format, use_color), ExitCode::from(&err))
        }
    };

    emit(&rendered);
    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Report,
        "run finished",
        exit_code = exit_code.as_i32()
    );
    exit_code
}

fn emit(rendered: &Rendered) {
    if let Some(out) = &rendered.stdout {
        println!("{}", out);
    }
    if let Some(err) = &rendered.stderr {
        eprintln!("{}", err);
    }
}

fn print_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "pm2ctl", &mut std::io::stdout());
}

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "pm2ctl_version": env!("CARGO_PKG_VERSION"),
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&version_info) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version_info),
        },
        OutputFormat::Exitcode => {}
        OutputFormat::Summary => {
            println!("pm2ctl {}", env!("CARGO_PKG_VERSION"));
        }
    }
}
