use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use tally_cli::{CliContext, commands, logging, readline};
use tally_core::context::{AppConfig, AppConfigExt, Flag};

#[tokio::main]
async fn main() -> Result<(), String> {
    logging::init();
    let args = Args::parse();

    let mut config = AppConfig::load();
    if let Some(dir) = args.log_dir {
        config.log_directory = dir;
    }
    if let Some(output) = args.output {
        config.sink.output_path = output;
    }
    if args.identity.is_some() {
        config.tracked_identity = args.identity;
    }
    if args.auto_reset.is_some() {
        config.auto_reset_secs = args.auto_reset;
    }

    let (ctx, mut notifications) = CliContext::start(config);
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            commands::print_notification(&notification);
        }
    });

    loop {
        let line = tokio::task::spawn_blocking(readline)
            .await
            .map_err(|e| e.to_string())??;
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    ctx.shutdown().await;
    Ok(())
}

/// Startup options; anything given here overrides the saved configuration
/// for this run.
#[derive(Parser)]
#[command(version, about = "Combat log tracker")]
struct Args {
    /// Directory holding the game's combat logs
    #[arg(long)]
    log_dir: Option<String>,
    /// Overlay text file to write
    #[arg(long)]
    output: Option<String>,
    /// Player to track instead of auto-detecting
    #[arg(long)]
    identity: Option<String>,
    /// Seconds of quiet before an automatic reset
    #[arg(long)]
    auto_reset: Option<u64>,
}

#[derive(Parser)]
#[command(about = "tally prompt")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Close the current epoch
    Reset,
    Clear,
    /// Track NAME, or auto-detect when omitted or "auto"
    Identity { name: Option<String> },
    Toggle { flag: FlagArg, state: Switch },
    Reload,
    Stats,
    Sink {
        #[command(subcommand)]
        action: SinkAction,
    },
    /// Seconds before an automatic reset; omit to disable
    AutoReset { secs: Option<u64> },
    Config,
    Save,
    Exit,
}

#[derive(Subcommand)]
enum SinkAction {
    Enable,
    Disable,
    Set {
        #[arg(long)]
        max_lines: Option<usize>,
        #[arg(long)]
        column_width: Option<usize>,
        #[arg(long)]
        reason_width: Option<usize>,
        #[arg(long)]
        column_gap: Option<usize>,
        #[arg(long)]
        header: Option<Switch>,
        #[arg(long)]
        totals: Option<Switch>,
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FlagArg {
    Damage,
    HealReceived,
    HealApplied,
    GodsOnly,
}

impl From<FlagArg> for Flag {
    fn from(arg: FlagArg) -> Self {
        match arg {
            FlagArg::Damage => Flag::TrackDamage,
            FlagArg::HealReceived => Flag::TrackHealReceived,
            FlagArg::HealApplied => Flag::TrackHealApplied,
            FlagArg::GodsOnly => Flag::GodsOnly,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "tally".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::Reset) => commands::reset(ctx).await?,
        Some(Commands::Clear) => commands::clear(ctx).await?,
        Some(Commands::Identity { name }) => {
            let name = name.filter(|n| n != "auto");
            commands::set_identity(name, ctx).await?
        }
        Some(Commands::Toggle { flag, state }) => {
            commands::toggle(flag.into(), state.is_on(), ctx).await
        }
        Some(Commands::Reload) => commands::reload(ctx).await?,
        Some(Commands::Stats) => commands::show_stats(ctx).await?,
        Some(Commands::Sink { action }) => match action {
            SinkAction::Enable => commands::set_sink_enabled(true, ctx).await?,
            SinkAction::Disable => commands::set_sink_enabled(false, ctx).await?,
            SinkAction::Set {
                max_lines,
                column_width,
                reason_width,
                column_gap,
                header,
                totals,
                output,
            } => {
                commands::update_sink(ctx, |sink| {
                    if let Some(v) = max_lines {
                        sink.max_lines = v;
                    }
                    if let Some(v) = column_width {
                        sink.column_width = v;
                    }
                    if let Some(v) = reason_width {
                        sink.reason_width = v;
                    }
                    if let Some(v) = column_gap {
                        sink.column_gap = v;
                    }
                    if let Some(v) = header {
                        sink.show_header = v.is_on();
                    }
                    if let Some(v) = totals {
                        sink.show_totals = v.is_on();
                    }
                    if let Some(v) = output {
                        sink.output_path = v;
                    }
                })
                .await?
            }
        },
        Some(Commands::AutoReset { secs }) => commands::set_auto_reset(secs, ctx).await?,
        Some(Commands::Config) => commands::show_config(ctx).await,
        Some(Commands::Save) => commands::save_config(ctx).await?,
        Some(Commands::Exit) => {
            commands::exit()?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
