use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratedesk::cli::convert::parse_amount_arg;
use ratedesk::core::log::init_logging;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve the rates HTTP API
    Serve {
        /// Address to listen on, overrides server.bind
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Convert amounts to USD with the current rates
    Convert {
        /// Amounts as CURRENCY=AMOUNT, e.g. AUD=100
        #[arg(value_parser = parse_amount_arg)]
        amounts: Vec<(String, String)>,
        /// Use this period instead of the latest one
        #[arg(short, long)]
        period: Option<String>,
        /// USD amount to convert to HKD for JCB settlement
        #[arg(long)]
        jcb_usd: Option<String>,
    },
    /// Edit, stage and publish rates
    Admin,
}

impl From<Commands> for ratedesk::AppCommand {
    fn from(cmd: Commands) -> ratedesk::AppCommand {
        match cmd {
            Commands::Serve { bind } => ratedesk::AppCommand::Serve { bind },
            Commands::Convert {
                amounts,
                period,
                jcb_usd,
            } => ratedesk::AppCommand::Convert {
                period,
                amounts,
                jcb_usd,
            },
            Commands::Admin => ratedesk::AppCommand::Admin,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet_level = match cli.command {
        Some(Commands::Serve { .. }) => LevelFilter::INFO,
        _ => LevelFilter::OFF,
    };
    init_logging(cli.verbose, quiet_level);

    let result = match cli.command {
        Some(Commands::Setup) => ratedesk::cli::setup::setup(cli.config_path.as_deref()),
        Some(cmd) => ratedesk::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
