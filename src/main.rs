use check_fxz::platform::IpCommand;
use check_fxz::vpn::CheckError;
use check_fxz::{CheckOptions, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "check-fxz")]
#[command(about = "Check & fix routing when using FXZ VPN")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show debug info
    #[arg(short, long, global = true)]
    debug: bool,

    /// Generate fix routing commands
    #[arg(short, long)]
    fix: bool,

    /// Target network interface (auto-detected if omitted)
    #[arg(short = 'i', long)]
    netif: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "CHECK_FXZ_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate default config file
    Init,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so fix commands can be piped straight into a shell
    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(Commands::Init) = cli.command {
        let path = cli
            .config
            .unwrap_or_else(|| PathBuf::from(check_fxz::config::LOCAL_CONFIG_FILE));
        Config::default().save(&path)?;
        println!("Created default config: {}", path.display());
        return Ok(());
    }

    let config = match Config::discover(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let options = CheckOptions {
        fix: cli.fix,
        interface: cli.netif,
    };
    let source = IpCommand::new(config.detect.ip_command.clone());

    match check_fxz::run_check(&source, &config, &options) {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for line in report.output_lines(&options) {
                    println!("{}", line);
                }
            }
            debug!(
                "Checked {} routes via {}",
                report.classification.vpn_routes, report.interface
            );
        }
        Err(CheckError::InterfaceNotFound) => {
            println!("No FXZ interface found.");
            std::process::exit(1);
        }
        Err(e) => {
            error!("Check failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
