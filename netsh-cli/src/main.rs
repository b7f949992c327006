use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "netsh", about = "Network shell helper registry")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Add, delete and show helper libraries
    Helper(commands::helper::HelperArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::ConfigLoader::load()?;

    let filter = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::Helper(args) => commands::helper::run(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::helper::HelperCommands;

    #[test]
    fn test_parse_helper_add() {
        let cli = Cli::try_parse_from(["netsh", "helper", "add", "/usr/lib/netsh/ifmon.so"]).unwrap();
        match cli.command {
            Commands::Helper(args) => {
                assert!(matches!(args.command, HelperCommands::Add { ref path } if path == "/usr/lib/netsh/ifmon.so"));
            }
            _ => panic!("expected helper command"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_global_verbose() {
        let cli = Cli::try_parse_from(["netsh", "helper", "show", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_delete_requires_name() {
        assert!(Cli::try_parse_from(["netsh", "helper", "delete"]).is_err());
    }
}
