use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::commands::{command_bag, command_config, command_dump, command_resolve};

mod commands;

#[derive(Parser)]
#[command(version, about, arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show packages, types and configurations of resource tables
    Dump {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long, default_value_t = false, help = "print as json")]
        json: bool,
    },
    /// Resolve a resource to its final value
    Resolve {
        #[arg(required = true)]
        path: PathBuf,

        #[arg(long, help = "resource id, like 0x7f010000", conflicts_with = "name")]
        id: Option<String>,

        #[arg(long, help = "resource name, like com.example:string/app_name")]
        name: Option<String>,

        #[arg(short, long, help = "device configuration, like en-rUS-land-hdpi")]
        config: Option<String>,

        #[arg(long, default_value_t = false, help = "print as json")]
        json: bool,
    },
    /// Print a style or another bag merged with its parents
    Bag {
        #[arg(required = true)]
        path: PathBuf,

        #[arg(long, required = true, help = "resource id, like 0x7f0b0000")]
        id: String,

        #[arg(short, long, help = "device configuration, like en-rUS-land-hdpi")]
        config: Option<String>,

        #[arg(long, default_value_t = false, help = "print as json")]
        json: bool,
    },
    /// Parse and normalize a configuration qualifier string
    Config {
        #[arg(required = true)]
        qualifiers: String,

        #[arg(long, help = "requested configuration to match against")]
        against: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(required = true)]
        shell: Shell,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.commands {
        Some(Commands::Dump { paths, json }) => command_dump(paths, *json),
        Some(Commands::Resolve {
            path,
            id,
            name,
            config,
            json,
        }) => command_resolve(path, id.as_deref(), name.as_deref(), config.as_deref(), *json),
        Some(Commands::Bag {
            path,
            id,
            config,
            json,
        }) => command_bag(path, id, config.as_deref(), *json),
        Some(Commands::Config {
            qualifiers,
            against,
        }) => command_config(qualifiers, against.as_deref()),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "restable", &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    };

    if let Err(err) = result {
        eprintln!("{:#}", err);
    }
}
