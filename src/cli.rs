use std::path::{Path, PathBuf};

mod document;
mod list;
mod print;
mod renumber;
mod terminal;

use clap::ArgAction;
use list::List;
use print::Print;
use renumber::Renumber;
use slv::Config;
use tracing::debug;

/// Configuration file picked up from the working directory.
const DEFAULT_CONFIG: &str = ".slv.toml";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a configuration file (default: ./.slv.toml, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = load_config(self.config.as_deref())?;
        self.command.run(config).await
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).is_file() => Path::new(DEFAULT_CONFIG),
        None => return Ok(Config::default()),
    };
    debug!(path = %path.display(), "loading configuration");
    Config::load(path).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List the directive points of a document
    List(List),

    /// Rewrite the numerals and prefixes of every directive point
    Renumber(Renumber),

    /// Compose the progressive print of a document
    ///
    /// For every point, the document is truncated after that point and
    /// duplicated once per requested copy and once per forwarding line.
    Print(Print),
}

impl Command {
    async fn run(self, config: Config) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(config).await,
            Self::Renumber(command) => command.run(config).await,
            Self::Print(command) => command.run(config).await,
        }
    }
}
