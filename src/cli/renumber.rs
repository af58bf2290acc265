use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use slv::{Config, Session};
use tracing::instrument;

use super::{document, terminal::Colorize};

/// Command arguments for `slv renumber`.
#[derive(Debug, Parser)]
#[command(about = "Rewrite the numerals and prefixes of every directive point")]
pub struct Renumber {
    /// The document to renumber in place.
    file: PathBuf,

    /// Print the renumbered document instead of writing it back.
    #[arg(long)]
    stdout: bool,
}

impl Renumber {
    #[instrument(level = "debug", skip(self, config), fields(file = %self.file.display()))]
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        let host = document::read(&self.file)?;
        let session = Session::open(Arc::clone(&host), config).await?;

        session.renumber().await?;
        let points = session.snapshot().await.len();
        session.close().await?;

        if self.stdout {
            for paragraph in host.paragraphs() {
                println!("{paragraph}");
            }
        } else {
            document::write(&self.file, &host)?;
            let message = format!("Renumbered {points} point(s) in {}", self.file.display());
            eprintln!("{}", message.success());
        }
        Ok(())
    }
}
