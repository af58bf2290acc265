use std::path::PathBuf;

use clap::Parser;
use slv::{Config, Session};
use tracing::instrument;

use super::{document, terminal::Colorize};

/// Command arguments for `slv list`.
#[derive(Debug, Parser)]
#[command(about = "List the directive points of a document")]
pub struct List {
    /// The document to read.
    file: PathBuf,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,
}

impl List {
    #[instrument(level = "debug", skip(self, config), fields(file = %self.file.display()))]
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        let host = document::read(&self.file)?;
        let session = Session::open(host, config).await?;
        let verfuegung = session.snapshot().await;

        if verfuegung.is_empty() {
            if !self.quiet {
                println!("No directive points found.");
            }
            return session.close().await.map_err(Into::into);
        }

        if !self.quiet {
            println!("     #  KIND      LINES  HEADING");
        }

        for point in verfuegung.points() {
            let numeral = format!("{}.", point.roman_numeral());
            let kind = if point.abdruck { "abdruck" } else { "primary" };
            let lines = point.forwarding_lines.len();

            if self.quiet {
                println!("{numeral}\t{kind}\t{lines}\t{}", point.heading);
            } else {
                let kind = if point.abdruck {
                    format!("{kind:<8}").warning()
                } else {
                    format!("{kind:<8}")
                };
                println!(
                    "{}  {kind}  {lines:>5}  {}",
                    format!("{numeral:>6}").info(),
                    point.heading_text()
                );
            }
        }

        session.close().await?;
        Ok(())
    }
}
