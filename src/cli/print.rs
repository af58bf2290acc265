use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use slv::{Config, Session, host::memory::Block};
use tracing::instrument;

use super::{document, terminal::Colorize};

/// Separates pages when the composed document is written to a file.
const FORM_FEED: &str = "\u{c}";

/// Command arguments for `slv print`.
#[derive(Debug, Parser)]
#[command(about = "Compose the progressive print of a document")]
pub struct Print {
    /// The document to print.
    file: PathBuf,

    /// Copies per point in ordinal order (comma-separated).
    ///
    /// Points without a count get the configured default.
    #[arg(long, value_delimiter = ',', value_name = "N")]
    copies: Vec<u32>,

    /// Write the composed document to a file instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Print {
    #[instrument(level = "debug", skip(self, config), fields(file = %self.file.display()))]
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        let host = document::read(&self.file)?;
        let session = Session::open(Arc::clone(&host), config).await?;

        let points = session.snapshot().await.len();
        let copies = session.service().config().copies_for(points, &self.copies);
        let target = session.print(&copies).await?;
        session.close().await?;

        let blocks = host
            .document(target)
            .context("the print document has disappeared")?;
        let pages = blocks
            .iter()
            .filter(|block| matches!(block, Block::Copy(_)))
            .count();

        if let Some(output) = &self.output {
            std::fs::write(output, render(&blocks, FORM_FEED))
                .with_context(|| format!("failed to write {}", output.display()))?;
        } else {
            print!("{}", render(&blocks, &"──── page break ────".dim()));
        }

        let message = format!("Composed {pages} copies for {points} point(s)");
        eprintln!("{}", message.success());
        Ok(())
    }
}

fn render(blocks: &[Block], page_break: &str) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            Block::PageBreak => push_line(&mut out, page_break),
            Block::Copy(paragraphs) => {
                for paragraph in paragraphs {
                    push_line(&mut out, paragraph);
                }
            }
        }
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_separated_by_the_page_break() {
        let blocks = vec![
            Block::Copy(vec!["I. A".to_string()]),
            Block::PageBreak,
            Block::Copy(vec!["I. A".to_string(), "II. B".to_string()]),
        ];

        assert_eq!(render(&blocks, FORM_FEED), "I. A\n\u{c}\nI. A\nII. B\n");
    }

    #[tokio::test]
    async fn composes_pages_from_a_text_document() {
        let host = Arc::new(
            document::parse("I. Vermerk\nText\nII. Herrn X\n> Frau Y\nIII. z.d.A.").unwrap(),
        );
        let session = Session::open(Arc::clone(&host), Config::default()).await.unwrap();

        let target = session.print(&[1, 1, 0]).await.unwrap();

        assert_eq!(
            render(&host.document(target).unwrap(), "--"),
            "I. Vermerk\nText\n--\n\
             I. Vermerk\nText\nII. Herrn X\n> Frau Y\n--\n\
             I. Vermerk\nText\nII. Herrn X\n> Frau Y\n"
        );
    }
}
