//! Plain-text directive documents.
//!
//! Every line is a paragraph. A line starting with a roman numeral and a dot
//! is a directive point; a line starting with `>` is a forwarding line of the
//! point before it.

use std::{
    path::Path,
    sync::{Arc, LazyLock},
};

use anyhow::Context;
use regex::Regex;
use slv::{
    host::{AnchorSpec, MemoryHost, Tag},
    service::{FORWARDING_LINE_TITLE, POINT_TITLE},
};
use tracing::debug;

static POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[IVXLCDM]+\.(?:\s|$)").expect("static regex"));

const FORWARDING_LINE: char = '>';

/// Builds an in-memory host holding the given text.
pub fn parse(text: &str) -> anyhow::Result<MemoryHost> {
    let host = MemoryHost::from_paragraphs(text.lines());

    for (index, line) in text.lines().enumerate() {
        let spec = if POINT.is_match(line) {
            AnchorSpec::new(Tag::Point, POINT_TITLE)
        } else if line.starts_with(FORWARDING_LINE) {
            AnchorSpec::new(Tag::ForwardingLine, FORWARDING_LINE_TITLE)
        } else {
            continue;
        };
        host.anchor_paragraph(index, spec)
            .with_context(|| format!("line {}", index + 1))?;
    }

    Ok(host)
}

/// Reads a document from disk.
pub fn read(path: &Path) -> anyhow::Result<Arc<MemoryHost>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let host = parse(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(path = %path.display(), ?host, "document loaded");
    Ok(Arc::new(host))
}

/// Writes the paragraphs of a host back to disk.
pub fn write(path: &Path, host: &MemoryHost) -> anyhow::Result<()> {
    let mut text = host.paragraphs().join("\n");
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use slv::host::DocumentHost;

    use super::*;

    const DOCUMENT: &str = "\
Az. 12/34
I. Vermerk
Text
II. Abdruck von I. Herrn X
> Herrn Y
> Frau Z
III.
Im Auftrag";

    #[tokio::test]
    async fn points_and_forwarding_lines_are_anchored() {
        let host = parse(DOCUMENT).unwrap();

        let tags: Vec<(Tag, String)> = host
            .all_anchors()
            .await
            .unwrap()
            .into_iter()
            .map(|anchor| (anchor.tag, anchor.text))
            .collect();

        assert_eq!(
            tags,
            vec![
                (Tag::Point, "I. Vermerk".to_string()),
                (Tag::Point, "II. Abdruck von I. Herrn X".to_string()),
                (Tag::ForwardingLine, "> Herrn Y".to_string()),
                (Tag::ForwardingLine, "> Frau Z".to_string()),
                (Tag::Point, "III.".to_string()),
            ]
        );
        assert_eq!(host.paragraphs().len(), 8);
    }

    #[tokio::test]
    async fn words_starting_with_numeral_letters_are_text() {
        let host = parse("Im Auftrag\nVI.Z.\nMit freundlichen Grüßen").unwrap();
        assert!(host.all_anchors().await.unwrap().is_empty());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verfuegung.txt");
        std::fs::write(&path, DOCUMENT).unwrap();

        let host = read(&path).unwrap();
        write(&path, &host).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), format!("{DOCUMENT}\n"));
    }
}
