//! Progressive disclosure printing.
//!
//! A directive document is printed as one combined document. For every point,
//! the live document is truncated to that point by hiding all later points,
//! duplicated the requested number of times (plus once per forwarding line)
//! into the target, and then revealed again.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    domain::{Point, PointId, Verfuegung},
    host::{DocumentHandle, DocumentHost, HostError},
    service::{DirectiveService, ServiceError},
};

/// Errors that abort a print run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrintError {
    /// Hiding or revealing a point failed.
    #[error("failed to change visibility of point {point}")]
    Visibility {
        /// The point being hidden or revealed.
        point: PointId,
        /// The underlying failure.
        #[source]
        source: ServiceError,
    },

    /// Creating, filling or showing the target document failed.
    #[error("failed to compose print document")]
    Compose(#[from] HostError),
}

/// Composes the progressive print of a directive document.
#[derive(Debug)]
pub struct PrintComposer<H> {
    service: DirectiveService<H>,
}

/// The position of the next duplicate within the whole print run.
#[derive(Debug, Default)]
struct Cursor {
    duplicates: usize,
}

impl<H: DocumentHost> PrintComposer<H> {
    /// Creates a composer that uses the given service to hide and reveal
    /// points.
    pub const fn new(service: DirectiveService<H>) -> Self {
        Self { service }
    }

    fn host(&self) -> &Arc<H> {
        self.service.host()
    }

    /// Prints a directive document.
    ///
    /// `copies[k - 1]` is the number of copies for the point with ordinal `k`;
    /// missing entries count as zero. Points without copies are skipped
    /// entirely. The target document is shown once every point has been
    /// processed.
    ///
    /// The visibility of the live document is restored after each point, also
    /// when that point fails. A failure aborts the run and the target is not
    /// shown.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while hiding, duplicating or revealing.
    #[instrument(skip_all, fields(points = verfuegung.len()))]
    pub async fn print(
        &self,
        verfuegung: &Verfuegung,
        copies: &[u32],
    ) -> Result<DocumentHandle, PrintError> {
        let target = self.host().new_document().await?;
        let mut cursor = Cursor::default();

        let points = verfuegung.points();
        for point in &points {
            let count = point
                .ordinal()
                .checked_sub(1)
                .and_then(|index| copies.get(index))
                .copied()
                .unwrap_or_default();
            if count == 0 {
                debug!(point = %point.id(), "no copies requested");
                continue;
            }

            let later: Vec<PointId> = points
                .iter()
                .filter(|other| other.ordinal() > point.ordinal())
                .map(|other| other.id())
                .collect();

            if let Err(error) = self
                .print_point(target, point, count, &later, &mut cursor)
                .await
            {
                warn!(point = %point.id(), %error, "print aborted");
                if let Err(release) = self.host().release_document(target).await {
                    warn!(%target, error = %release, "failed to release print document");
                }
                return Err(error);
            }
        }

        let shown = self.host().show(target).await;
        let released = self.host().release_document(target).await;
        shown?;
        released?;
        info!(duplicates = cursor.duplicates, "print document composed");

        Ok(target)
    }

    /// Hides `later`, duplicates the document for `point` and reveals `later`
    /// again. Revealing is attempted even if hiding or duplicating failed.
    async fn print_point(
        &self,
        target: DocumentHandle,
        point: &Point,
        count: u32,
        later: &[PointId],
        cursor: &mut Cursor,
    ) -> Result<(), PrintError> {
        let mut hidden = Vec::with_capacity(later.len());
        let mut outcome = Ok(());

        for id in later {
            if let Err(source) = self.service.hide_point(*id).await {
                outcome = Err(PrintError::Visibility { point: *id, source });
                break;
            }
            hidden.push(*id);
        }

        if outcome.is_ok() {
            outcome = self.duplicate(target, point, count, cursor).await;
        }

        for id in hidden {
            if let Err(source) = self.service.unhide_point(id).await {
                warn!(point = %id, error = %source, "failed to reveal point");
                if outcome.is_ok() {
                    outcome = Err(PrintError::Visibility { point: id, source });
                }
            }
        }

        outcome
    }

    async fn duplicate(
        &self,
        target: DocumentHandle,
        point: &Point,
        count: u32,
        cursor: &mut Cursor,
    ) -> Result<(), PrintError> {
        debug!(
            point = %point.id(),
            count,
            forwarding_lines = point.forwarding_lines.len(),
            "duplicating document"
        );

        let total = usize::try_from(count)
            .map_or(usize::MAX, |count| count.saturating_add(point.forwarding_lines.len()));
        for _ in 0..total {
            if cursor.duplicates > 0 {
                self.host().insert_page_break(target).await?;
            }
            self.host().copy_current_into(target).await?;
            cursor.duplicates += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Config,
        host::{memory::Block, AnchorId, AnchorSpec, MemoryHost, Tag},
    };

    const PARAGRAPHS: [&str; 6] = [
        "I.\tA",
        "Text A",
        "II.\tB",
        "Text B",
        "III.\tC",
        "Text C",
    ];

    struct Fixture {
        host: Arc<MemoryHost>,
        composer: PrintComposer<MemoryHost>,
        verfuegung: Verfuegung,
        ids: Vec<AnchorId>,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(MemoryHost::from_paragraphs(PARAGRAPHS));
        let mut verfuegung = Verfuegung::default();
        let ids: Vec<AnchorId> = [(0, "A"), (2, "B"), (4, "C")]
            .into_iter()
            .map(|(index, heading)| {
                let id = host
                    .anchor_paragraph(index, AnchorSpec::new(Tag::Point, "Verfügungspunkt"))
                    .unwrap();
                verfuegung.add_point(id, heading);
                id
            })
            .collect();
        let service = DirectiveService::new(Arc::clone(&host), Config::default());

        Fixture {
            host,
            composer: PrintComposer::new(service),
            verfuegung,
            ids,
        }
    }

    fn copy(paragraphs: &[&str]) -> Block {
        Block::Copy(paragraphs.iter().map(ToString::to_string).collect())
    }

    #[tokio::test]
    async fn composes_truncated_duplicates_in_ordinal_order() {
        let mut f = fixture();
        f.verfuegung
            .point_mut(f.ids[2])
            .unwrap()
            .forwarding_lines
            .push(AnchorId::new(1000));

        let target = f.composer.print(&f.verfuegung, &[2, 0, 1]).await.unwrap();

        let only_a = copy(&["I.\tA", "Text A"]);
        let everything = copy(&PARAGRAPHS);
        assert_eq!(
            f.host.document(target).unwrap(),
            vec![
                only_a.clone(),
                Block::PageBreak,
                only_a,
                Block::PageBreak,
                everything.clone(),
                Block::PageBreak,
                everything,
            ]
        );
        assert_eq!(f.host.shown_documents(), vec![target]);
    }

    #[tokio::test]
    async fn restores_visibility_and_releases_handles() {
        let f = fixture();

        f.composer.print(&f.verfuegung, &[1, 1, 1]).await.unwrap();

        assert!(f.host.hidden_paragraphs().is_empty());
        assert_eq!(f.host.open_handles(), 0);
    }

    #[tokio::test]
    async fn first_printed_duplicate_has_no_page_break() {
        let f = fixture();

        let target = f.composer.print(&f.verfuegung, &[0, 1, 1]).await.unwrap();

        assert_eq!(
            f.host.document(target).unwrap(),
            vec![
                copy(&["I.\tA", "Text A", "II.\tB", "Text B"]),
                Block::PageBreak,
                copy(&PARAGRAPHS),
            ]
        );
    }

    #[tokio::test]
    async fn missing_counts_print_nothing() {
        let f = fixture();
        let before = f.host.hidden_paragraphs();

        let target = f.composer.print(&f.verfuegung, &[]).await.unwrap();

        assert!(f.host.document(target).unwrap().is_empty());
        assert_eq!(f.host.shown_documents(), vec![target]);
        assert_eq!(f.host.hidden_paragraphs(), before);
    }

    #[tokio::test]
    async fn failed_copy_aborts_and_reveals() {
        let f = fixture();
        f.host.fail_copy_after(1);

        let error = f
            .composer
            .print(&f.verfuegung, &[2, 1, 1])
            .await
            .unwrap_err();

        assert!(matches!(error, PrintError::Compose(HostError::Unavailable(_))));
        assert!(f.host.hidden_paragraphs().is_empty());
        assert!(f.host.shown_documents().is_empty());
        assert_eq!(f.host.open_handles(), 0);

        let target = f.host.created_documents()[0];
        assert_eq!(
            f.host.document(target).unwrap(),
            vec![copy(&["I.\tA", "Text A"]), Block::PageBreak]
        );
    }

    #[tokio::test]
    async fn points_hidden_before_the_run_stay_hidden() {
        let f = fixture();
        f.composer.service.hide_point(f.ids[2]).await.unwrap();
        let before = f.host.hidden_paragraphs();
        assert_eq!(before, vec![4, 5]);

        let target = f.composer.print(&f.verfuegung, &[1, 0, 0]).await.unwrap();

        assert_eq!(f.host.hidden_paragraphs(), before);
        assert_eq!(
            f.host.document(target).unwrap(),
            vec![copy(&["I.\tA", "Text A"])]
        );
    }

    #[tokio::test]
    async fn failed_show_releases_the_document() {
        let f = fixture();
        f.host.fail_show();

        let error = f.composer.print(&f.verfuegung, &[1, 1, 1]).await.unwrap_err();

        assert!(matches!(error, PrintError::Compose(HostError::Unavailable(_))));
        assert!(f.host.shown_documents().is_empty());
        assert!(f.host.hidden_paragraphs().is_empty());
        assert_eq!(f.host.open_handles(), 0);
    }

    #[tokio::test]
    async fn failed_hide_reveals_what_was_hidden() {
        let mut f = fixture();
        // A point the host does not know cannot be hidden.
        f.verfuegung.add_point(AnchorId::new(999), "D");

        let error = f
            .composer
            .print(&f.verfuegung, &[1, 0, 0, 0])
            .await
            .unwrap_err();

        assert_eq!(
            error,
            PrintError::Visibility {
                point: AnchorId::new(999),
                source: ServiceError::Host(HostError::UnknownAnchor(AnchorId::new(999))),
            }
        );
        assert!(f.host.hidden_paragraphs().is_empty());
        assert!(f.host.shown_documents().is_empty());
    }

    #[tokio::test]
    async fn prints_a_snapshot_without_touching_the_model() {
        let f = fixture();
        let snapshot = f.verfuegung.clone();

        f.composer.print(&snapshot, &[1, 1, 1]).await.unwrap();

        assert_eq!(snapshot, f.verfuegung);
    }
}
