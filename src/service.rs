//! Directive points as they live in the document host.
//!
//! The [`DirectiveService`] translates between directive points and tagged
//! anchors in the live document: it finds the point at the cursor, creates and
//! removes point anchors, reads and writes their headings, hides the content
//! of a point and binds points to change notifications.

use std::{future::Future, sync::Arc};

use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::{
    domain::{numeral, Config, Point, PointId, Verfuegung},
    host::{
        Anchor, AnchorId, AnchorSpec, BindingId, DocumentHost, HostError, RangeHandle, Tag,
    },
};

mod watch;
pub use watch::PointWatch;

/// Title of point anchors as shown by the host.
pub const POINT_TITLE: &str = "Verfügungspunkt";

/// Title of forwarding-line anchors as shown by the host.
pub const FORWARDING_LINE_TITLE: &str = "Zuleitungszeile";

/// Errors returned by the directive service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The document host failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The operation needs the cursor to be inside a directive point.
    #[error("cursor is not inside a directive point")]
    NotInPoint,
}

/// Result of toggling the directive point at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// A new point anchor was created around the current paragraph.
    Created {
        /// The new anchor.
        id: PointId,
        /// The next point in document order, if any.
        next_id: Option<PointId>,
        /// The text of the new point.
        text: String,
        /// The binding of the new point.
        binding: BindingId,
        /// Whether the new point is a reproduction.
        abdruck: bool,
    },
    /// The cursor is on an existing point, which the caller should remove.
    Deleted {
        /// The existing anchor.
        id: PointId,
        /// Its text.
        text: String,
    },
}

/// Result of toggling the first-point marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerToggle {
    /// The marker anchor.
    pub id: AnchorId,
    /// `true` if the marker text was cleared.
    pub deleted: bool,
}

/// A newly inserted forwarding line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingLine {
    /// The forwarding line's anchor.
    pub id: AnchorId,
    /// The point the forwarding line belongs to.
    pub point_id: PointId,
}

/// A point anchor or first-point marker found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPoint {
    /// The anchor id.
    pub id: AnchorId,
    /// The anchor text.
    pub text: String,
    /// Whether this is the first-point marker rather than a point anchor.
    pub first_point: bool,
}

/// Reads and writes directive points in a document host.
#[derive(Debug)]
pub struct DirectiveService<H> {
    host: Arc<H>,
    config: Config,
}

impl<H> Clone for DirectiveService<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            config: self.config.clone(),
        }
    }
}

impl<H: DocumentHost> DirectiveService<H> {
    /// Creates a service working on the given host.
    pub const fn new(host: Arc<H>, config: Config) -> Self {
        Self { host, config }
    }

    /// The document host.
    pub const fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// The configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Runs `f` on an acquired range and releases the range afterwards,
    /// whether `f` succeeded or not.
    async fn with_range<T, F, Fut>(&self, range: RangeHandle, f: F) -> Result<T, HostError>
    where
        F: FnOnce(RangeHandle) -> Fut,
        Fut: Future<Output = Result<T, HostError>>,
    {
        let result = f(range).await;
        let released = self.host.release_range(range).await;
        let value = result?;
        released?;
        Ok(value)
    }

    /// Every point anchor and first-point marker in document order.
    ///
    /// # Errors
    ///
    /// Returns the host's error.
    pub async fn points_in_document(&self) -> Result<Vec<DocumentPoint>, ServiceError> {
        Ok(self
            .host
            .all_anchors()
            .await?
            .into_iter()
            .filter(|anchor| matches!(anchor.tag, Tag::Point | Tag::FirstPoint))
            .map(|anchor| DocumentPoint {
                first_point: anchor.tag == Tag::FirstPoint,
                id: anchor.id,
                text: anchor.text,
            })
            .collect())
    }

    /// The point anchor in the paragraph the cursor is in.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the paragraph cannot be inspected.
    #[instrument(skip(self))]
    pub async fn find_current_point(&self) -> Result<Option<Anchor>, ServiceError> {
        let range = self.host.expand_to_paragraph().await?;
        let anchors = self
            .with_range(range, |range| self.host.anchors_in_range(range))
            .await?;

        Ok(anchors.into_iter().find(|anchor| anchor.tag == Tag::Point))
    }

    /// Creates a point at the cursor, or reports the point already there.
    ///
    /// Deletion is only reported; removing the anchor from the host and the
    /// point from the directive document is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the anchor cannot be created or bound.
    #[instrument(skip(self))]
    pub async fn toggle_current_point(&self, abdruck: bool) -> Result<Toggle, ServiceError> {
        if let Some(anchor) = self.find_current_point().await? {
            return Ok(Toggle::Deleted {
                id: anchor.id,
                text: anchor.text,
            });
        }

        let spec = AnchorSpec::new(Tag::Point, POINT_TITLE)
            .with_style(self.config.point_style())
            .with_abdruck(abdruck);
        let id = self.host.wrap_paragraph(spec).await?;
        let binding = self.bind_point(id).await?;
        let text = self.host.anchor_text(id).await?;
        let next_id = self.next_point(Some(id)).await?;
        debug!(%id, ?next_id, "created directive point");

        Ok(Toggle::Created {
            id,
            next_id,
            text,
            binding,
            abdruck,
        })
    }

    /// Inserts the first-point marker at the cursor.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the anchor cannot be inserted.
    pub async fn insert_first_point_marker(&self) -> Result<AnchorId, ServiceError> {
        Ok(self
            .host
            .insert_anchor(AnchorSpec::new(Tag::FirstPoint, ""))
            .await?)
    }

    /// Switches the text of the first-point marker on or off.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the marker is unknown.
    #[instrument(skip(self))]
    pub async fn toggle_first_point_marker(
        &self,
        id: AnchorId,
    ) -> Result<MarkerToggle, ServiceError> {
        let text = self.host.anchor_text(id).await?;
        let deleted = !text.is_empty();
        let replacement = if deleted {
            ""
        } else {
            self.config.first_point_placeholder()
        };
        self.host.set_anchor_text(id, replacement).await?;

        Ok(MarkerToggle { id, deleted })
    }

    /// Whether a point created at the cursor would be the first one.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the cursor is outside the document.
    pub async fn is_first_point(&self) -> Result<bool, ServiceError> {
        Ok(self.previous_point().await?.is_none())
    }

    /// Inserts a forwarding line into the point the cursor is in.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotInPoint`], without touching the document,
    /// if no point precedes the cursor.
    #[instrument(skip(self))]
    pub async fn insert_forwarding_line(&self) -> Result<ForwardingLine, ServiceError> {
        let point_id = self.previous_point().await?.ok_or(ServiceError::NotInPoint)?;
        let id = self
            .host
            .insert_anchor(AnchorSpec::new(Tag::ForwardingLine, FORWARDING_LINE_TITLE))
            .await?;

        Ok(ForwardingLine { id, point_id })
    }

    /// The text of a point anchor.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the anchor is unknown.
    pub async fn point_text(&self, id: PointId) -> Result<String, ServiceError> {
        Ok(self.host.anchor_text(id).await?)
    }

    /// Replaces the text of a point anchor.
    ///
    /// With a numeral the text written is `"{numeral}.\t{text}"`, otherwise
    /// just the text. Either way it is trimmed.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the anchor is unknown.
    pub async fn update_point_text(
        &self,
        id: PointId,
        text: &str,
        numeral: Option<&str>,
    ) -> Result<(), ServiceError> {
        let text = numeral::numbered(numeral, text);
        self.host.set_anchor_text(id, &text).await?;
        Ok(())
    }

    /// The ids of all point anchors in document order.
    ///
    /// # Errors
    ///
    /// Returns the host's error.
    pub async fn all_point_ids(&self) -> Result<Vec<PointId>, ServiceError> {
        Ok(self
            .host
            .all_anchors()
            .await?
            .into_iter()
            .filter(|anchor| anchor.tag == Tag::Point)
            .map(|anchor| anchor.id)
            .collect())
    }

    /// The closest point at or before the cursor.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the cursor is outside the document.
    pub async fn previous_point(&self) -> Result<Option<PointId>, ServiceError> {
        Ok(self.host.previous_anchor(&Tag::Point).await?)
    }

    /// The next point after `from`, or after the cursor if `from` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the host's error if `from` is unknown.
    pub async fn next_point(&self, from: Option<PointId>) -> Result<Option<PointId>, ServiceError> {
        Ok(self
            .host
            .next_anchors(from)
            .await?
            .into_iter()
            .find(|anchor| anchor.tag == Tag::Point)
            .map(|anchor| anchor.id))
    }

    /// Writes numeral, prefix and heading of every point to the document.
    ///
    /// The writes are issued together and complete in no particular order;
    /// this returns once all of them have finished, or with the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error of any write.
    #[instrument(skip_all, fields(points = verfuegung.len()))]
    pub async fn renumber_all(&self, verfuegung: &Verfuegung) -> Result<(), ServiceError> {
        let updates = verfuegung.points().into_iter().map(|point| {
            let numeral = point.roman_numeral();
            let body = format!(
                "{} {}",
                numeral::prefix(point.ordinal(), point.abdruck),
                point.heading
            );
            async move {
                self.update_point_text(point.id(), body.trim(), Some(&numeral))
                    .await
            }
        });

        try_join_all(updates).await?;
        Ok(())
    }

    /// Removes a point anchor, tearing down its binding first.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the binding or the anchor is unknown.
    #[instrument(skip(self))]
    pub async fn remove_point(
        &self,
        id: PointId,
        binding: Option<BindingId>,
    ) -> Result<(), ServiceError> {
        if let Some(binding) = binding {
            self.host.unbind(binding).await?;
        }
        self.host.delete_anchor(id).await?;
        Ok(())
    }

    /// Hides a point and everything up to the next point.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the point is unknown.
    #[instrument(level = "debug", skip(self))]
    pub async fn hide_point(&self, id: PointId) -> Result<(), ServiceError> {
        let range = self.point_range(id).await?;
        self.with_range(range, |range| self.host.hide(range)).await?;
        Ok(())
    }

    /// Makes a hidden point visible again.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the point is unknown.
    #[instrument(level = "debug", skip(self))]
    pub async fn unhide_point(&self, id: PointId) -> Result<(), ServiceError> {
        let range = self.point_range(id).await?;
        self.with_range(range, |range| self.host.unhide(range))
            .await?;
        Ok(())
    }

    async fn point_range(&self, id: PointId) -> Result<RangeHandle, ServiceError> {
        let next = self.next_point(Some(id)).await?;
        Ok(self.host.range_between(id, next).await?)
    }

    /// Binds the text of a point anchor.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the point is unknown.
    pub async fn bind_point(&self, id: PointId) -> Result<BindingId, ServiceError> {
        Ok(self.host.bind(id, &Tag::Point).await?)
    }

    /// Subscribes to text changes of a point.
    ///
    /// Returns `None` if the point has no binding.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the subscription fails.
    pub async fn watch_point(&self, point: &Point) -> Result<Option<PointWatch<H>>, ServiceError> {
        let Some(binding) = point.binding else {
            return Ok(None);
        };
        let watch = PointWatch::establish(Arc::clone(&self.host), binding).await?;
        Ok(Some(watch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    const PARAGRAPHS: [&str; 7] = [
        "Briefkopf",
        "I.\tVermerk",
        "Text A",
        "II.\tAbdruck von I. Herrn X",
        "Text B",
        "III.\tWV",
        "Text C",
    ];

    struct Fixture {
        host: Arc<MemoryHost>,
        service: DirectiveService<MemoryHost>,
        points: Vec<PointId>,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(MemoryHost::from_paragraphs(PARAGRAPHS));
        let points = [1, 3, 5]
            .into_iter()
            .map(|index| {
                host.anchor_paragraph(index, AnchorSpec::new(Tag::Point, POINT_TITLE))
                    .unwrap()
            })
            .collect();
        let service = DirectiveService::new(Arc::clone(&host), Config::default());
        Fixture {
            host,
            service,
            points,
        }
    }

    #[tokio::test]
    async fn find_current_point_releases_its_range() {
        let f = fixture();

        f.host.set_cursor(3);
        let anchor = f.service.find_current_point().await.unwrap().unwrap();
        assert_eq!(anchor.id, f.points[1]);
        assert_eq!(anchor.text, "II.\tAbdruck von I. Herrn X");
        assert_eq!(f.host.open_handles(), 0);

        f.host.set_cursor(2);
        assert!(f.service.find_current_point().await.unwrap().is_none());
        assert_eq!(f.host.open_handles(), 0);
    }

    #[tokio::test]
    async fn with_range_releases_on_error() {
        let f = fixture();
        let range = f.host.expand_to_paragraph().await.unwrap();

        let result: Result<(), HostError> = f
            .service
            .with_range(range, |_| async { Err(HostError::Unavailable("boom".into())) })
            .await;

        assert_eq!(result, Err(HostError::Unavailable("boom".into())));
        assert_eq!(f.host.open_handles(), 0);
    }

    #[tokio::test]
    async fn toggle_creates_then_deletes() {
        let f = fixture();
        f.host.set_cursor(2);

        let Toggle::Created {
            id,
            next_id,
            text,
            abdruck,
            ..
        } = f.service.toggle_current_point(true).await.unwrap()
        else {
            panic!("expected a new point");
        };
        assert_eq!(next_id, Some(f.points[1]));
        assert_eq!(text, "Text A");
        assert!(abdruck);
        assert_eq!(f.host.binding_count(), 1);

        let spec = f.host.anchor_spec(id).unwrap();
        assert_eq!(spec.style.as_deref(), Some("FormboxVerfuegungspunkt"));
        assert!(spec.abdruck);

        let second = f.service.toggle_current_point(false).await.unwrap();
        assert_eq!(
            second,
            Toggle::Deleted {
                id,
                text: "Text A".to_string()
            }
        );
        assert_eq!(f.host.open_handles(), 0);
    }

    #[tokio::test]
    async fn toggle_after_last_point_has_no_successor() {
        let f = fixture();
        f.host.set_cursor(6);

        let Toggle::Created { next_id, .. } = f.service.toggle_current_point(false).await.unwrap()
        else {
            panic!("expected a new point");
        };
        assert_eq!(next_id, None);
    }

    #[tokio::test]
    async fn first_point_marker_toggles_placeholder() {
        let f = fixture();
        f.host.set_cursor(0);
        let marker = f.service.insert_first_point_marker().await.unwrap();

        let on = f.service.toggle_first_point_marker(marker).await.unwrap();
        assert!(!on.deleted);
        assert_eq!(f.service.point_text(marker).await.unwrap(), "I.");

        let off = f.service.toggle_first_point_marker(marker).await.unwrap();
        assert!(off.deleted);
        assert_eq!(f.service.point_text(marker).await.unwrap(), "");

        let listed = f.service.points_in_document().await.unwrap();
        assert_eq!(listed.len(), 4);
        assert!(listed[0].first_point);
        assert!(listed[1..].iter().all(|point| !point.first_point));
    }

    #[tokio::test]
    async fn first_point_depends_on_cursor() {
        let f = fixture();
        f.host.set_cursor(0);
        assert!(f.service.is_first_point().await.unwrap());
        f.host.set_cursor(2);
        assert!(!f.service.is_first_point().await.unwrap());
    }

    #[tokio::test]
    async fn forwarding_line_outside_point_is_rejected_without_mutation() {
        let f = fixture();
        f.host.set_cursor(0);
        let before = f.host.mutation_count();

        assert_eq!(
            f.service.insert_forwarding_line().await,
            Err(ServiceError::NotInPoint)
        );
        assert_eq!(f.host.mutation_count(), before);
        assert_eq!(f.host.paragraphs().len(), PARAGRAPHS.len());
    }

    #[tokio::test]
    async fn forwarding_line_belongs_to_enclosing_point() {
        let f = fixture();
        f.host.set_cursor(4);

        let line = f.service.insert_forwarding_line().await.unwrap();
        assert_eq!(line.point_id, f.points[1]);
        assert_eq!(f.host.paragraphs().len(), PARAGRAPHS.len() + 1);
    }

    #[tokio::test]
    async fn point_text_is_numbered_and_trimmed() {
        let f = fixture();
        f.service
            .update_point_text(f.points[0], " Vermerk ", Some("IV"))
            .await
            .unwrap();
        assert_eq!(
            f.service.point_text(f.points[0]).await.unwrap(),
            "IV.\t Vermerk"
        );

        f.service
            .update_point_text(f.points[0], " Vermerk ", None)
            .await
            .unwrap();
        assert_eq!(f.service.point_text(f.points[0]).await.unwrap(), "Vermerk");
    }

    #[tokio::test]
    async fn ordering_queries_follow_document_order() {
        let f = fixture();
        assert_eq!(f.service.all_point_ids().await.unwrap(), f.points);

        f.host.set_cursor(4);
        assert_eq!(f.service.previous_point().await.unwrap(), Some(f.points[1]));
        assert_eq!(f.service.next_point(None).await.unwrap(), Some(f.points[2]));
        assert_eq!(
            f.service.next_point(Some(f.points[0])).await.unwrap(),
            Some(f.points[1])
        );
        assert_eq!(f.service.next_point(Some(f.points[2])).await.unwrap(), None);
    }

    #[tokio::test]
    async fn renumber_all_writes_every_heading() {
        let f = fixture();
        let mut verfuegung = Verfuegung::default();
        verfuegung.add_point(f.points[0], "Vermerk");
        verfuegung.add_point(f.points[2], "WV");
        verfuegung
            .insert_before(f.points[1], Some(f.points[2]), "Herrn X")
            .abdruck = true;

        f.service.renumber_all(&verfuegung).await.unwrap();

        let paragraphs = f.host.paragraphs();
        assert_eq!(paragraphs[1], "I.\tVermerk");
        assert_eq!(paragraphs[3], "II.\tAbdruck von I. Herrn X");
        assert_eq!(paragraphs[5], "III.\tWV");
    }

    #[tokio::test]
    async fn renumber_all_reports_host_failures() {
        let f = fixture();
        let mut verfuegung = Verfuegung::default();
        verfuegung.add_point(f.points[0], "Vermerk");
        verfuegung.add_point(AnchorId::new(999), "Gone");

        assert_eq!(
            f.service.renumber_all(&verfuegung).await,
            Err(ServiceError::Host(HostError::UnknownAnchor(AnchorId::new(
                999
            ))))
        );
    }

    #[tokio::test]
    async fn remove_point_unbinds_first() {
        let f = fixture();
        let binding = f.service.bind_point(f.points[1]).await.unwrap();

        f.service
            .remove_point(f.points[1], Some(binding))
            .await
            .unwrap();

        assert_eq!(f.host.binding_count(), 0);
        assert_eq!(
            f.service.all_point_ids().await.unwrap(),
            vec![f.points[0], f.points[2]]
        );
    }

    #[tokio::test]
    async fn hide_and_unhide_point_content() {
        let f = fixture();

        f.service.hide_point(f.points[1]).await.unwrap();
        assert_eq!(f.host.hidden_paragraphs(), vec![3, 4]);

        f.service.hide_point(f.points[2]).await.unwrap();
        assert_eq!(f.host.hidden_paragraphs(), vec![3, 4, 5, 6]);

        f.service.unhide_point(f.points[1]).await.unwrap();
        f.service.unhide_point(f.points[2]).await.unwrap();
        assert!(f.host.hidden_paragraphs().is_empty());
        assert_eq!(f.host.open_handles(), 0);
    }

    #[tokio::test]
    async fn watch_requires_binding() {
        let f = fixture();
        let mut verfuegung = Verfuegung::default();
        let point = verfuegung.add_point(f.points[0], "Vermerk");

        assert!(f.service.watch_point(point).await.unwrap().is_none());

        point.binding = Some(f.service.bind_point(f.points[0]).await.unwrap());
        let watch = f.service.watch_point(point).await.unwrap().unwrap();
        assert_eq!(f.host.subscription_count(), 1);

        f.service
            .update_point_text(f.points[0], "Neu", Some("I"))
            .await
            .unwrap();
        assert_eq!(watch.latest().as_deref(), Some("I.\tNeu"));

        watch.unsubscribe().await.unwrap();
        assert_eq!(f.host.subscription_count(), 0);
    }
}
