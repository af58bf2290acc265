//! The per-document owner of a directive document.
//!
//! A [`Session`] keeps the [`Verfuegung`] of one live document behind an async
//! mutex. Every structural change, renumbering and print run holds that lock,
//! so they never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::{
    domain::{numeral, Config, PointId, Verfuegung},
    host::{DocumentHandle, DocumentHost, Tag},
    print::{PrintComposer, PrintError},
    service::{DirectiveService, ForwardingLine, PointWatch, ServiceError, Toggle},
};

/// Single writer for the directive document of one live document.
#[derive(Debug)]
pub struct Session<H> {
    service: DirectiveService<H>,
    composer: PrintComposer<H>,
    verfuegung: Mutex<Verfuegung>,
}

impl<H: DocumentHost> Session<H> {
    /// Opens a session on a live document.
    ///
    /// Every point anchor found in the document becomes a point in document
    /// order, with its heading read back from the anchor text, and is bound.
    /// Forwarding lines belong to the closest point before them.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the document cannot be read or a point
    /// cannot be bound.
    #[instrument(skip_all)]
    pub async fn open(host: Arc<H>, config: Config) -> Result<Self, ServiceError> {
        let service = DirectiveService::new(host, config);
        let anchors = service.host().all_anchors().await?;

        let mut verfuegung = Verfuegung::with_capacity(anchors.len());
        let mut current: Option<PointId> = None;
        for anchor in anchors {
            match anchor.tag {
                Tag::Point => {
                    let (heading, abdruck) = numeral::strip_heading(&anchor.text);
                    let binding = service.bind_point(anchor.id).await?;
                    let point = verfuegung.add_point(anchor.id, heading);
                    point.abdruck = abdruck;
                    point.binding = Some(binding);
                    current = Some(anchor.id);
                }
                Tag::ForwardingLine => {
                    match current.and_then(|id| verfuegung.point_mut(id)) {
                        Some(point) => point.forwarding_lines.push(anchor.id),
                        None => warn!(id = %anchor.id, "forwarding line before the first point"),
                    }
                }
                Tag::FirstPoint | Tag::Other(_) => {}
            }
        }
        info!(points = verfuegung.len(), "session opened");

        Ok(Self {
            composer: PrintComposer::new(service.clone()),
            service,
            verfuegung: Mutex::new(verfuegung),
        })
    }

    /// The directive service of this session.
    pub const fn service(&self) -> &DirectiveService<H> {
        &self.service
    }

    /// A snapshot of the directive document.
    pub async fn snapshot(&self) -> Verfuegung {
        self.verfuegung.lock().await.clone()
    }

    /// Creates a point at the cursor, or removes the point already there.
    ///
    /// Either way the document is renumbered afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first host failure. The model is only changed once the
    /// host change has succeeded.
    #[instrument(skip(self))]
    pub async fn toggle(&self, abdruck: bool) -> Result<Toggle, ServiceError> {
        let mut verfuegung = self.verfuegung.lock().await;
        let toggle = self.service.toggle_current_point(abdruck).await?;

        match &toggle {
            Toggle::Created {
                id,
                next_id,
                text,
                binding,
                abdruck,
            } => {
                let (heading, _) = numeral::strip_heading(text);
                let point = verfuegung.insert_before(*id, *next_id, heading);
                point.abdruck = *abdruck;
                point.binding = Some(*binding);
            }
            Toggle::Deleted { id, .. } => {
                let binding = verfuegung.point(*id).and_then(|point| point.binding);
                self.service.remove_point(*id, binding).await?;
                verfuegung.delete_point(*id);
            }
        }

        self.service.renumber_all(&verfuegung).await?;
        Ok(toggle)
    }

    /// Inserts a forwarding line into the point the cursor is in.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotInPoint`] if the cursor is not inside a
    /// point, or the host's error.
    pub async fn insert_forwarding_line(&self) -> Result<ForwardingLine, ServiceError> {
        let mut verfuegung = self.verfuegung.lock().await;
        let line = self.service.insert_forwarding_line().await?;

        match verfuegung.point_mut(line.point_id) {
            Some(point) => point.forwarding_lines.push(line.id),
            None => warn!(point = %line.point_id, "forwarding line added to an unknown point"),
        }
        Ok(line)
    }

    /// Writes numeral, prefix and heading of every point to the document.
    ///
    /// # Errors
    ///
    /// Returns the first host failure.
    pub async fn renumber(&self) -> Result<(), ServiceError> {
        let verfuegung = self.verfuegung.lock().await;
        self.service.renumber_all(&verfuegung).await
    }

    /// Reads the heading of a point back from the document, after the user
    /// edited it.
    ///
    /// Returns the new heading, or `None` if the point is unknown.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the text cannot be read.
    pub async fn refresh_heading(&self, id: PointId) -> Result<Option<String>, ServiceError> {
        let mut verfuegung = self.verfuegung.lock().await;
        let Some(point) = verfuegung.point_mut(id) else {
            return Ok(None);
        };

        let text = self.service.point_text(id).await?;
        let (heading, _) = numeral::strip_heading(&text);
        debug!(%id, %heading, "heading refreshed");
        point.heading.clone_from(&heading);
        Ok(Some(heading))
    }

    /// Subscribes to text changes of a point.
    ///
    /// Returns `None` if the point is unknown or not bound.
    ///
    /// # Errors
    ///
    /// Returns the host's error if the subscription fails.
    pub async fn watch(&self, id: PointId) -> Result<Option<PointWatch<H>>, ServiceError> {
        let verfuegung = self.verfuegung.lock().await;
        match verfuegung.point(id) {
            Some(point) => self.service.watch_point(point).await,
            None => Ok(None),
        }
    }

    /// Prints the directive document.
    ///
    /// The document cannot be changed through this session while the print is
    /// running.
    ///
    /// # Errors
    ///
    /// See [`PrintComposer::print`].
    pub async fn print(&self, copies: &[u32]) -> Result<DocumentHandle, PrintError> {
        let verfuegung = self.verfuegung.lock().await;
        self.composer.print(&verfuegung, copies).await
    }

    /// Closes the session, removing the binding of every point.
    ///
    /// # Errors
    ///
    /// Returns the first host failure; later bindings are still removed.
    pub async fn close(self) -> Result<(), ServiceError> {
        let verfuegung = self.verfuegung.into_inner();
        let mut result = Ok(());
        for binding in verfuegung.points().into_iter().filter_map(|point| point.binding) {
            if let Err(error) = self.service.host().unbind(binding).await {
                warn!(%binding, %error, "failed to remove binding");
                if result.is_ok() {
                    result = Err(error.into());
                }
            }
        }
        result
    }
}
