//! The in-memory directive document.
//!
//! The [`Verfuegung`] knows nothing about the document host. It keeps the
//! directive points in the order they were inserted and maintains their
//! ordinals.

use tracing::instrument;

use crate::domain::point::{Point, PointId};

/// An ordered collection of directive points ("Sachleitende Verfügung").
///
/// Points are kept in *storage order*: the order produced by the sequence of
/// inserts and deletes. Ordinals are reassigned from storage order after every
/// structural change, so they always form the dense sequence `1..=len`.
/// Callers never write ordinals directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verfuegung {
    points: Vec<Point>,
}

impl Verfuegung {
    /// Creates an empty directive document with room for `capacity` points.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Appends a new point.
    ///
    /// Equivalent to [`Verfuegung::insert_before`] without a successor.
    pub fn add_point(&mut self, id: PointId, heading: impl Into<String>) -> &mut Point {
        self.insert_before(id, None, heading)
    }

    /// Inserts a new point in front of the point `before`.
    ///
    /// - If `before` is the first point, the new point is prepended.
    /// - If `before` is any other point, the new point is placed immediately
    ///   in front of it.
    /// - If `before` is `None` or unknown, the new point is appended.
    ///
    /// # Panics
    ///
    /// Panics if a point with the same id already exists.
    #[instrument(level = "debug", skip(self, heading))]
    pub fn insert_before(
        &mut self,
        id: PointId,
        before: Option<PointId>,
        heading: impl Into<String>,
    ) -> &mut Point {
        assert!(
            self.position(id).is_none(),
            "Duplicate directive point id: {id}"
        );

        let index = before
            .and_then(|before| self.position(before))
            .unwrap_or(self.points.len());

        self.points.insert(index, Point::new(id, heading));
        self.renumber();

        &mut self.points[index]
    }

    /// Removes the point with the given id.
    ///
    /// Returns the removed point, or `None` if there was no such point.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_point(&mut self, id: PointId) -> Option<Point> {
        let index = self.position(id)?;
        let point = self.points.remove(index);
        self.renumber();
        Some(point)
    }

    /// Retrieves a point by id.
    #[must_use]
    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.points.iter().find(|point| point.id() == id)
    }

    /// Retrieves a point by id for modification of its heading, reproduction
    /// flag, binding or forwarding lines.
    pub fn point_mut(&mut self, id: PointId) -> Option<&mut Point> {
        self.points.iter_mut().find(|point| point.id() == id)
    }

    /// All points, sorted by ordinal.
    #[must_use]
    pub fn points(&self) -> Vec<&Point> {
        let mut points: Vec<&Point> = self.points.iter().collect();
        points.sort_by_key(|point| point.ordinal());
        points
    }

    /// The ids of all points, sorted by ordinal.
    #[must_use]
    pub fn ids(&self) -> Vec<PointId> {
        self.points().into_iter().map(Point::id).collect()
    }

    /// The number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the document has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The storage position of the point with the given id.
    #[must_use]
    pub fn position(&self, id: PointId) -> Option<usize> {
        self.points.iter().position(|point| point.id() == id)
    }

    /// Assigns ordinals `1, 2, 3, ...` in storage order.
    ///
    /// This deliberately ignores the previous ordinals.
    fn renumber(&mut self) {
        for (index, point) in self.points.iter_mut().enumerate() {
            point.ordinal = index + 1;
        }
    }
}
