use std::fmt;

use crate::host::{AnchorId, BindingId};

/// Stable identifier of a directive point.
///
/// This is the id of the point's anchor in the document host. It is assigned
/// by the host when the point is created and never changes afterwards.
pub type PointId = AnchorId;

/// One numbered clause ("Verfügungspunkt") of a directive document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    id: PointId,

    /// Dense, 1-based rank among the sibling points.
    ///
    /// Only the owning [`Verfuegung`](crate::Verfuegung) writes this.
    pub(crate) ordinal: usize,

    /// The heading, without its numeral prefix.
    pub heading: String,

    /// Whether the point is a reproduction ("Abdruck") of the earlier points.
    pub abdruck: bool,

    /// Live link between the point and the text of its anchor.
    pub binding: Option<BindingId>,

    /// Anchors of the forwarding lines ("Zuleitungszeilen") of this point.
    pub forwarding_lines: Vec<AnchorId>,
}

impl Point {
    pub(crate) fn new(id: PointId, heading: impl Into<String>) -> Self {
        Self {
            id,
            ordinal: 0,
            heading: heading.into(),
            abdruck: false,
            binding: None,
            forwarding_lines: Vec::new(),
        }
    }

    /// The stable identifier of the point.
    #[must_use]
    pub const fn id(&self) -> PointId {
        self.id
    }

    /// The 1-based rank of the point within its directive document.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The roman numeral for the current ordinal.
    #[must_use]
    pub fn roman_numeral(&self) -> String {
        super::numeral::roman(self.ordinal)
    }

    /// The full text of the point's heading as it appears in the document,
    /// including numeral and reproduction prefix.
    #[must_use]
    pub fn heading_text(&self) -> String {
        super::numeral::heading_text(self.ordinal, self.abdruck, &self.heading)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.heading_text())
    }
}
