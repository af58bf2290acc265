//! The document host: the component that owns the live document.
//!
//! The host stores paragraphs and content anchors and exposes primitives to
//! hide ranges, bind anchors and duplicate the document. Everything the
//! directive service needs from it is described by the [`DocumentHost`]
//! trait. [`MemoryHost`] is a complete in-memory implementation.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

pub mod memory;
pub use memory::MemoryHost;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw host handle.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// The raw host handle.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle!(
    /// Identifier of a content anchor in the live document.
    AnchorId
);
handle!(
    /// A transient range of the live document. Must be released.
    RangeHandle
);
handle!(
    /// A live link between an anchor and its text.
    BindingId
);
handle!(
    /// A registered change callback on a binding.
    SubscriptionId
);
handle!(
    /// A document created by the host, e.g. the print target. Must be released.
    DocumentHandle
);

/// The role of an anchor in a directive document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Marks the start of a directive point (the primary anchor).
    Point,
    /// The special field holding only the numeral of the first point.
    FirstPoint,
    /// A forwarding line ("Zuleitungszeile") inside a point.
    ForwardingLine,
    /// Any anchor not managed by this crate.
    Other(String),
}

impl Tag {
    /// The tag as stored in the document.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Point => "SLV",
            Self::FirstPoint => "SLVVerfuegungspunkt1",
            Self::ForwardingLine => "SLVZuleitung",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        match tag {
            "SLV" => Self::Point,
            "SLVVerfuegungspunkt1" => Self::FirstPoint,
            "SLVZuleitung" => Self::ForwardingLine,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An anchor as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// The anchor id.
    pub id: AnchorId,
    /// The anchor's role.
    pub tag: Tag,
    /// The anchor's current text.
    pub text: String,
}

/// Everything needed to create a new anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    /// The anchor's role.
    pub tag: Tag,
    /// Title shown by the host for the anchor.
    pub title: String,
    /// Paragraph style applied to the anchored content, if any.
    pub style: Option<String>,
    /// Initial text. Empty keeps whatever text is already there.
    pub text: String,
    /// Whether the anchored content is a reproduction ("Abdruck").
    pub abdruck: bool,
}

impl AnchorSpec {
    /// A spec with the given tag and title and no style or text.
    #[must_use]
    pub fn new(tag: Tag, title: impl Into<String>) -> Self {
        Self {
            tag,
            title: title.into(),
            style: None,
            text: String::new(),
            abdruck: false,
        }
    }

    /// Sets the paragraph style.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Sets the reproduction flag.
    #[must_use]
    pub const fn with_abdruck(mut self, abdruck: bool) -> Self {
        self.abdruck = abdruck;
        self
    }
}

/// Callback invoked with the new text whenever a bound anchor changes.
pub type ChangeCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Errors reported by a document host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// No anchor with this id exists.
    #[error("anchor {0} not found")]
    UnknownAnchor(AnchorId),

    /// The range handle was never issued or has already been released.
    #[error("range {0} is not tracked")]
    UnknownRange(RangeHandle),

    /// The binding was never created or has already been removed.
    #[error("binding {0} not found")]
    UnknownBinding(BindingId),

    /// The document handle was never issued or has already been released.
    #[error("document {0} is not tracked")]
    UnknownDocument(DocumentHandle),

    /// The anchor cannot be deleted while a binding still references it.
    #[error("anchor {0} is still bound")]
    AnchorBound(AnchorId),

    /// The host could not carry out the request.
    #[error("document host unavailable: {0}")]
    Unavailable(String),
}

/// The capability set consumed from the document host.
///
/// Every call is a suspension point and reports failures as [`HostError`].
/// Range and document handles returned by the host must be released by the
/// caller.
#[allow(clippy::missing_errors_doc)]
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// Creates an anchor around the paragraph the cursor is in.
    async fn wrap_paragraph(&self, spec: AnchorSpec) -> Result<AnchorId, HostError>;

    /// Creates an anchor at the cursor.
    async fn insert_anchor(&self, spec: AnchorSpec) -> Result<AnchorId, HostError>;

    /// Deletes an anchor. The anchored text stays in the document.
    async fn delete_anchor(&self, id: AnchorId) -> Result<(), HostError>;

    /// The text of an anchor.
    async fn anchor_text(&self, id: AnchorId) -> Result<String, HostError>;

    /// Replaces the text of an anchor.
    async fn set_anchor_text(&self, id: AnchorId, text: &str) -> Result<(), HostError>;

    /// All anchors in document order.
    async fn all_anchors(&self) -> Result<Vec<Anchor>, HostError>;

    /// The anchors intersecting a range, in document order.
    async fn anchors_in_range(&self, range: RangeHandle) -> Result<Vec<Anchor>, HostError>;

    /// The anchors following `from` in document order, or following the
    /// cursor when `from` is `None`.
    async fn next_anchors(&self, from: Option<AnchorId>) -> Result<Vec<Anchor>, HostError>;

    /// The closest anchor with the given tag at or before the cursor.
    async fn previous_anchor(&self, tag: &Tag) -> Result<Option<AnchorId>, HostError>;

    /// The range of the paragraph the cursor is in.
    async fn expand_to_paragraph(&self) -> Result<RangeHandle, HostError>;

    /// The half-open range from anchor `start` up to anchor `end`, or up to
    /// the end of the document when `end` is `None`.
    async fn range_between(
        &self,
        start: AnchorId,
        end: Option<AnchorId>,
    ) -> Result<RangeHandle, HostError>;

    /// Frees a range handle.
    async fn release_range(&self, range: RangeHandle) -> Result<(), HostError>;

    /// Hides the content of a range.
    ///
    /// Hiding nests: content hidden twice needs two [`DocumentHost::unhide`]
    /// calls before it is visible again.
    async fn hide(&self, range: RangeHandle) -> Result<(), HostError>;

    /// Makes the content of a range visible again.
    async fn unhide(&self, range: RangeHandle) -> Result<(), HostError>;

    /// Binds the text of an anchor.
    async fn bind(&self, id: AnchorId, tag: &Tag) -> Result<BindingId, HostError>;

    /// Registers a callback fired on every text change of a binding.
    async fn subscribe(
        &self,
        binding: BindingId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionId, HostError>;

    /// Removes a callback registered with [`DocumentHost::subscribe`].
    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), HostError>;

    /// Removes a binding and all of its callbacks.
    async fn unbind(&self, binding: BindingId) -> Result<(), HostError>;

    /// Creates a new, empty document.
    async fn new_document(&self) -> Result<DocumentHandle, HostError>;

    /// Appends a page break to a document.
    async fn insert_page_break(&self, document: DocumentHandle) -> Result<(), HostError>;

    /// Appends a copy of the visible content of the live document.
    async fn copy_current_into(&self, document: DocumentHandle) -> Result<(), HostError>;

    /// Presents a document to the user.
    async fn show(&self, document: DocumentHandle) -> Result<(), HostError>;

    /// Frees a document handle.
    async fn release_document(&self, document: DocumentHandle) -> Result<(), HostError>;
}
