//! An in-memory document host.
//!
//! The live document is a list of paragraphs. Each paragraph can be hidden and
//! can carry at most one anchor; the anchor's text is the paragraph's text.
//! Hiding nests: a paragraph hidden twice stays hidden until it has been
//! revealed twice.
//! Every handle the host gives out is tracked, so leaked ranges and documents
//! can be observed with [`MemoryHost::open_handles`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{
    Anchor, AnchorId, AnchorSpec, BindingId, ChangeCallback, DocumentHandle, DocumentHost,
    HostError, RangeHandle, SubscriptionId, Tag,
};

/// One block of a document created by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A page break.
    PageBreak,
    /// A copy of the visible paragraphs of the live document.
    Copy(Vec<String>),
}

#[derive(Debug)]
struct Paragraph {
    key: u64,
    text: String,
    hides: u32,
    anchor: Option<AnchorId>,
}

impl Paragraph {
    const fn is_hidden(&self) -> bool {
        self.hides > 0
    }
}

#[derive(Debug)]
struct AnchorData {
    tag: Tag,
    title: String,
    style: Option<String>,
    abdruck: bool,
}

/// A range of paragraphs, stored by paragraph key so that it survives edits
/// elsewhere in the document. `end` is exclusive; `None` means the end of the
/// document.
#[derive(Debug, Clone, Copy)]
struct Range {
    start: u64,
    end: Option<u64>,
}

#[derive(Debug, Default)]
struct Target {
    blocks: Vec<Block>,
    shown: bool,
    released: bool,
}

#[derive(Default)]
struct State {
    paragraphs: Vec<Paragraph>,
    anchors: HashMap<AnchorId, AnchorData>,
    cursor: u64,
    ranges: HashMap<RangeHandle, Range>,
    bindings: HashMap<BindingId, AnchorId>,
    subscriptions: BTreeMap<SubscriptionId, (BindingId, ChangeCallback)>,
    documents: BTreeMap<DocumentHandle, Target>,
    next_handle: u64,
    mutations: usize,
    copies: usize,
    fail_copy_after: Option<usize>,
    fail_show: bool,
}

impl State {
    const fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn index_of_key(&self, key: u64) -> Option<usize> {
        self.paragraphs.iter().position(|p| p.key == key)
    }

    fn cursor_index(&self) -> Result<usize, HostError> {
        self.index_of_key(self.cursor)
            .ok_or_else(|| HostError::Unavailable("cursor is outside the document".to_string()))
    }

    fn index_of_anchor(&self, id: AnchorId) -> Result<usize, HostError> {
        self.paragraphs
            .iter()
            .position(|p| p.anchor == Some(id))
            .ok_or(HostError::UnknownAnchor(id))
    }

    fn resolve(&self, handle: RangeHandle) -> Result<std::ops::Range<usize>, HostError> {
        let range = self
            .ranges
            .get(&handle)
            .ok_or(HostError::UnknownRange(handle))?;
        let start = self
            .index_of_key(range.start)
            .ok_or(HostError::UnknownRange(handle))?;
        let end = range
            .end
            .and_then(|key| self.index_of_key(key))
            .unwrap_or(self.paragraphs.len());
        Ok(start..end.max(start))
    }

    fn anchor_at(&self, index: usize) -> Option<Anchor> {
        let paragraph = self.paragraphs.get(index)?;
        let id = paragraph.anchor?;
        let data = self.anchors.get(&id)?;
        Some(Anchor {
            id,
            tag: data.tag.clone(),
            text: paragraph.text.clone(),
        })
    }

    fn anchors_in(&self, indices: impl IntoIterator<Item = usize>) -> Vec<Anchor> {
        indices
            .into_iter()
            .filter_map(|index| self.anchor_at(index))
            .collect()
    }

    fn set_hidden(&mut self, handle: RangeHandle, hide: bool) -> Result<(), HostError> {
        let range = self.resolve(handle)?;
        for paragraph in &mut self.paragraphs[range] {
            paragraph.hides = if hide {
                paragraph.hides.saturating_add(1)
            } else {
                paragraph.hides.saturating_sub(1)
            };
        }
        self.mutations += 1;
        Ok(())
    }

    fn attach(&mut self, index: usize, spec: AnchorSpec) -> Result<AnchorId, HostError> {
        let paragraph = self
            .paragraphs
            .get(index)
            .ok_or_else(|| HostError::Unavailable("no such paragraph".to_string()))?;
        if paragraph.anchor.is_some() {
            return Err(HostError::Unavailable(
                "paragraph already carries an anchor".to_string(),
            ));
        }

        let id = AnchorId::new(self.next_handle());
        let paragraph = &mut self.paragraphs[index];
        paragraph.anchor = Some(id);
        if !spec.text.is_empty() {
            paragraph.text = spec.text;
        }
        self.anchors.insert(
            id,
            AnchorData {
                tag: spec.tag,
                title: spec.title,
                style: spec.style,
                abdruck: spec.abdruck,
            },
        );
        self.mutations += 1;
        Ok(id)
    }

    fn target(&mut self, handle: DocumentHandle) -> Result<&mut Target, HostError> {
        self.documents
            .get_mut(&handle)
            .filter(|target| !target.released)
            .ok_or(HostError::UnknownDocument(handle))
    }
}

/// A document host that keeps the live document in memory.
pub struct MemoryHost {
    state: Mutex<State>,
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryHost")
            .field("paragraphs", &state.paragraphs.len())
            .field("anchors", &state.anchors.len())
            .field("open_ranges", &state.ranges.len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Creates a host holding a single empty paragraph.
    #[must_use]
    pub fn new() -> Self {
        Self::from_paragraphs([""])
    }

    /// Creates a host holding the given paragraphs, with the cursor in the
    /// first one.
    ///
    /// An empty iterator yields a document with a single empty paragraph.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = State::default();
        for text in paragraphs {
            let key = state.next_handle();
            state.paragraphs.push(Paragraph {
                key,
                text: text.into(),
                hides: 0,
                anchor: None,
            });
        }
        if state.paragraphs.is_empty() {
            let key = state.next_handle();
            state.paragraphs.push(Paragraph {
                key,
                text: String::new(),
                hides: 0,
                anchor: None,
            });
        }
        state.cursor = state.paragraphs[0].key;

        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the cursor into the paragraph at `index`.
    ///
    /// Indices past the end move the cursor into the last paragraph.
    pub fn set_cursor(&self, index: usize) {
        let mut state = self.state();
        let index = index.min(state.paragraphs.len().saturating_sub(1));
        state.cursor = state.paragraphs[index].key;
    }

    /// Moves the cursor into the paragraph carrying the given anchor.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownAnchor`] if there is no such anchor.
    pub fn set_cursor_to_anchor(&self, id: AnchorId) -> Result<(), HostError> {
        let mut state = self.state();
        let index = state.index_of_anchor(id)?;
        state.cursor = state.paragraphs[index].key;
        Ok(())
    }

    /// The index of the paragraph the cursor is in.
    #[must_use]
    pub fn cursor(&self) -> usize {
        let state = self.state();
        state.cursor_index().unwrap_or_default()
    }

    /// Attaches an anchor to the paragraph at `index` without moving the
    /// cursor.
    ///
    /// # Errors
    ///
    /// Fails if there is no such paragraph or it already carries an anchor.
    pub fn anchor_paragraph(&self, index: usize, spec: AnchorSpec) -> Result<AnchorId, HostError> {
        self.state().attach(index, spec)
    }

    /// The text of every paragraph, hidden or not.
    #[must_use]
    pub fn paragraphs(&self) -> Vec<String> {
        self.state()
            .paragraphs
            .iter()
            .map(|p| p.text.clone())
            .collect()
    }

    /// The text of every visible paragraph.
    #[must_use]
    pub fn visible_paragraphs(&self) -> Vec<String> {
        self.state()
            .paragraphs
            .iter()
            .filter(|p| !p.is_hidden())
            .map(|p| p.text.clone())
            .collect()
    }

    /// The indices of all hidden paragraphs.
    #[must_use]
    pub fn hidden_paragraphs(&self) -> Vec<usize> {
        self.state()
            .paragraphs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_hidden())
            .map(|(index, _)| index)
            .collect()
    }

    /// The spec an anchor was created with. The text is not part of it.
    #[must_use]
    pub fn anchor_spec(&self, id: AnchorId) -> Option<AnchorSpec> {
        self.state().anchors.get(&id).map(|data| AnchorSpec {
            tag: data.tag.clone(),
            title: data.title.clone(),
            style: data.style.clone(),
            text: String::new(),
            abdruck: data.abdruck,
        })
    }

    /// The number of range and document handles that have not been released.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        let state = self.state();
        state.ranges.len() + state.documents.values().filter(|d| !d.released).count()
    }

    /// The number of live bindings.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.state().bindings.len()
    }

    /// The number of registered change callbacks.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.state().subscriptions.len()
    }

    /// The number of calls that changed the live document or a created
    /// document.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.state().mutations
    }

    /// The blocks of a document created by the host, released or not.
    #[must_use]
    pub fn document(&self, handle: DocumentHandle) -> Option<Vec<Block>> {
        self.state()
            .documents
            .get(&handle)
            .map(|target| target.blocks.clone())
    }

    /// All documents that have been shown, in creation order.
    #[must_use]
    pub fn shown_documents(&self) -> Vec<DocumentHandle> {
        self.state()
            .documents
            .iter()
            .filter(|(_, target)| target.shown)
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// All documents ever created, in creation order.
    #[must_use]
    pub fn created_documents(&self) -> Vec<DocumentHandle> {
        self.state().documents.keys().copied().collect()
    }

    /// Makes every copy after the first `copies` successful ones fail.
    pub fn fail_copy_after(&self, copies: usize) {
        self.state().fail_copy_after = Some(copies);
    }

    /// Makes every later [`DocumentHost::show`] fail.
    pub fn fail_show(&self) {
        self.state().fail_show = true;
    }
}

#[async_trait]
impl DocumentHost for MemoryHost {
    async fn wrap_paragraph(&self, spec: AnchorSpec) -> Result<AnchorId, HostError> {
        let mut state = self.state();
        let index = state.cursor_index()?;
        let id = state.attach(index, spec)?;
        debug!(%id, index, "wrapped paragraph");
        Ok(id)
    }

    async fn insert_anchor(&self, spec: AnchorSpec) -> Result<AnchorId, HostError> {
        let mut state = self.state();
        let index = state.cursor_index()? + 1;
        let key = state.next_handle();
        state.paragraphs.insert(
            index,
            Paragraph {
                key,
                text: String::new(),
                hides: 0,
                anchor: None,
            },
        );
        state.cursor = key;
        let id = state.attach(index, spec)?;
        debug!(%id, index, "inserted anchor");
        Ok(id)
    }

    async fn delete_anchor(&self, id: AnchorId) -> Result<(), HostError> {
        let mut state = self.state();
        if state.bindings.values().any(|bound| *bound == id) {
            return Err(HostError::AnchorBound(id));
        }
        let index = state.index_of_anchor(id)?;
        state.paragraphs[index].anchor = None;
        state.anchors.remove(&id);
        state.mutations += 1;
        Ok(())
    }

    async fn anchor_text(&self, id: AnchorId) -> Result<String, HostError> {
        let state = self.state();
        let index = state.index_of_anchor(id)?;
        Ok(state.paragraphs[index].text.clone())
    }

    async fn set_anchor_text(&self, id: AnchorId, text: &str) -> Result<(), HostError> {
        let callbacks: Vec<ChangeCallback> = {
            let mut state = self.state();
            let index = state.index_of_anchor(id)?;
            state.paragraphs[index].text = text.to_string();
            state.mutations += 1;

            state
                .subscriptions
                .values()
                .filter(|(binding, _)| state.bindings.get(binding) == Some(&id))
                .map(|(_, callback)| callback.clone())
                .collect()
        };

        trace!(%id, callbacks = callbacks.len(), "anchor text changed");
        for callback in callbacks {
            callback(text.to_string());
        }
        Ok(())
    }

    async fn all_anchors(&self) -> Result<Vec<Anchor>, HostError> {
        let state = self.state();
        Ok(state.anchors_in(0..state.paragraphs.len()))
    }

    async fn anchors_in_range(&self, range: RangeHandle) -> Result<Vec<Anchor>, HostError> {
        let state = self.state();
        let range = state.resolve(range)?;
        Ok(state.anchors_in(range))
    }

    async fn next_anchors(&self, from: Option<AnchorId>) -> Result<Vec<Anchor>, HostError> {
        let state = self.state();
        let index = match from {
            Some(id) => state.index_of_anchor(id)?,
            None => state.cursor_index()?,
        };
        Ok(state.anchors_in(index + 1..state.paragraphs.len()))
    }

    async fn previous_anchor(&self, tag: &Tag) -> Result<Option<AnchorId>, HostError> {
        let state = self.state();
        let cursor = state.cursor_index()?;
        Ok(state
            .anchors_in(0..=cursor)
            .into_iter()
            .rev()
            .find(|anchor| &anchor.tag == tag)
            .map(|anchor| anchor.id))
    }

    async fn expand_to_paragraph(&self) -> Result<RangeHandle, HostError> {
        let mut state = self.state();
        let index = state.cursor_index()?;
        let range = Range {
            start: state.paragraphs[index].key,
            end: state.paragraphs.get(index + 1).map(|p| p.key),
        };
        let handle = RangeHandle::new(state.next_handle());
        state.ranges.insert(handle, range);
        Ok(handle)
    }

    async fn range_between(
        &self,
        start: AnchorId,
        end: Option<AnchorId>,
    ) -> Result<RangeHandle, HostError> {
        let mut state = self.state();
        let start = state.paragraphs[state.index_of_anchor(start)?].key;
        let end = match end {
            Some(id) => Some(state.paragraphs[state.index_of_anchor(id)?].key),
            None => None,
        };
        let handle = RangeHandle::new(state.next_handle());
        state.ranges.insert(handle, Range { start, end });
        Ok(handle)
    }

    async fn release_range(&self, range: RangeHandle) -> Result<(), HostError> {
        self.state()
            .ranges
            .remove(&range)
            .map(|_| ())
            .ok_or(HostError::UnknownRange(range))
    }

    async fn hide(&self, range: RangeHandle) -> Result<(), HostError> {
        self.state().set_hidden(range, true)
    }

    async fn unhide(&self, range: RangeHandle) -> Result<(), HostError> {
        self.state().set_hidden(range, false)
    }

    async fn bind(&self, id: AnchorId, _tag: &Tag) -> Result<BindingId, HostError> {
        let mut state = self.state();
        state.index_of_anchor(id)?;
        let binding = BindingId::new(state.next_handle());
        state.bindings.insert(binding, id);
        state.mutations += 1;
        Ok(binding)
    }

    async fn subscribe(
        &self,
        binding: BindingId,
        callback: ChangeCallback,
    ) -> Result<SubscriptionId, HostError> {
        let mut state = self.state();
        if !state.bindings.contains_key(&binding) {
            return Err(HostError::UnknownBinding(binding));
        }
        let subscription = SubscriptionId::new(state.next_handle());
        state.subscriptions.insert(subscription, (binding, callback));
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), HostError> {
        // Subscriptions vanish with their binding, so a missing one is fine.
        self.state().subscriptions.remove(&subscription);
        Ok(())
    }

    async fn unbind(&self, binding: BindingId) -> Result<(), HostError> {
        let mut state = self.state();
        state
            .bindings
            .remove(&binding)
            .ok_or(HostError::UnknownBinding(binding))?;
        state.subscriptions.retain(|_, (bound, _)| *bound != binding);
        state.mutations += 1;
        Ok(())
    }

    async fn new_document(&self) -> Result<DocumentHandle, HostError> {
        let mut state = self.state();
        let handle = DocumentHandle::new(state.next_handle());
        state.documents.insert(handle, Target::default());
        state.mutations += 1;
        Ok(handle)
    }

    async fn insert_page_break(&self, document: DocumentHandle) -> Result<(), HostError> {
        let mut state = self.state();
        state.target(document)?.blocks.push(Block::PageBreak);
        state.mutations += 1;
        Ok(())
    }

    async fn copy_current_into(&self, document: DocumentHandle) -> Result<(), HostError> {
        let mut state = self.state();
        if state.fail_copy_after.is_some_and(|limit| state.copies >= limit) {
            return Err(HostError::Unavailable("copy failed".to_string()));
        }

        let visible: Vec<String> = state
            .paragraphs
            .iter()
            .filter(|p| !p.is_hidden())
            .map(|p| p.text.clone())
            .collect();
        state.target(document)?.blocks.push(Block::Copy(visible));
        state.copies += 1;
        state.mutations += 1;
        Ok(())
    }

    async fn show(&self, document: DocumentHandle) -> Result<(), HostError> {
        let mut state = self.state();
        if state.fail_show {
            return Err(HostError::Unavailable("show failed".to_string()));
        }
        state.target(document)?.shown = true;
        state.mutations += 1;
        Ok(())
    }

    async fn release_document(&self, document: DocumentHandle) -> Result<(), HostError> {
        self.state().target(document)?.released = true;
        Ok(())
    }
}
