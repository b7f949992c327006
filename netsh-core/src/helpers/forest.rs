//! HelperForest - the tree of registered helpers
//!
//! Helpers live in an arena and are linked by index: a root sibling chain,
//! and for every helper a chain of child helpers. New roots are prepended to
//! the root chain (the most recently registered root is found first); new
//! children are appended to their parent's chain (the first registered child
//! is found first).
//!
//! Slots freed by removal are reused by later registrations.
//!
//! Every walk over the forest uses an explicit [`TraversalStack`] so the
//! depth of the forest never translates into call-stack depth.

use std::panic::AssertUnwindSafe;

use netsh_helper_api::{HelperAttributes, HelperError, HelperId};

use super::modules::ModuleId;
use super::stack::TraversalStack;

/// Stable position of a helper in the forest arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HelperIdx(usize);

/// A registered helper
#[derive(Debug, Clone)]
pub struct HelperEntry {
    attributes: HelperAttributes,
    module: Option<ModuleId>,
    parent_id: Option<HelperId>,
    started: bool,
}

impl HelperEntry {
    pub fn id(&self) -> HelperId {
        self.attributes.id
    }

    /// The attributes copied at registration time
    pub fn attributes(&self) -> &HelperAttributes {
        &self.attributes
    }

    /// Module whose entry point registered this helper
    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }

    /// Parent requested at registration, `None` for roots
    pub fn parent_id(&self) -> Option<HelperId> {
        self.parent_id
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

#[derive(Debug)]
struct HelperNode {
    entry: HelperEntry,
    parent: Option<HelperIdx>,
    prev: Option<HelperIdx>,
    next: Option<HelperIdx>,
    first_child: Option<HelperIdx>,
    last_child: Option<HelperIdx>,
}

/// Outcome of a [`HelperForest::start_all`] pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StartSummary {
    /// Start routines invoked during the pass
    pub attempted: usize,
    /// Start routines that succeeded
    pub started: usize,
}

/// Forest of registered helpers keyed by [`HelperId`]
#[derive(Debug, Default)]
pub struct HelperForest {
    nodes: Vec<Option<HelperNode>>,
    free: Vec<HelperIdx>,
    root_head: Option<HelperIdx>,
    root_tail: Option<HelperIdx>,
    len: usize,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    idx: HelperIdx,
    /// Only the head of the root chain expands its siblings; every other
    /// helper is pushed by its parent or by that head, exactly once.
    with_siblings: bool,
}

/// Depth-first walker over a [`HelperForest`].
///
/// A visited helper's children are pushed in chain order, followed by its
/// remaining siblings, so the stack pops them last-first. The pushes for a
/// helper happen on the call after it is yielded, which lets a search stop
/// before expanding the helper it matched.
#[derive(Debug)]
pub struct DepthFirst {
    stack: TraversalStack<Frame>,
    pending: Option<Frame>,
}

impl DepthFirst {
    pub fn new(forest: &HelperForest) -> Self {
        let mut stack = TraversalStack::new();
        if let Some(head) = forest.root_head {
            stack.push(Frame {
                idx: head,
                with_siblings: true,
            });
        }
        Self {
            stack,
            pending: None,
        }
    }

    /// Next helper in depth-first order
    pub fn next(&mut self, forest: &HelperForest) -> Option<HelperIdx> {
        if let Some(frame) = self.pending.take() {
            self.expand(forest, frame);
        }
        let frame = self.stack.pop()?;
        self.pending = Some(frame);
        Some(frame.idx)
    }

    fn expand(&mut self, forest: &HelperForest, frame: Frame) {
        let Some(node) = forest.node(frame.idx) else {
            return;
        };

        for child in forest.chain(node.first_child) {
            self.stack.push(Frame {
                idx: child,
                with_siblings: false,
            });
        }

        if frame.with_siblings {
            for sibling in forest.chain(node.next) {
                self.stack.push(Frame {
                    idx: sibling,
                    with_siblings: false,
                });
            }
        }
    }
}

impl HelperForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered helpers
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register a helper.
    ///
    /// Rejects an id that is already present before touching the forest.
    /// Without a parent the helper is prepended to the root chain; with one,
    /// the parent must already be registered and the helper is appended to
    /// its child chain.
    pub fn register(
        &mut self,
        parent: Option<HelperId>,
        attributes: HelperAttributes,
        module: Option<ModuleId>,
    ) -> Result<HelperIdx, HelperError> {
        let id = attributes.id;
        if self.position(id).is_some() {
            tracing::debug!(helper = %id, "Helper already registered");
            return Err(HelperError::AlreadyRegistered { id });
        }

        let parent_idx = match parent {
            Some(parent_id) => match self.position(parent_id) {
                Some(idx) => Some(idx),
                None => {
                    tracing::debug!(helper = %id, parent = %parent_id, "Parent helper not found");
                    return Err(HelperError::ParentNotFound { parent: parent_id });
                }
            },
            None => None,
        };

        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                self.nodes
                    .try_reserve(1)
                    .map_err(|_| HelperError::OutOfMemory)?;
                self.free
                    .try_reserve(self.nodes.len() + 1)
                    .map_err(|_| HelperError::OutOfMemory)?;
                self.nodes.push(None);
                HelperIdx(self.nodes.len() - 1)
            }
        };
        if let Some(slot) = self.nodes.get_mut(idx.0) {
            *slot = Some(HelperNode {
                entry: HelperEntry {
                    attributes,
                    module,
                    parent_id: parent,
                    started: false,
                },
                parent: parent_idx,
                prev: None,
                next: None,
                first_child: None,
                last_child: None,
            });
        }

        match parent_idx {
            None => self.link_root_front(idx),
            Some(parent_idx) => self.link_child_back(parent_idx, idx),
        }
        self.len += 1;

        tracing::debug!(helper = %id, parent = ?parent, "Helper registered");
        Ok(idx)
    }

    /// Find a helper by id
    pub fn find(&self, id: HelperId) -> Option<&HelperEntry> {
        self.position(id).and_then(|idx| self.get(idx))
    }

    pub fn contains(&self, id: HelperId) -> bool {
        self.position(id).is_some()
    }

    /// Arena position of a helper, found by depth-first search
    pub fn position(&self, id: HelperId) -> Option<HelperIdx> {
        let mut walk = DepthFirst::new(self);
        while let Some(idx) = walk.next(self) {
            if self.get(idx).is_some_and(|entry| entry.id() == id) {
                return Some(idx);
            }
        }
        None
    }

    pub fn get(&self, idx: HelperIdx) -> Option<&HelperEntry> {
        self.node(idx).map(|node| &node.entry)
    }

    /// Whether `id` sits anywhere below `ancestor`
    pub fn is_descendant(&self, id: HelperId, ancestor: HelperId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let mut current = self.node(idx).and_then(|node| node.parent);
        while let Some(parent) = current {
            let Some(node) = self.node(parent) else {
                return false;
            };
            if node.entry.id() == ancestor {
                return true;
            }
            current = node.parent;
        }
        false
    }

    /// Root helpers in chain order
    pub fn roots(&self) -> impl Iterator<Item = HelperIdx> + '_ {
        self.chain(self.root_head)
    }

    /// Children of a helper in chain order
    pub fn children(&self, idx: HelperIdx) -> impl Iterator<Item = HelperIdx> + '_ {
        self.chain(self.node(idx).and_then(|node| node.first_child))
    }

    /// All helpers in depth-first order
    pub fn iter(&self) -> impl Iterator<Item = &HelperEntry> + '_ {
        let mut walk = DepthFirst::new(self);
        std::iter::from_fn(move || walk.next(self)).filter_map(|idx| self.get(idx))
    }

    /// Invoke every pending start routine once.
    ///
    /// Visits every helper exactly once. Helpers that are already started or
    /// have no start routine are skipped; a failing start leaves the helper
    /// unstarted so the next pass retries it, and does not stop the pass.
    pub fn start_all(&mut self) -> StartSummary {
        let mut summary = StartSummary::default();
        let mut walk = DepthFirst::new(self);

        while let Some(idx) = walk.next(self) {
            let Some(node) = self.nodes.get_mut(idx.0).and_then(Option::as_mut) else {
                continue;
            };
            let entry = &mut node.entry;
            if entry.started {
                continue;
            }
            let Some(start) = entry.attributes.start.clone() else {
                continue;
            };

            summary.attempted += 1;
            tracing::debug!(helper = %entry.id(), "Starting helper");

            let result = std::panic::catch_unwind(AssertUnwindSafe(|| start()));
            match result {
                Ok(Ok(())) => {
                    entry.started = true;
                    summary.started += 1;
                }
                Ok(Err(e)) => {
                    tracing::warn!(helper = %entry.id(), error = %e, "Helper failed to start");
                }
                Err(_) => {
                    tracing::error!(helper = %entry.id(), "Helper panicked in start");
                }
            }
        }

        summary
    }

    /// Remove every helper registered by `module`, with its subtree.
    ///
    /// Started helpers are stopped before they are dropped. Returns the
    /// number of helpers removed.
    pub fn remove_module_helpers(&mut self, module: ModuleId) -> usize {
        let owned: Vec<HelperIdx> = {
            let mut owned = Vec::new();
            let mut walk = DepthFirst::new(self);
            while let Some(idx) = walk.next(self) {
                if self.get(idx).is_some_and(|entry| entry.module == Some(module)) {
                    owned.push(idx);
                }
            }
            owned
        };

        let mut removed = 0;
        for idx in owned {
            // may already be gone with an ancestor's subtree
            if self.node(idx).is_some() {
                removed += self.remove_subtree(idx);
            }
        }
        removed
    }

    /// Stop every started helper and empty the forest
    pub fn clear(&mut self) -> usize {
        let order: Vec<HelperIdx> = {
            let mut order = Vec::with_capacity(self.len);
            let mut walk = DepthFirst::new(self);
            while let Some(idx) = walk.next(self) {
                order.push(idx);
            }
            order
        };

        for idx in order.iter().rev() {
            if let Some(entry) = self.get(*idx) {
                stop_helper(entry);
            }
        }

        let cleared = self.len;
        self.nodes.clear();
        self.free.clear();
        self.root_head = None;
        self.root_tail = None;
        self.len = 0;
        cleared
    }

    fn remove_subtree(&mut self, top: HelperIdx) -> usize {
        self.unlink(top);

        let mut subtree = Vec::new();
        let mut stack = TraversalStack::new();
        stack.push(top);
        while let Some(idx) = stack.pop() {
            subtree.push(idx);
            for child in self.children(idx) {
                stack.push(child);
            }
        }

        // children before parents
        let mut removed = 0;
        for idx in subtree.into_iter().rev() {
            if let Some(node) = self.nodes.get_mut(idx.0).and_then(Option::take) {
                stop_helper(&node.entry);
                tracing::debug!(helper = %node.entry.id(), "Helper removed");
                self.free.push(idx);
                removed += 1;
            }
        }
        self.len -= removed;
        removed
    }

    fn link_root_front(&mut self, idx: HelperIdx) {
        let old_head = self.root_head;
        if let Some(node) = self.node_mut(idx) {
            node.next = old_head;
        }
        match old_head {
            Some(head) => {
                if let Some(node) = self.node_mut(head) {
                    node.prev = Some(idx);
                }
            }
            None => self.root_tail = Some(idx),
        }
        self.root_head = Some(idx);
    }

    fn link_child_back(&mut self, parent: HelperIdx, idx: HelperIdx) {
        let Some(old_tail) = self.node(parent).map(|node| node.last_child) else {
            return;
        };
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
        }
        if let Some(tail) = old_tail
            && let Some(node) = self.node_mut(tail)
        {
            node.next = Some(idx);
        }
        if let Some(node) = self.node_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = Some(idx);
            }
            node.last_child = Some(idx);
        }
    }

    fn unlink(&mut self, idx: HelperIdx) {
        let Some((parent, prev, next)) = self.node(idx).map(|n| (n.parent, n.prev, n.next)) else {
            return;
        };

        match prev {
            Some(prev) => {
                if let Some(node) = self.node_mut(prev) {
                    node.next = next;
                }
            }
            None => match parent {
                Some(parent) => {
                    if let Some(node) = self.node_mut(parent) {
                        node.first_child = next;
                    }
                }
                None => self.root_head = next,
            },
        }

        match next {
            Some(next) => {
                if let Some(node) = self.node_mut(next) {
                    node.prev = prev;
                }
            }
            None => match parent {
                Some(parent) => {
                    if let Some(node) = self.node_mut(parent) {
                        node.last_child = prev;
                    }
                }
                None => self.root_tail = prev,
            },
        }

        if let Some(node) = self.node_mut(idx) {
            node.parent = None;
            node.prev = None;
            node.next = None;
        }
    }

    fn chain(&self, first: Option<HelperIdx>) -> impl Iterator<Item = HelperIdx> + '_ {
        std::iter::successors(first, move |idx| self.node(*idx).and_then(|node| node.next))
    }

    fn node(&self, idx: HelperIdx) -> Option<&HelperNode> {
        self.nodes.get(idx.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: HelperIdx) -> Option<&mut HelperNode> {
        self.nodes.get_mut(idx.0).and_then(Option::as_mut)
    }
}

fn stop_helper(entry: &HelperEntry) {
    if !entry.started {
        return;
    }
    let Some(stop) = entry.attributes.stop.as_ref() else {
        return;
    };

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| stop()));
    match result {
        Ok(Ok(())) => {
            tracing::debug!(helper = %entry.id(), "Helper stopped");
        }
        Ok(Err(e)) => {
            tracing::warn!(helper = %entry.id(), error = %e, "Helper failed to stop");
        }
        Err(_) => {
            tracing::error!(helper = %entry.id(), "Helper panicked in stop");
        }
    }
}
