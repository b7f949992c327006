//! LIFO used by the depth-first walks over the helper forest

/// Growable stack of traversal frames.
///
/// Every walk allocates its own stack and drops it when the walk ends, so
/// deep or wide forests cost heap, never call-stack depth.
#[derive(Debug)]
pub struct TraversalStack<T> {
    items: Vec<T>,
}

impl<T> TraversalStack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Top of the stack without removing it
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for TraversalStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
