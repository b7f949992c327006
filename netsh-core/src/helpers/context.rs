//! Command contexts, as far as `show helper` needs them

use netsh_helper_api::HelperId;

/// A node of the context tree: a named command context provided by a helper
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextEntry {
    pub name: String,
    /// Helper that provides the context; `None` for the root
    pub helper: Option<HelperId>,
    pub children: Vec<ContextEntry>,
}

impl ContextEntry {
    pub fn new(name: impl Into<String>, helper: Option<HelperId>) -> Self {
        Self {
            name: name.into(),
            helper,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ContextEntry) -> Self {
        self.children.push(child);
        self
    }
}
