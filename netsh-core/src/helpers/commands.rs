//! `add helper`, `delete helper` and `show helper`
//!
//! Each command returns a numeric status: `0` on success, otherwise the
//! [`HelperHostError::status_code`] of the failure.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::Path;

use netsh_helper_api::status::NO_ERROR;

use super::context::ContextEntry;
use super::display::HelperTable;
use super::error::HelperHostError;
use super::forest::{HelperEntry, HelperIdx};
use super::host::HelperHost;
use super::modules::ModuleId;
use super::stack::TraversalStack;

/// Name of the root context built by [`HelperHost::helper_contexts`]
pub const ROOT_CONTEXT: &str = "netsh";

/// Collapse a command result into its status code
pub fn status_of<T>(result: Result<T, HelperHostError>) -> u32 {
    match result {
        Ok(_) => NO_ERROR,
        Err(e) => {
            tracing::debug!(error = %e, "Helper command failed");
            e.status_code()
        }
    }
}

fn single_argument<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, HelperHostError> {
    match args {
        [arg] if !arg.is_empty() => Ok(arg),
        _ => Err(HelperHostError::InvalidArgument(format!("usage: {usage}"))),
    }
}

impl HelperHost {
    /// `add helper <path>`: load and persist a library, then start any
    /// helpers that are not running yet
    pub fn add_helper(&mut self, args: &[&str]) -> u32 {
        let result = single_argument(args, "add helper <dll path>").and_then(|path| {
            self.load_helper_dll(Path::new(path), true)?;
            self.start_helpers();
            Ok(())
        });
        status_of(result)
    }

    /// `delete helper <short name>`
    pub fn delete_helper(&mut self, args: &[&str]) -> u32 {
        let result = single_argument(args, "delete helper <dll name>")
            .and_then(|name| self.delete_helper_dll(name));
        status_of(result)
    }

    /// `show helper`: one row per context whose helper is registered.
    ///
    /// Without a root context only the header is printed.
    pub fn show_helpers(&self, root: Option<&ContextEntry>, out: &mut dyn Write) -> u32 {
        status_of(
            self.write_helpers(root, out)
                .map_err(HelperHostError::from),
        )
    }

    fn write_helpers(&self, root: Option<&ContextEntry>, out: &mut dyn Write) -> io::Result<()> {
        let mut table = HelperTable::new(out);
        table.write_header()?;

        let Some(root) = root else {
            return Ok(());
        };

        let mut stack = TraversalStack::new();
        for child in root.children.iter().rev() {
            stack.push((child, 0usize));
        }

        while let Some((context, depth)) = stack.pop() {
            if let Some(entry) = context.helper.and_then(|id| self.find_helper(id)) {
                table.write_row(
                    &entry.id(),
                    self.module_short_name(entry.module()),
                    depth,
                    &context.name,
                )?;
            }
            for child in context.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        Ok(())
    }

    /// Context tree mirroring the helper forest, for embedders without one.
    ///
    /// Each helper becomes a context nested as the helpers are. The first
    /// helper of a library, in depth-first order, is named after the
    /// library's persistence key; its other helpers are `<key> <GUID>`.
    /// Helpers registered outside a load are named by GUID.
    pub fn helper_contexts(&self) -> ContextEntry {
        let forest = self.forest();

        // pre-order with each node's parent position
        let mut order: Vec<(HelperIdx, Option<usize>)> = Vec::with_capacity(forest.len());
        let mut stack = TraversalStack::new();
        let roots: Vec<HelperIdx> = forest.roots().collect();
        for idx in roots.into_iter().rev() {
            stack.push((idx, None));
        }
        while let Some((idx, parent)) = stack.pop() {
            let position = order.len();
            order.push((idx, parent));
            let children: Vec<HelperIdx> = forest.children(idx).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(position)));
            }
        }

        let mut named = HashSet::new();
        let mut built: Vec<ContextEntry> = order
            .iter()
            .map(|(idx, _)| match forest.get(*idx) {
                Some(entry) => {
                    ContextEntry::new(self.context_name(entry, &mut named), Some(entry.id()))
                }
                None => ContextEntry::default(),
            })
            .collect();

        // children sit after their parent, so fold them in back to front
        for position in (0..order.len()).rev() {
            if let Some(parent) = order[position].1 {
                let context = std::mem::take(&mut built[position]);
                built[parent].children.insert(0, context);
            }
        }

        let mut root = ContextEntry::new(ROOT_CONTEXT, None);
        root.children = order
            .iter()
            .zip(built)
            .filter(|((_, parent), _)| parent.is_none())
            .map(|(_, context)| context)
            .collect();
        root
    }

    fn context_name(&self, entry: &HelperEntry, named: &mut HashSet<ModuleId>) -> String {
        let Some((id, module)) = entry
            .module()
            .and_then(|id| self.modules().get(id).map(|module| (id, module)))
        else {
            return entry.id().to_string();
        };
        if named.insert(id) {
            module.value_name().to_string()
        } else {
            format!("{} {}", module.value_name(), entry.id())
        }
    }
}
