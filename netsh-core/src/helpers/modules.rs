//! Loaded helper libraries

use std::fmt;
use std::path::{Path, PathBuf};

use super::error::HelperHostError;
use super::loader::ModuleHandle;

/// Stable handle of a module in the [`ModuleList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(usize);

/// One loaded helper library
pub struct HelperModule {
    dll_path: PathBuf,
    short_name: String,
    value_name: String,
    handle: Option<Box<dyn ModuleHandle>>,
}

impl HelperModule {
    /// Derive the short name and persistence key from `path`.
    ///
    /// The short name is the last path component (either separator counts);
    /// the persistence key is the short name without its extension.
    pub fn new(path: &Path) -> Self {
        let full = path.to_string_lossy();
        let short_name = short_name_of(&full).to_string();
        let value_name = value_name_of(&short_name).to_string();
        Self {
            dll_path: path.to_path_buf(),
            short_name,
            value_name,
            handle: None,
        }
    }

    pub fn dll_path(&self) -> &Path {
        &self.dll_path
    }

    /// File name of the library, e.g. `ifmon.so`
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Key under which the library is persisted, e.g. `ifmon`
    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    /// Whether the library is currently mapped
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn handle(&self) -> Option<&dyn ModuleHandle> {
        self.handle.as_deref()
    }

    pub(crate) fn set_handle(&mut self, handle: Box<dyn ModuleHandle>) {
        self.handle = Some(handle);
    }
}

impl fmt::Debug for HelperModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperModule")
            .field("dll_path", &self.dll_path)
            .field("short_name", &self.short_name)
            .field("value_name", &self.value_name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn short_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn value_name_of(short_name: &str) -> &str {
    match short_name.rfind('.') {
        Some(dot) if dot > 0 => &short_name[..dot],
        _ => short_name,
    }
}

struct ModuleSlot {
    module: HelperModule,
    prev: Option<ModuleId>,
    next: Option<ModuleId>,
}

/// Doubly linked list of loaded modules, newest first.
///
/// Owns every module; unlinking a module hands it back to the caller, and
/// dropping it releases the library. An unlinked module's id may be handed
/// out again by a later `push_front`.
#[derive(Default)]
pub struct ModuleList {
    slots: Vec<Option<ModuleSlot>>,
    free: Vec<ModuleId>,
    head: Option<ModuleId>,
    tail: Option<ModuleId>,
    len: usize,
}

impl ModuleList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a module at the head of the list
    pub fn push_front(&mut self, module: HelperModule) -> Result<ModuleId, HelperHostError> {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.slots
                    .try_reserve(1)
                    .map_err(|_| HelperHostError::OutOfMemory)?;
                self.free
                    .try_reserve(self.slots.len() + 1)
                    .map_err(|_| HelperHostError::OutOfMemory)?;
                self.slots.push(None);
                ModuleId(self.slots.len() - 1)
            }
        };
        let old_head = self.head;
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = Some(ModuleSlot {
                module,
                prev: None,
                next: old_head,
            });
        }

        match old_head.and_then(|head| self.slot_mut(head)) {
            Some(slot) => slot.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        Ok(id)
    }

    /// Unlink a module, fixing up head and tail, and hand it back
    pub fn unlink(&mut self, id: ModuleId) -> Option<HelperModule> {
        let slot = self.slots.get_mut(id.0).and_then(Option::take)?;

        match slot.prev.and_then(|prev| self.slot_mut(prev)) {
            Some(prev) => prev.next = slot.next,
            None => self.head = slot.next,
        }
        match slot.next.and_then(|next| self.slot_mut(next)) {
            Some(next) => next.prev = slot.prev,
            None => self.tail = slot.prev,
        }

        self.free.push(id);
        self.len -= 1;
        Some(slot.module)
    }

    pub fn pop_front(&mut self) -> Option<HelperModule> {
        self.head.and_then(|head| self.unlink(head))
    }

    pub fn get(&self, id: ModuleId) -> Option<&HelperModule> {
        self.slot(id).map(|slot| &slot.module)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut HelperModule> {
        self.slot_mut(id).map(|slot| &mut slot.module)
    }

    /// First module, from the head, whose short name matches exactly
    pub fn find_by_short_name(&self, short_name: &str) -> Option<ModuleId> {
        self.iter()
            .find(|(_, module)| module.short_name() == short_name)
            .map(|(id, _)| id)
    }

    /// Modules from head to tail
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &HelperModule)> + '_ {
        let ids = std::iter::successors(self.head, move |id| self.slot(*id).and_then(|s| s.next));
        ids.filter_map(move |id| self.get(id).map(|module| (id, module)))
    }

    fn slot(&self, id: ModuleId) -> Option<&ModuleSlot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: ModuleId) -> Option<&mut ModuleSlot> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }
}

impl fmt::Debug for ModuleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, m)| m)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &ModuleList) -> Vec<&str> {
        list.iter().map(|(_, m)| m.short_name()).collect()
    }

    #[test]
    fn test_names_derived_from_unix_path() {
        let module = HelperModule::new(Path::new("/usr/lib/netsh/ifmon.so"));
        assert_eq!(module.short_name(), "ifmon.so");
        assert_eq!(module.value_name(), "ifmon");
        assert_eq!(module.dll_path(), Path::new("/usr/lib/netsh/ifmon.so"));
        assert!(!module.is_loaded());
    }

    #[test]
    fn test_names_derived_from_windows_path() {
        let module = HelperModule::new(Path::new("C:\\Windows\\System32\\ipmontr.dll"));
        assert_eq!(module.short_name(), "ipmontr.dll");
        assert_eq!(module.value_name(), "ipmontr");
    }

    #[test]
    fn test_names_without_separator_or_extension() {
        let module = HelperModule::new(Path::new("libhelper.so.1"));
        assert_eq!(module.short_name(), "libhelper.so.1");
        assert_eq!(module.value_name(), "libhelper.so");

        let module = HelperModule::new(Path::new("dhcpmon"));
        assert_eq!(module.short_name(), "dhcpmon");
        assert_eq!(module.value_name(), "dhcpmon");

        let module = HelperModule::new(Path::new(".hidden"));
        assert_eq!(module.value_name(), ".hidden");
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let mut list = ModuleList::new();
        list.push_front(HelperModule::new(Path::new("a.so"))).unwrap();
        list.push_front(HelperModule::new(Path::new("b.so"))).unwrap();
        list.push_front(HelperModule::new(Path::new("c.so"))).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(names(&list), vec!["c.so", "b.so", "a.so"]);
    }

    #[test]
    fn test_unlink_middle_head_and_tail() {
        let mut list = ModuleList::new();
        let a = list.push_front(HelperModule::new(Path::new("a.so"))).unwrap();
        let b = list.push_front(HelperModule::new(Path::new("b.so"))).unwrap();
        let c = list.push_front(HelperModule::new(Path::new("c.so"))).unwrap();

        assert_eq!(list.unlink(b).unwrap().short_name(), "b.so");
        assert_eq!(names(&list), vec!["c.so", "a.so"]);

        assert_eq!(list.unlink(c).unwrap().short_name(), "c.so");
        assert_eq!(names(&list), vec!["a.so"]);

        assert_eq!(list.unlink(a).unwrap().short_name(), "a.so");
        assert!(list.is_empty());
        assert!(list.unlink(a).is_none());

        list.push_front(HelperModule::new(Path::new("d.so"))).unwrap();
        assert_eq!(names(&list), vec!["d.so"]);
    }

    #[test]
    fn test_find_by_short_name_is_exact() {
        let mut list = ModuleList::new();
        let id = list.push_front(HelperModule::new(Path::new("/x/ifmon.so"))).unwrap();

        assert_eq!(list.find_by_short_name("ifmon.so"), Some(id));
        assert_eq!(list.find_by_short_name("IFMON.so"), None);
        assert_eq!(list.find_by_short_name("ifmon"), None);
    }

    #[test]
    fn test_pop_front_drains_list() {
        let mut list = ModuleList::new();
        list.push_front(HelperModule::new(Path::new("a.so"))).unwrap();
        list.push_front(HelperModule::new(Path::new("b.so"))).unwrap();

        assert_eq!(list.pop_front().unwrap().short_name(), "b.so");
        assert_eq!(list.pop_front().unwrap().short_name(), "a.so");
        assert!(list.pop_front().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn test_unlinked_slots_are_reused() {
        let mut list = ModuleList::new();
        let keep = list.push_front(HelperModule::new(Path::new("keep.so"))).unwrap();
        for _ in 0..20 {
            let id = list.push_front(HelperModule::new(Path::new("cycle.so"))).unwrap();
            assert_ne!(id, keep);
            list.unlink(id).unwrap();
        }

        assert_eq!(list.slots.len(), 2);
        assert_eq!(names(&list), vec!["keep.so"]);
        assert_eq!(list.get(keep).unwrap().short_name(), "keep.so");
    }
}
