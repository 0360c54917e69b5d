//! Test helpers and fixtures.

use std::cell::RefCell;
use std::collections::BTreeMap;

use pagemark_core::{LayoutMode, MetadataCache, ReaderPrefs};

pub fn make_prefs(font_size: f32) -> ReaderPrefs {
    ReaderPrefs {
        font_family: "serif".to_string(),
        font_size,
        line_spacing: 1.5,
        margin_horizontal: 24.0,
        margin_vertical: 16.0,
        layout_mode: LayoutMode::Paginated,
    }
}

/// In-memory [`MetadataCache`] for tests that do not want a real database.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl MetadataCache for MemoryCache {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pagemark_application::PaginationManager;
    use pagemark_core::BookId;
    use pagemark_storage::Storage;

    use super::*;

    fn book() -> BookId {
        BookId("/library/novel.epub".to_string())
    }

    #[test]
    fn builds_prefs() {
        let prefs = make_prefs(12.0);
        assert_eq!(prefs.font_size, 12.0);
    }

    #[test]
    fn memory_cache_roundtrip() -> anyhow::Result<()> {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        cache.put("k", "v")?;
        assert_eq!(cache.get("k")?.as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn counts_survive_reinitialize_through_sqlite() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let signature = make_prefs(16.0).layout_signature();

        let mut manager = PaginationManager::new(&storage);
        manager.initialize(&book(), &signature, 3);
        manager.update_chapter_page_count(0, 10);
        manager.update_chapter_page_count(1, 5);

        let mut manager = PaginationManager::new(&storage);
        manager.initialize(&book(), &signature, 3);
        assert_eq!(manager.chapter_page_count(0), Some(10));
        assert_eq!(manager.chapter_page_count(1), Some(5));
        assert_eq!(manager.chapter_page_count(2), None);

        let snapshot = manager.update_position(1, 2, None);
        assert_eq!(snapshot.book_page_index, 12);
        assert_eq!(snapshot.book_page_count, 15);
        assert!(!snapshot.book_page_count_exact);
        Ok(())
    }

    #[test]
    fn font_size_change_starts_a_fresh_count_set() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let small = make_prefs(16.0).layout_signature();
        let large = make_prefs(20.0).layout_signature();

        let mut manager = PaginationManager::new(&storage);
        manager.initialize(&book(), &small, 2);
        manager.update_chapter_page_count(0, 8);

        manager.initialize(&book(), &large, 2);
        assert_eq!(manager.chapter_page_count(0), None);
        manager.update_chapter_page_count(0, 11);

        manager.initialize(&book(), &small, 2);
        assert_eq!(manager.chapter_page_count(0), Some(8));
        manager.initialize(&book(), &large, 2);
        assert_eq!(manager.chapter_page_count(0), Some(11));
        Ok(())
    }

    #[test]
    fn prefs_loaded_from_storage_reproduce_the_signature() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut prefs = make_prefs(18.0);
        prefs.cycle_layout_mode();
        storage.save_prefs(&prefs)?;

        let loaded = storage.load_prefs()?;
        assert_eq!(loaded.layout_signature(), prefs.layout_signature());
        Ok(())
    }

    #[test]
    fn whole_book_becomes_exact_once_measured() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let signature = make_prefs(16.0).layout_signature();

        let mut manager = PaginationManager::new(&storage);
        manager.initialize(&book(), &signature, 3);
        manager.update_chapter_page_count(0, 10);
        manager.update_chapter_page_count(1, 5);
        manager.update_chapter_page_count(2, 7);

        let snapshot = manager.update_position(2, 0, None);
        assert_eq!(snapshot.book_page_index, 15);
        assert_eq!(snapshot.book_page_count, 22);
        assert!(snapshot.book_page_count_exact);
        assert_eq!(snapshot.percent(), (16.0 / 22.0) * 100.0);
        Ok(())
    }
}
