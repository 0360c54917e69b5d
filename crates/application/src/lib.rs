//! Pagination session management for Pagemark.

use std::collections::BTreeMap;

use pagemark_core::{
    BookId, CacheKey, LayoutSignature, MetadataCache, PaginationRecord, PaginationSnapshot,
    TocItem,
};

#[derive(Debug)]
pub struct PaginationManager<C> {
    cache: C,
    cache_key: Option<CacheKey>,
    total_chapters: u32,
    chapter_page_counts: BTreeMap<u32, u32>,
    toc: Vec<TocItem>,
    last_snapshot: Option<PaginationSnapshot>,
}

impl<C: MetadataCache> PaginationManager<C> {
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            cache_key: None,
            total_chapters: 0,
            chapter_page_counts: BTreeMap::new(),
            toc: Vec::new(),
            last_snapshot: None,
        }
    }

    /// Scopes the session to one (book, layout) pair. Same pair and chapter
    /// count is a no-op; anything else drops the in-memory counts and the
    /// last snapshot, then reloads whatever the cache holds for the new key.
    pub fn initialize(&mut self, book: &BookId, layout: &LayoutSignature, chapter_count: u32) {
        let key = CacheKey::new(book, layout);
        if self.cache_key.as_ref() == Some(&key) && self.total_chapters == chapter_count {
            return;
        }

        self.cache_key = Some(key);
        self.total_chapters = chapter_count;
        self.chapter_page_counts.clear();
        self.last_snapshot = None;
        self.reload_counts();
    }

    fn reload_counts(&mut self) {
        let Some(key) = self.cache_key.as_ref() else {
            return;
        };
        let payload = match self.cache.get(key.as_str()) {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(err) => {
                log::debug!("pagination cache read failed for {}: {err:#}", key.as_str());
                return;
            }
        };
        let record = match serde_json::from_str::<PaginationRecord>(&payload) {
            Ok(record) => record,
            Err(err) => {
                log::debug!(
                    "discarding malformed pagination record for {}: {err}",
                    key.as_str()
                );
                return;
            }
        };
        self.chapter_page_counts = record
            .page_counts
            .into_iter()
            .filter(|&(_, count)| count > 0)
            .collect();
    }

    pub fn update_table_of_contents(&mut self, items: Vec<TocItem>) {
        self.toc = items;
    }

    /// Records a measured page count (clamped to at least 1). The only
    /// mutation that persists: the whole record is rewritten under the
    /// current cache key. A negative chapter index or an unchanged count is
    /// a no-op.
    pub fn update_chapter_page_count(&mut self, chapter_index: i32, page_count: i32) {
        if chapter_index < 0 {
            return;
        }
        let chapter = chapter_index as u32;
        let count = page_count.max(1) as u32;
        if self.chapter_page_counts.get(&chapter) == Some(&count) {
            return;
        }
        self.chapter_page_counts.insert(chapter, count);
        self.persist_counts();
    }

    fn persist_counts(&self) {
        let Some(key) = self.cache_key.as_ref() else {
            return;
        };
        let record = PaginationRecord {
            total_chapters: self.total_chapters,
            page_counts: self.chapter_page_counts.clone(),
        };
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("serialize pagination record for {}: {err}", key.as_str());
                return;
            }
        };
        if let Err(err) = self.cache.put(key.as_str(), &payload) {
            log::warn!("pagination cache write failed for {}: {err:#}", key.as_str());
        }
    }

    /// Computes the snapshot for a caller-supplied (chapter, page) coordinate
    /// and remembers it as the last known position. The coordinate is not
    /// validated; an unmeasured chapter is assumed to end at the current page
    /// until a real count arrives.
    pub fn update_position(
        &mut self,
        chapter_index: u32,
        page_index: u32,
        explicit_title: Option<&str>,
    ) -> PaginationSnapshot {
        let chapter_page_count = self
            .chapter_page_counts
            .get(&chapter_index)
            .copied()
            .unwrap_or_else(|| page_index.saturating_add(1));
        let page_offset = chapter_offset(&self.chapter_page_counts, chapter_index);
        let (book_page_count, book_page_count_exact) = book_page_total(
            &self.chapter_page_counts,
            self.total_chapters,
            page_offset,
            chapter_page_count,
        );

        let snapshot = PaginationSnapshot {
            chapter_index,
            chapter_title: resolve_title(&self.toc, chapter_index, explicit_title),
            page_index,
            chapter_page_count,
            book_page_index: page_offset.saturating_add(page_index),
            book_page_count,
            book_page_count_exact,
        };
        self.last_snapshot = Some(snapshot.clone());
        snapshot
    }

    pub fn last_snapshot(&self) -> Option<&PaginationSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn chapter_page_count(&self, chapter_index: u32) -> Option<u32> {
        self.chapter_page_counts.get(&chapter_index).copied()
    }

    pub fn measured_chapters(&self) -> usize {
        self.chapter_page_counts.len()
    }

    pub fn total_chapters(&self) -> u32 {
        self.total_chapters
    }

    pub fn is_initialized(&self) -> bool {
        self.cache_key.is_some()
    }

    /// Returns the session to the uninitialized state. Persisted entries
    /// stay around for future reuse.
    pub fn clear(&mut self) {
        self.cache_key = None;
        self.total_chapters = 0;
        self.chapter_page_counts.clear();
        self.toc.clear();
        self.last_snapshot = None;
    }
}

/// Book-wide page at which a chapter starts. Unmeasured preceding chapters
/// contribute nothing, so this underestimates until the book has been paged
/// through once.
fn chapter_offset(counts: &BTreeMap<u32, u32>, chapter_index: u32) -> u32 {
    counts.range(..chapter_index).map(|(_, count)| count).sum()
}

/// Total pages in the book, plus whether that total is exact. Exact requires
/// every declared chapter to carry a measured count; otherwise the estimate
/// never undershoots the current absolute position.
fn book_page_total(
    counts: &BTreeMap<u32, u32>,
    total_chapters: u32,
    page_offset: u32,
    chapter_page_count: u32,
) -> (u32, bool) {
    if total_chapters > 0 && counts.len() as u32 == total_chapters {
        (counts.values().sum(), true)
    } else {
        let estimate = page_offset.saturating_add(chapter_page_count.max(1));
        (estimate.max(page_offset.saturating_add(1)), false)
    }
}

fn resolve_title(toc: &[TocItem], chapter_index: u32, explicit: Option<&str>) -> Option<String> {
    if let Some(title) = explicit {
        let title = title.trim();
        if !title.is_empty() {
            return Some(title.to_string());
        }
    }
    toc.get(chapter_index as usize).and_then(|item| {
        let title = item.title.trim();
        (!title.is_empty()).then(|| title.to_string())
    })
}
