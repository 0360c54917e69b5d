//! Core domain types for Pagemark.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookId(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderPrefs {
    pub font_family: String,
    pub font_size: f32,
    pub line_spacing: f32,
    pub margin_horizontal: f32,
    pub margin_vertical: f32,
    pub layout_mode: LayoutMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Paginated,
    Continuous,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Paginated => "paginated",
            LayoutMode::Continuous => "continuous",
        }
    }
}

impl std::fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayoutMode {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paginated" => Ok(LayoutMode::Paginated),
            "continuous" => Ok(LayoutMode::Continuous),
            _ => Err("unknown layout mode"),
        }
    }
}

impl Default for ReaderPrefs {
    fn default() -> Self {
        Self {
            font_family: "serif".to_string(),
            font_size: 16.0,
            line_spacing: 1.5,
            margin_horizontal: 24.0,
            margin_vertical: 16.0,
            layout_mode: LayoutMode::Paginated,
        }
    }
}

impl ReaderPrefs {
    pub fn normalize(&mut self) {
        self.font_family = self.font_family.trim().to_string();
        if self.font_family.is_empty() {
            self.font_family = "serif".to_string();
        }
        self.font_size = self.font_size.clamp(8.0, 72.0);
        self.line_spacing = self.line_spacing.clamp(1.0, 3.0);
        self.margin_horizontal = self.margin_horizontal.clamp(0.0, 200.0);
        self.margin_vertical = self.margin_vertical.clamp(0.0, 200.0);
    }

    pub fn cycle_layout_mode(&mut self) {
        self.layout_mode = match self.layout_mode {
            LayoutMode::Paginated => LayoutMode::Continuous,
            LayoutMode::Continuous => LayoutMode::Paginated,
        };
    }

    /// Canonical encoding of every field that affects how text reflows into
    /// pages. Floats are formatted at fixed precision so two preference
    /// instances that render identically produce the same signature.
    pub fn layout_signature(&self) -> LayoutSignature {
        LayoutSignature(format!(
            "{}|{:.1}|{:.2}|{:.1}|{:.1}|{}",
            self.font_family.trim(),
            self.font_size,
            self.line_spacing,
            self.margin_horizontal,
            self.margin_vertical,
            self.layout_mode.as_str(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutSignature(String);

impl LayoutSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayoutSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup key for persisted pagination metadata: one entry per
/// (book, layout) pair, so counts are never reused across layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(book: &BookId, signature: &LayoutSignature) -> Self {
        Self(format!("{}::{}", book.0, signature.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    pub title: String,
    pub href: String,
    pub page: u32,
    pub level: u32,
}

/// Persisted payload for one cache key. Serialized as JSON; map keys become
/// strings on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRecord {
    pub total_chapters: u32,
    pub page_counts: BTreeMap<u32, u32>,
}

/// A computed reading position. `book_page_count` is exact only once every
/// declared chapter has a measured count; until then it is a conservative
/// estimate that never undershoots the current absolute position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSnapshot {
    pub chapter_index: u32,
    pub chapter_title: Option<String>,
    pub page_index: u32,
    pub chapter_page_count: u32,
    pub book_page_index: u32,
    pub book_page_count: u32,
    pub book_page_count_exact: bool,
}

impl PaginationSnapshot {
    pub fn page_number(&self) -> u32 {
        self.page_index.saturating_add(1)
    }

    pub fn book_page_number(&self) -> u32 {
        self.book_page_index.saturating_add(1)
    }

    pub fn percent(&self) -> f32 {
        if self.book_page_count == 0 {
            0.0
        } else {
            (self.book_page_number() as f32 / self.book_page_count as f32) * 100.0
        }
    }
}

/// Opaque string-keyed store for pagination metadata. Implementations are
/// expected to be local and fast; the session layer never surfaces their
/// failures.
pub trait MetadataCache {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

impl<C: MetadataCache + ?Sized> MetadataCache for &C {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).put(key, value)
    }
}
