use unicode_normalization::UnicodeNormalization;

use crate::models::{Chapter, LAST_CHAPTER, LastRecited, VerseKey};

/// What the detail view is built from. Captured when a chapter is opened;
/// never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSnapshot {
    pub id: u32,
    pub name: String,
    pub name_arabic: String,
    pub verses_count: u32,
    /// Verse to bring into view and select on entry (resume).
    pub verse_key: Option<VerseKey>,
}

impl ChapterSnapshot {
    pub fn of(chapter: &Chapter, verse_key: Option<VerseKey>) -> Self {
        Self {
            id: chapter.id,
            name: chapter.name_simple.clone(),
            name_arabic: chapter.name_arabic.clone(),
            verses_count: chapter.verses_count,
            verse_key,
        }
    }
}

/// The verse picked for copy/play actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection(Option<VerseKey>);

impl Selection {
    pub fn get(&self) -> Option<VerseKey> {
        self.0
    }

    pub fn select(&mut self, key: VerseKey) {
        self.0 = Some(key);
    }

    /// Clicking the selected verse clears it; any other verse takes over.
    pub fn toggle(&mut self, key: VerseKey) {
        if self.0 == Some(key) {
            self.0 = None;
        } else {
            self.0 = Some(key);
        }
    }

    pub fn is_selected(&self, key: VerseKey) -> bool {
        self.0 == Some(key)
    }
}

/// Loaded chapter list plus which chapter, if any, is open.
#[derive(Debug, Default)]
pub struct Navigator {
    chapters: Vec<Chapter>,
    current: Option<ChapterSnapshot>,
}

impl Navigator {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters, current: None }
    }

    pub fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn current(&self) -> Option<&ChapterSnapshot> {
        self.current.as_ref()
    }

    pub fn select(&mut self, snapshot: ChapterSnapshot) -> &ChapterSnapshot {
        self.current.insert(snapshot)
    }

    pub fn select_chapter(&mut self, id: u32, verse_key: Option<VerseKey>) -> Option<&ChapterSnapshot> {
        let snap = ChapterSnapshot::of(self.chapter(id)?, verse_key);
        Some(self.select(snap))
    }

    /// Open the chapter after `current_id`. Nothing happens past the last
    /// chapter or when the next one is not in the loaded list.
    pub fn go_to_next_chapter(&mut self, current_id: u32) -> Option<&ChapterSnapshot> {
        if current_id >= LAST_CHAPTER {
            return None;
        }
        self.select_chapter(current_id + 1, None)
    }

    pub fn back_to_list(&mut self) {
        self.current = None;
    }

    /// Reopen the last-recited chapter with its verse as the target. The
    /// stored chapter name wins over the list's.
    pub fn resume(&mut self, marker: &LastRecited) -> Option<&ChapterSnapshot> {
        let chapter = self.chapter(marker.chapter_id)?;
        let snap = ChapterSnapshot {
            name: marker.chapter_name.clone(),
            ..ChapterSnapshot::of(chapter, Some(marker.verse_key))
        };
        Some(self.select(snap))
    }

    /// Case-insensitive substring match on the simple and translated names,
    /// or an exact match of the chapter number.
    pub fn search(&self, term: &str) -> Vec<&Chapter> {
        if term.is_empty() {
            return self.chapters.iter().collect();
        }
        let needle = term.to_lowercase();
        self.chapters
            .iter()
            .filter(|c| {
                c.name_simple.to_lowercase().contains(&needle)
                    || c.translated_name.name.to_lowercase().contains(&needle)
                    || c.id.to_string() == term
            })
            .collect()
    }

    /// Look a chapter up by number or by name, ignoring case, diacritics and
    /// punctuation ("al-fatiha", "Al Fātiĥah", "1").
    pub fn resolve(&self, query: &str) -> Option<&Chapter> {
        if let Ok(n) = query.trim().parse::<u32>() {
            return self.chapter(n);
        }
        let key = norm_key(query);
        self.chapters.iter().find(|c| {
            norm_key(&c.name_simple) == key
                || norm_key(&c.name_complex) == key
                || norm_key(&c.translated_name.name) == key
        })
    }
}

pub fn norm_key(s: &str) -> String {
    s.nfkd()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
