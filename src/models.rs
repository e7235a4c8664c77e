use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const FIRST_CHAPTER: u32 = 1;
pub const LAST_CHAPTER: u32 = 114;

/// Chapters (surahs) as returned by `/chapters`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Chapter {
    pub id: u32,
    pub name_simple: String,
    #[serde(default)]
    pub name_complex: String,
    pub name_arabic: String,
    pub verses_count: u32,
    pub translated_name: TranslatedName,

    // informational; the API may drop these
    #[serde(default)]
    pub revelation_place: Option<String>,
    #[serde(default)]
    pub revelation_order: Option<u32>,
    #[serde(default)]
    pub bismillah_pre: Option<bool>,
    #[serde(default)]
    pub pages: Option<[u32; 2]>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TranslatedName {
    #[serde(default)]
    pub language_name: Option<String>,
    pub name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ChaptersResponse {
    pub chapters: Vec<Chapter>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ChapterResponse {
    pub verses: Vec<ApiVerse>,
    pub pagination: Option<Pagination>,
}

/// Only `next_page` is read: a chapter must arrive in one page.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Pagination {
    pub next_page: Option<u32>,
}

/// Verse as it comes off the wire. `verse_key` and `text_uthmani` are
/// required: a response without them fails to decode.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ApiVerse {
    pub id: u32,
    pub verse_key: String,
    pub text_uthmani: String,
    #[serde(default)]
    pub audio: Option<Audio>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Audio {
    pub url: String,
}

/// A verse ready for display and playback.
#[derive(Clone, Debug, PartialEq)]
pub struct Verse {
    pub id: u32,
    pub key: VerseKey,
    pub text_uthmani: String,
    pub audio_url: Option<String>,
}

/// "chapter:verse", ordered by chapter then verse number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerseKey {
    pub chapter: u32,
    pub verse: u32,
}

impl VerseKey {
    pub fn new(chapter: u32, verse: u32) -> Self {
        Self { chapter, verse }
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("bad verse key: {0:?}")]
pub struct BadVerseKey(pub String);

impl FromStr for VerseKey {
    type Err = BadVerseKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || BadVerseKey(s.to_string());
        let (c, v) = s.split_once(':').ok_or_else(bad)?;
        let chapter = c.trim().parse().map_err(|_| bad())?;
        let verse = v.trim().parse().map_err(|_| bad())?;
        if chapter == 0 || verse == 0 {
            return Err(bad());
        }
        Ok(Self { chapter, verse })
    }
}

impl TryFrom<String> for VerseKey {
    type Error = BadVerseKey;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VerseKey> for String {
    fn from(k: VerseKey) -> Self {
        k.to_string()
    }
}

/// Most recently played verse, persisted across runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastRecited {
    pub chapter_id: u32,
    pub chapter_name: String,
    pub verse_key: VerseKey,
}
