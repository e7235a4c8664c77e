//! Terminal rendering for the list and detail views.

use owo_colors::OwoColorize;

use crate::models::{Chapter, LastRecited, Verse};
use crate::navigation::ChapterSnapshot;

pub const BISMILLAH: &str = "بِسْمِ ٱللَّهِ ٱلرَّحْمَـٰنِ ٱلرَّحِيمِ";

/// Al-Fatihah carries it as its first verse and At-Tawbah has none.
pub fn shows_bismillah(chapter: u32) -> bool {
    chapter != 1 && chapter != 9
}

pub fn to_eastern_arabic_numerals(n: impl ToString) -> String {
    const DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];
    n.to_string()
        .chars()
        .map(|c| c.to_digit(10).map_or(c, |d| DIGITS[d as usize]))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct View {
    pub color: bool,
}

impl View {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, s: &str, f: impl FnOnce(&str) -> String) -> String {
        if self.color { f(s) } else { s.to_string() }
    }

    pub fn label(&self, s: &str) -> String {
        self.paint(s, |s| s.dimmed().to_string())
    }

    pub fn error(&self, s: &str) -> String {
        self.paint(s, |s| s.red().bold().to_string())
    }

    pub fn chapter_row(&self, c: &Chapter) -> String {
        let id_text = format!("{:>3}", c.id);
        let translated = format!("({})", c.translated_name.name);
        let count = format!("{} verses", c.verses_count);
        format!(
            "{}  {}  {}  {}  {}",
            self.paint(&id_text, |s| s.magenta().bold().to_string()),
            self.paint(&c.name_simple, |s| s.bold().to_string()),
            self.paint(&translated, |s| s.dimmed().to_string()),
            self.paint(&c.name_arabic, |s| s.green().to_string()),
            self.label(&count),
        )
    }

    pub fn last_recited_card(&self, m: &LastRecited) -> String {
        format!(
            "{} {}  {} {}",
            self.label("Last recited:"),
            self.paint(&m.chapter_name, |s| s.bold().cyan().to_string()),
            self.label("verse"),
            self.paint(&m.verse_key.verse.to_string(), |s| s.bold().to_string()),
        )
    }

    pub fn chapter_header(&self, snap: &ChapterSnapshot) -> Vec<String> {
        let mut out = vec![
            self.paint(&snap.name_arabic, |s| s.bold().green().to_string()),
            self.label(&format!("{:03} · {} · {} verses", snap.id, snap.name, snap.verses_count)),
        ];
        if shows_bismillah(snap.id) {
            out.push(BISMILLAH.to_string());
        }
        out
    }

    pub fn verse_row(&self, v: &Verse, selected: bool, playing: bool) -> String {
        let marker = format!("﴿{}﴾", to_eastern_arabic_numerals(v.key.verse));
        let text = if playing {
            self.paint(&v.text_uthmani, |s| s.on_cyan().black().to_string())
        } else if selected {
            self.paint(&v.text_uthmani, |s| s.bold().cyan().to_string())
        } else {
            v.text_uthmani.clone()
        };
        let cursor = match (playing, selected) {
            (true, _) => "▶",
            (false, true) => "›",
            _ => " ",
        };
        format!("{cursor} {:<7} {text} {marker}", v.key.to_string())
    }
}
