//! An open chapter: its verses, the selected verse and the playback
//! controller. Dropping a session stops its audio.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{ContentClient, Transport};
use crate::error::{Error, Result};
use crate::models::{LastRecited, Verse, VerseKey};
use crate::navigation::{ChapterSnapshot, Selection};
use crate::playback::{
    AudioBackend, PlayOutcome, PlaybackController, PlaybackEvent, PlaybackState, Signal,
};
use crate::store::MarkerStore;

/// Something the view should react to after a playback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Auto-advance started this verse.
    Advanced(VerseKey),
    /// The chapter's last verse finished; the navigator should move on.
    ChapterComplete(u32),
}

pub struct ChapterSession<B: AudioBackend> {
    snapshot: ChapterSnapshot,
    verses: Arc<[Verse]>,
    selection: Selection,
    controller: PlaybackController<B>,
    store: Arc<dyn MarkerStore>,
}

impl<B: AudioBackend> ChapterSession<B> {
    /// Load the chapter's verses and build the session. The resume target,
    /// when present among the verses, starts out selected.
    pub async fn open<T: Transport>(
        client: &ContentClient<T>,
        snapshot: ChapterSnapshot,
        backend: B,
        store: Arc<dyn MarkerStore>,
    ) -> Result<Self> {
        let verses = client.chapter_verses(snapshot.id, snapshot.verses_count).await?;
        Ok(Self::with_verses(snapshot, verses.into(), backend, store))
    }

    pub fn with_verses(
        snapshot: ChapterSnapshot,
        verses: Arc<[Verse]>,
        backend: B,
        store: Arc<dyn MarkerStore>,
    ) -> Self {
        let mut selection = Selection::default();
        if let Some(target) = snapshot.verse_key.filter(|k| verses.iter().any(|v| v.key == *k)) {
            selection.select(target);
        }
        let controller = PlaybackController::new(backend, snapshot.id, verses.clone());
        Self { snapshot, verses, selection, controller, store }
    }

    pub fn snapshot(&self) -> &ChapterSnapshot {
        &self.snapshot
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn verse(&self, key: VerseKey) -> Option<&Verse> {
        self.verses.iter().find(|v| v.key == key)
    }

    pub fn selected(&self) -> Option<VerseKey> {
        self.selection.get()
    }

    /// Text of the selected verse, for copying.
    pub fn selected_text(&self) -> Option<&str> {
        self.verse(self.selection.get()?).map(|v| v.text_uthmani.as_str())
    }

    pub fn playing(&self) -> Option<VerseKey> {
        self.controller.playing()
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn toggle_selection(&mut self, key: VerseKey) {
        self.selection.toggle(key);
    }

    /// Play or pause `key`. Records it as last recited and selects it
    /// unless it has no audio.
    pub fn request_play(&mut self, key: VerseKey, auto_advance: bool) -> Result<PlayOutcome> {
        if self.controller.audio_url(key).is_none() {
            return Ok(PlayOutcome::NoAudio);
        }

        let marker = LastRecited {
            chapter_id: self.snapshot.id,
            chapter_name: self.snapshot.name.clone(),
            verse_key: key,
        };
        if let Err(e) = self.store.save(&marker) {
            warn!(error = %e, "could not persist last recited verse");
        }
        self.selection.select(key);

        match self.controller.toggle(key, auto_advance) {
            PlayOutcome::Failed => Err(Error::PlaybackFailed(key)),
            outcome => Ok(outcome),
        }
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        self.controller.next_event().await
    }

    pub fn try_next_event(&mut self) -> Option<PlaybackEvent> {
        self.controller.try_next_event()
    }

    /// Feed a completion/failure event through the controller, following
    /// auto-advance within the chapter.
    pub fn handle_event(&mut self, event: PlaybackEvent) -> Result<Option<SessionEvent>> {
        match self.controller.handle_event(event) {
            None => Ok(None),
            Some(Signal::Failed(key)) => Err(Error::PlaybackFailed(key)),
            Some(Signal::ChapterComplete(id)) => {
                info!(chapter = id, "chapter finished");
                Ok(Some(SessionEvent::ChapterComplete(id)))
            }
            Some(Signal::Advance(next)) => match self.request_play(next, true)? {
                PlayOutcome::Started => Ok(Some(SessionEvent::Advanced(next))),
                _ => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{FakeTransport, chapters_json, verses_json};
    use crate::cache::ResponseCache;
    use crate::config::Config;
    use crate::error::Unavailable;
    use crate::navigation::Navigator;
    use crate::playback::tests::{FakeBackend, verses};
    use crate::store::tests::MemoryStore;

    fn snapshot(id: u32, count: u32, target: Option<VerseKey>) -> ChapterSnapshot {
        ChapterSnapshot {
            id,
            name: format!("Surah {id}"),
            name_arabic: "سورة".into(),
            verses_count: count,
            verse_key: target,
        }
    }

    fn key(s: &str) -> VerseKey {
        s.parse().unwrap()
    }

    #[test]
    fn playing_records_marker_and_selects() {
        let store = Arc::new(MemoryStore::default());
        let mut s = ChapterSession::with_verses(
            snapshot(2, 3, None),
            verses(2, 3),
            FakeBackend::default(),
            store.clone(),
        );

        assert_eq!(s.request_play(key("2:2"), false).unwrap(), PlayOutcome::Started);
        assert_eq!(s.selected(), Some(key("2:2")));
        assert_eq!(s.playing(), Some(key("2:2")));
        assert_eq!(
            store.load(),
            Some(LastRecited { chapter_id: 2, chapter_name: "Surah 2".into(), verse_key: key("2:2") })
        );

        // pausing keeps the selection
        assert_eq!(s.request_play(key("2:2"), false).unwrap(), PlayOutcome::Stopped);
        assert_eq!(s.state(), PlaybackState::Idle);
        assert_eq!(s.selected(), Some(key("2:2")));
    }

    #[test]
    fn selection_is_independent_of_playback() {
        let mut s = ChapterSession::with_verses(
            snapshot(1, 7, None),
            verses(1, 7),
            FakeBackend::default(),
            Arc::new(MemoryStore::default()),
        );
        s.toggle_selection(key("1:1"));
        s.toggle_selection(key("1:1"));
        assert_eq!(s.selected(), None);

        s.toggle_selection(key("1:1"));
        s.toggle_selection(key("1:2"));
        assert_eq!(s.selected(), Some(key("1:2")));
        assert_eq!(s.playing(), None);
    }

    #[test]
    fn no_audio_leaves_everything_untouched() {
        let store = Arc::new(MemoryStore::default());
        let mut vs = verses(2, 3).to_vec();
        vs[0].audio_url = None;
        let mut s = ChapterSession::with_verses(snapshot(2, 3, None), vs.into(), FakeBackend::default(), store.clone());

        assert_eq!(s.request_play(key("2:1"), true).unwrap(), PlayOutcome::NoAudio);
        assert_eq!(s.selected(), None);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn auto_advance_plays_through_and_signals_completion() {
        let backend = FakeBackend::default();
        let store = Arc::new(MemoryStore::default());
        let mut s = ChapterSession::with_verses(snapshot(2, 3, None), verses(2, 3), backend.clone(), store.clone());

        s.request_play(key("2:1"), true).unwrap();

        backend.finish_current();
        let ev = s.try_next_event().unwrap();
        assert_eq!(s.handle_event(ev).unwrap(), Some(SessionEvent::Advanced(key("2:2"))));
        assert_eq!(s.playing(), Some(key("2:2")));

        backend.finish_current();
        let ev = s.try_next_event().unwrap();
        assert_eq!(s.handle_event(ev).unwrap(), Some(SessionEvent::Advanced(key("2:3"))));
        assert_eq!(store.load().unwrap().verse_key, key("2:3"));

        backend.finish_current();
        let ev = s.try_next_event().unwrap();
        assert_eq!(s.handle_event(ev).unwrap(), Some(SessionEvent::ChapterComplete(2)));
        assert_eq!(s.playing(), None);
        assert!(s.try_next_event().is_none());
        assert_eq!(
            backend.log(),
            ["start 2:1", "stop 2:1", "start 2:2", "stop 2:2", "start 2:3", "stop 2:3"]
        );
    }

    #[test]
    fn playback_failure_is_surfaced_with_verse() {
        let backend = FakeBackend::default();
        let mut s = ChapterSession::with_verses(
            snapshot(2, 3, None),
            verses(2, 3),
            backend.clone(),
            Arc::new(MemoryStore::default()),
        );

        s.request_play(key("2:1"), true).unwrap();
        backend.fail_current();
        let ev = s.try_next_event().unwrap();
        let err = s.handle_event(ev).unwrap_err();
        assert!(matches!(err, Error::PlaybackFailed(k) if k == key("2:1")));
        assert_eq!(err.to_string(), "could not play audio for 2:1");
        assert_eq!(s.state(), PlaybackState::Idle);
    }

    #[test]
    fn resume_target_is_selected_only_when_present() {
        let s = ChapterSession::with_verses(
            snapshot(2, 3, Some(key("2:3"))),
            verses(2, 3),
            FakeBackend::default(),
            Arc::new(MemoryStore::default()),
        );
        assert_eq!(s.selected(), Some(key("2:3")));
        assert_eq!(s.selected_text(), Some("text 3"));

        let s = ChapterSession::with_verses(
            snapshot(2, 3, Some(key("2:9"))),
            verses(2, 3),
            FakeBackend::default(),
            Arc::new(MemoryStore::default()),
        );
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn dropping_session_stops_audio() {
        let backend = FakeBackend::default();
        let mut s = ChapterSession::with_verses(
            snapshot(2, 3, None),
            verses(2, 3),
            backend.clone(),
            Arc::new(MemoryStore::default()),
        );
        s.request_play(key("2:1"), true).unwrap();
        drop(s);
        assert_eq!(backend.0.borrow().live, 0);
    }

    #[tokio::test]
    async fn open_loads_verses_and_chains_into_next_chapter() {
        let fake = Arc::new(FakeTransport::default());
        let client = ContentClient::new(fake.clone(), Arc::new(ResponseCache::new()), &Config::default());
        fake.respond(&client.chapters_url(), Ok(chapters_json()));
        fake.respond(&client.chapter_detail_url(1).unwrap(), Ok(verses_json(1, 7)));
        fake.respond(&client.chapter_detail_url(2).unwrap(), Ok(verses_json(2, 3)));

        let mut nav = Navigator::new(client.list_chapters().await.unwrap());
        let snap = nav.select_chapter(1, None).unwrap().clone();
        let backend = FakeBackend::default();
        let store: Arc<dyn MarkerStore> = Arc::new(MemoryStore::default());
        let mut s = ChapterSession::open(&client, snap, backend.clone(), store.clone()).await.unwrap();
        assert_eq!(s.verses().len(), 7);

        s.request_play(key("1:7"), true).unwrap();
        backend.finish_current();
        let ev = s.next_event().await.unwrap();
        let Some(SessionEvent::ChapterComplete(done)) = s.handle_event(ev).unwrap() else {
            panic!("expected chapter completion");
        };

        let next = nav.go_to_next_chapter(done).unwrap().clone();
        drop(s);
        let s = ChapterSession::open(&client, next, backend.clone(), store).await.unwrap();
        assert_eq!(s.snapshot().id, 2);
        assert_eq!(s.verses().len(), 3);
        assert_eq!(s.selected(), None);

        // reopening chapter 2 is served from the cache
        let calls = fake.calls();
        ChapterSession::open(&client, s.snapshot().clone(), backend, Arc::new(MemoryStore::default()))
            .await
            .unwrap();
        assert_eq!(fake.calls(), calls);
    }

    #[tokio::test]
    async fn open_surfaces_content_unavailable() {
        let fake = Arc::new(FakeTransport::default());
        let client = ContentClient::new(fake.clone(), Arc::new(ResponseCache::new()), &Config::default());
        fake.respond(&client.chapter_detail_url(5).unwrap(), Err(500));

        let res = ChapterSession::open(
            &client,
            snapshot(5, 120, None),
            FakeBackend::default(),
            Arc::new(MemoryStore::default()),
        )
        .await;
        assert!(matches!(res, Err(Error::ContentUnavailable(Unavailable::Transport(_)))));
    }
}
