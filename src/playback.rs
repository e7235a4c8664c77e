//! Per-chapter playback state machine.
//!
//! The controller owns at most one [`AudioHandle`]. Starting a verse always
//! stops the previous handle first; dropping the controller stops whatever is
//! still playing. Completion and failure arrive asynchronously as
//! [`PlaybackEvent`]s on a channel the controller owns, tagged with the
//! ticket of the handle that produced them so late events from stopped
//! handles are ignored.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::{Verse, VerseKey};

pub type Ticket = u64;
pub type EventSender = mpsc::UnboundedSender<PlaybackEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Finished(Ticket),
    Failed { ticket: Ticket, reason: String },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no player command configured")]
    NoPlayer,
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single playing stream. `stop` must be idempotent.
pub trait AudioHandle {
    fn stop(&mut self);
}

/// Whatever actually decodes and plays audio. Implementations report the
/// end of each stream through `events` with the ticket they were given.
pub trait AudioBackend {
    type Handle: AudioHandle;

    fn start(
        &mut self,
        url: &str,
        ticket: Ticket,
        events: EventSender,
    ) -> Result<Self::Handle, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing(VerseKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The verse has no audio locator.
    NoAudio,
    Started,
    /// Same verse was playing; it is now paused.
    Stopped,
    /// The backend refused to start.
    Failed,
}

/// What the owner of the controller should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Play this verse next, with auto-advance still on.
    Advance(VerseKey),
    /// The last verse of the chapter ended.
    ChapterComplete(u32),
    Failed(VerseKey),
}

struct Active<H: AudioHandle> {
    key: VerseKey,
    auto_advance: bool,
    ticket: Ticket,
    handle: H,
}

pub struct PlaybackController<B: AudioBackend> {
    backend: B,
    chapter: u32,
    verses: Arc<[Verse]>,
    active: Option<Active<B::Handle>>,
    next_ticket: Ticket,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(backend: B, chapter: u32, verses: Arc<[Verse]>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self { backend, chapter, verses, active: None, next_ticket: 0, events_tx, events_rx }
    }

    pub fn state(&self) -> PlaybackState {
        match &self.active {
            Some(a) => PlaybackState::Playing(a.key),
            None => PlaybackState::Idle,
        }
    }

    pub fn playing(&self) -> Option<VerseKey> {
        self.active.as_ref().map(|a| a.key)
    }

    pub fn audio_url(&self, key: VerseKey) -> Option<&str> {
        self.verses.iter().find(|v| v.key == key)?.audio_url.as_deref()
    }

    /// Verse after `key` in ordinal position, if any.
    pub fn next_after(&self, key: VerseKey) -> Option<VerseKey> {
        let idx = self.verses.iter().position(|v| v.key == key)?;
        self.verses.get(idx + 1).map(|v| v.key)
    }

    fn is_last(&self, key: VerseKey) -> bool {
        self.verses.last().is_some_and(|v| v.key == key)
    }

    /// Play/pause toggle for `key`.
    pub fn toggle(&mut self, key: VerseKey, auto_advance: bool) -> PlayOutcome {
        let Some(url) = self.audio_url(key).map(str::to_string) else {
            return PlayOutcome::NoAudio;
        };

        if self.playing() == Some(key) {
            self.stop();
            return PlayOutcome::Stopped;
        }

        self.stop();
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        match self.backend.start(&url, ticket, self.events_tx.clone()) {
            Ok(handle) => {
                debug!(%key, ticket, auto_advance, "playing");
                self.active = Some(Active { key, auto_advance, ticket, handle });
                PlayOutcome::Started
            }
            Err(e) => {
                warn!(%key, error = %e, "audio backend failed to start");
                PlayOutcome::Failed
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut a) = self.active.take() {
            debug!(key = %a.key, ticket = a.ticket, "stopping");
            a.handle.stop();
        }
    }

    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<PlaybackEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Apply a completion or failure event. Returns `None` when the event
    /// belongs to a handle that is no longer active or nothing follows.
    pub fn handle_event(&mut self, event: PlaybackEvent) -> Option<Signal> {
        let ticket = match &event {
            PlaybackEvent::Finished(t) | PlaybackEvent::Failed { ticket: t, .. } => *t,
        };
        if self.active.as_ref().map(|a| a.ticket) != Some(ticket) {
            debug!(ticket, "stale playback event");
            return None;
        }
        let mut done = self.active.take()?;
        done.handle.stop();

        match event {
            PlaybackEvent::Failed { reason, .. } => {
                warn!(key = %done.key, %reason, "playback failed");
                Some(Signal::Failed(done.key))
            }
            PlaybackEvent::Finished(_) if self.is_last(done.key) => {
                debug!(chapter = self.chapter, "chapter complete");
                Some(Signal::ChapterComplete(self.chapter))
            }
            PlaybackEvent::Finished(_) if done.auto_advance => {
                self.next_after(done.key).map(Signal::Advance)
            }
            PlaybackEvent::Finished(_) => None,
        }
    }
}

impl<B: AudioBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
