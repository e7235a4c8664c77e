use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quran_explorer::config::{
    self, Config, DEFAULT_API_BASE, DEFAULT_AUDIO_BASE, DEFAULT_PLAYER, DEFAULT_RECITER,
};
use quran_explorer::models::VerseKey;
use quran_explorer::navigation::ChapterSnapshot;
use quran_explorer::playback::{PlayOutcome, PlaybackState};
use quran_explorer::player::ProcessBackend;
use quran_explorer::store::{JsonFileStore, MarkerStore};
use quran_explorer::view::View;
use quran_explorer::{ChapterSession, ContentClient, Navigator, ResponseCache, SessionEvent};

#[derive(Parser)]
#[command(
    name = "quran-explorer",
    version,
    about = "Read the Quran and listen to it verse by verse",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,

    #[arg(long, global = true, env = "QURAN_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,
    #[arg(long, global = true, env = "QURAN_AUDIO_BASE", default_value = DEFAULT_AUDIO_BASE)]
    audio_base: String,
    /// Recitation id on api.quran.com
    #[arg(long, global = true, env = "QURAN_RECITER", default_value_t = DEFAULT_RECITER)]
    reciter: u32,
    #[arg(long, global = true, env = "QURAN_TIMEOUT_SECS", default_value_t = 15)]
    timeout_secs: u64,
    /// Player command; the verse URL is appended as the last argument
    #[arg(long, global = true, env = "QURAN_PLAYER", default_value = DEFAULT_PLAYER)]
    player: String,
    /// Where the last-recited marker is kept
    #[arg(long, global = true, env = "QURAN_STATE_FILE")]
    state_file: Option<PathBuf>,
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// List chapters, optionally filtered by name or number
    Ls {
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Print a chapter
    Read {
        chapter: String,
        /// Verse number to select
        #[arg(long)]
        verse: Option<u32>,
    },
    /// Recite a chapter verse by verse
    Play {
        chapter: String,
        #[arg(long, default_value_t = 1)]
        from: u32,
        /// Stop after the first verse
        #[arg(long, default_value_t = false)]
        no_auto_advance: bool,
        /// Carry on into the next chapter when this one ends
        #[arg(long, default_value_t = false)]
        continuous: bool,
    },
    /// Open the last recited verse
    Resume {
        #[arg(long, default_value_t = false)]
        play: bool,
        #[arg(long, default_value_t = false)]
        continuous: bool,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            api_base: self.api_base.clone(),
            audio_base: self.audio_base.clone(),
            reciter: self.reciter,
            timeout: Duration::from_secs(self.timeout_secs),
            player: config::split_command(&self.player),
            state_file: self.state_file.clone().unwrap_or_else(config::default_state_file),
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "quran_explorer=debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_filter(env_filter))
        .init();
}

struct App {
    config: Config,
    client: ContentClient,
    store: Arc<dyn MarkerStore>,
    nav: Navigator,
    view: View,
}

impl App {
    async fn open(&self, snap: ChapterSnapshot) -> Result<ChapterSession<ProcessBackend>> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("Loading {}…", snap.name));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let backend = ProcessBackend::new(self.config.player.clone());
        let res = ChapterSession::open(&self.client, snap, backend, self.store.clone()).await;
        spinner.finish_and_clear();
        res.context("Failed to load Surah details. Please try again.")
    }

    fn print_header(&self, snap: &ChapterSnapshot) {
        for line in self.view.chapter_header(snap) {
            println!("{line}");
        }
        println!();
    }

    fn print_chapter(&self, s: &ChapterSession<ProcessBackend>) {
        self.print_header(s.snapshot());
        for v in s.verses() {
            let row = self.view.verse_row(v, s.selected() == Some(v.key), s.playing() == Some(v.key));
            println!("{row}");
        }
        if let (Some(key), Some(text)) = (s.selected(), s.selected_text()) {
            println!();
            println!("{} {key}", self.view.label("Selected"));
            println!("{text}");
        }
    }

    fn print_playing(&self, s: &ChapterSession<ProcessBackend>, key: VerseKey) {
        if let Some(v) = s.verse(key) {
            println!("{}", self.view.verse_row(v, true, true));
        }
    }

    fn lookup(&mut self, query: &str) -> Result<ChapterSnapshot> {
        let c = self.nav.resolve(query).with_context(|| {
            format!("{} {query}", self.view.error("Unknown chapter:"))
        })?;
        let id = c.id;
        self.nav
            .select_chapter(id, None)
            .cloned()
            .with_context(|| format!("chapter {id} is not loaded"))
    }

    /// Play from `start` until the chapter (or, with `continuous`, the whole
    /// mushaf) is done, playback stops, or Ctrl-C.
    async fn recite(
        &mut self,
        mut session: ChapterSession<ProcessBackend>,
        start: VerseKey,
        auto_advance: bool,
        continuous: bool,
    ) -> Result<()> {
        self.print_header(session.snapshot());
        match session.request_play(start, auto_advance)? {
            PlayOutcome::Started => self.print_playing(&session, start),
            _ => {
                println!("{}", self.view.error(&format!("No audio for {start}")));
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                event = session.next_event() => {
                    let Some(event) = event else { break };
                    match session.handle_event(event) {
                        Ok(Some(SessionEvent::Advanced(key))) => self.print_playing(&session, key),
                        Ok(Some(SessionEvent::ChapterComplete(id))) => {
                            let Some(next) = self.nav.go_to_next_chapter(id).cloned() else {
                                println!("{}", self.view.label("Sadaqa Allahu al-Azim"));
                                break;
                            };
                            if !continuous {
                                println!("{} {}", self.view.label("Next:"), next.name);
                                break;
                            }
                            session.stop();
                            session = tokio::select! {
                                opened = self.open(next) => opened?,
                                _ = tokio::signal::ctrl_c() => break,
                            };
                            println!();
                            self.print_header(session.snapshot());
                            let first = VerseKey::new(session.snapshot().id, 1);
                            if session.request_play(first, true)? == PlayOutcome::Started {
                                self.print_playing(&session, first);
                            }
                        }
                        Ok(None) if session.state() == PlaybackState::Idle => break,
                        Ok(None) => {}
                        Err(e) => {
                            eprintln!("{}", self.view.error(&e.to_string()));
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    session.stop();
                    break;
                }
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let color = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
    let config = cli.config();
    let cache = Arc::new(ResponseCache::new());
    let client = ContentClient::from_config(&config, cache).context("building HTTP client")?;
    let store: Arc<dyn MarkerStore> = Arc::new(JsonFileStore::new(&config.state_file));

    let chapters = client
        .list_chapters()
        .await
        .context("Failed to load Surahs. Please try again later.")?;

    let mut app = App { config, client, store, nav: Navigator::new(chapters), view: View::new(color) };

    match cli.cmd {
        Cmd::Ls { search } => {
            if let Some(m) = app.store.load() {
                println!("{}", app.view.last_recited_card(&m));
                println!();
            }
            let hits = app.nav.search(search.as_deref().unwrap_or(""));
            if hits.is_empty() {
                println!("{}", app.view.label("No Surahs found."));
            }
            for c in hits {
                println!("{}", app.view.chapter_row(c));
            }
        }

        Cmd::Read { chapter, verse } => {
            let mut snap = app.lookup(&chapter)?;
            snap.verse_key = verse.map(|n| VerseKey::new(snap.id, n));
            let session = app.open(snap).await?;
            app.print_chapter(&session);
        }

        Cmd::Play { chapter, from, no_auto_advance, continuous } => {
            let snap = app.lookup(&chapter)?;
            let start = VerseKey::new(snap.id, from);
            let session = app.open(snap).await?;
            app.recite(session, start, !no_auto_advance, continuous).await?;
        }

        Cmd::Resume { play, continuous } => {
            let marker = app.store.load().context("Nothing recited yet")?;
            let snap = app
                .nav
                .resume(&marker)
                .cloned()
                .with_context(|| format!("chapter {} is not loaded", marker.chapter_id))?;
            let session = app.open(snap).await?;
            if play {
                app.recite(session, marker.verse_key, true, continuous).await?;
            } else {
                app.print_chapter(&session);
            }
        }
    }

    Ok(())
}
