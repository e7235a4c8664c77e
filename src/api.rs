use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{TransportError, Unavailable};
use crate::models::{
    ApiVerse, Chapter, ChapterResponse, ChaptersResponse, FIRST_CHAPTER, LAST_CHAPTER, Verse,
    VerseKey,
};

/// Enough for the longest chapter (286 verses) in a single page.
pub const PER_PAGE: u32 = 300;

/// Plain GET returning the response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quran-explorer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn send_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout { url: url.to_string() }
    } else {
        TransportError::Send { url: url.to_string(), message: e.to_string() }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        let resp = self.client.get(url).send().await.map_err(|e| send_error(url, e))?;

        let status = resp.status(); // capture before the body consumes resp
        if !status.is_success() {
            return Err(TransportError::Status { url: url.to_string(), status: status.as_u16() });
        }
        resp.text().await.map_err(|e| send_error(url, e))
    }
}

/// Read-only client for the chapter list and chapter detail endpoints.
/// Every successful response is memoized in the shared [`ResponseCache`].
pub struct ContentClient<T = HttpTransport> {
    transport: T,
    cache: Arc<ResponseCache>,
    api_base: String,
    audio_base: String,
    reciter: u32,
}

impl ContentClient<HttpTransport> {
    pub fn from_config(config: &Config, cache: Arc<ResponseCache>) -> reqwest::Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::new(transport, cache, config))
    }
}

impl<T: Transport> ContentClient<T> {
    pub fn new(transport: T, cache: Arc<ResponseCache>, config: &Config) -> Self {
        Self {
            transport,
            cache,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            audio_base: config.audio_base.clone(),
            reciter: config.reciter,
        }
    }

    pub fn chapters_url(&self) -> String {
        format!("{}/chapters?language=en", self.api_base)
    }

    pub fn chapter_detail_url(&self, chapter: u32) -> Result<String, Unavailable> {
        let base = format!("{}/verses/by_chapter/{chapter}", self.api_base);
        let per_page = PER_PAGE.to_string();
        let reciter = self.reciter.to_string();
        let url = Url::parse_with_params(
            &base,
            [
                ("language", "en"),
                ("words", "false"),
                ("audio", reciter.as_str()),
                ("fields", "text_uthmani"),
                ("per_page", per_page.as_str()),
            ],
        )
        .map_err(|e| TransportError::Send { url: base.clone(), message: e.to_string() })?;
        Ok(url.to_string())
    }

    /// `check` runs on the decoded body before it is cached, so a rejected
    /// response is fetched again next time.
    async fn fetch_cached<R: DeserializeOwned>(
        &self,
        url: &str,
        check: impl Fn(&R) -> Result<(), Unavailable>,
    ) -> Result<R, Unavailable> {
        let malformed = |source: serde_json::Error| Unavailable::Malformed { url: url.to_string(), source };

        let value = self
            .cache
            .get_or_fetch(url, || async {
                let body = self.transport.get(url).await?;
                let value: Value = serde_json::from_str(&body).map_err(malformed)?;
                check(&R::deserialize(&value).map_err(malformed)?)?;
                Ok::<_, Unavailable>(value)
            })
            .await?;

        R::deserialize(&value).map_err(malformed)
    }

    #[instrument(skip(self))]
    pub async fn list_chapters(&self) -> Result<Vec<Chapter>, Unavailable> {
        let url = self.chapters_url();
        let resp: ChaptersResponse = self.fetch_cached(&url, |_| Ok(())).await?;
        debug!(count = resp.chapters.len(), "chapters loaded");
        Ok(resp.chapters)
    }

    /// Verses of `chapter` in order, with audio locators resolved.
    #[instrument(skip(self))]
    pub async fn chapter_detail(&self, chapter: u32) -> Result<Vec<Verse>, Unavailable> {
        if !(FIRST_CHAPTER..=LAST_CHAPTER).contains(&chapter) {
            return Err(Unavailable::UnknownChapter(chapter));
        }
        let url = self.chapter_detail_url(chapter)?;
        let resp: ChapterResponse = self
            .fetch_cached(&url, |r: &ChapterResponse| {
                match r.pagination.as_ref().and_then(|p| p.next_page) {
                    Some(next_page) => Err(Unavailable::Truncated { chapter, next_page }),
                    None => Ok(()),
                }
            })
            .await?;

        let mut out: Vec<Verse> = Vec::with_capacity(resp.verses.len());
        for v in resp.verses {
            let verse = self.to_verse(chapter, v)?;
            if out.last().is_some_and(|prev| prev.key >= verse.key) {
                return Err(Unavailable::VerseOrder { chapter, key: verse.key.to_string() });
            }
            out.push(verse);
        }
        debug!(count = out.len(), "verses loaded");
        Ok(out)
    }

    /// Like [`chapter_detail`](Self::chapter_detail), but fails when the
    /// number of verses differs from what the chapter list advertised.
    pub async fn chapter_verses(
        &self,
        chapter: u32,
        verses_count: u32,
    ) -> Result<Vec<Verse>, Unavailable> {
        let verses = self.chapter_detail(chapter).await?;
        if verses.len() != verses_count as usize {
            return Err(Unavailable::VerseCountMismatch {
                chapter,
                expected: verses_count,
                actual: verses.len(),
            });
        }
        Ok(verses)
    }

    fn to_verse(&self, chapter: u32, v: ApiVerse) -> Result<Verse, Unavailable> {
        let key: VerseKey = v
            .verse_key
            .parse()
            .ok()
            .filter(|k: &VerseKey| k.chapter == chapter)
            .ok_or_else(|| Unavailable::VerseOrder { chapter, key: v.verse_key.clone() })?;
        let audio_url = v
            .audio
            .map(|a| a.url)
            .filter(|u| !u.is_empty())
            .map(|u| resolve_audio_url(&self.audio_base, &u));
        Ok(Verse { id: v.id, key, text_uthmani: v.text_uthmani, audio_url })
    }
}

pub fn resolve_audio_url(base: &str, u: &str) -> String {
    if let Some(rest) = u.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if u.starts_with("http://") || u.starts_with("https://") {
        return u.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), u.trim_start_matches('/'))
}
