use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.quran.com/api/v4";
pub const DEFAULT_AUDIO_BASE: &str = "https://verses.quran.com/";
/// Mishary Rashid Alafasy
pub const DEFAULT_RECITER: u32 = 7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_PLAYER: &str = "ffplay -nodisp -autoexit -loglevel error";

/// Runtime settings shared by the content client, the player and the
/// marker store.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub audio_base: String,
    pub reciter: u32,
    pub timeout: Duration,
    /// Program and leading arguments; the audio URL is appended.
    pub player: Vec<String>,
    pub state_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            audio_base: DEFAULT_AUDIO_BASE.to_string(),
            reciter: DEFAULT_RECITER,
            timeout: DEFAULT_TIMEOUT,
            player: split_command(DEFAULT_PLAYER),
            state_file: default_state_file(),
        }
    }
}

/// `$XDG_DATA_HOME/quran-explorer/last_recited.json` or the platform
/// equivalent; falls back to the working directory.
pub fn default_state_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quran-explorer")
        .join("last_recited.json")
}

pub fn split_command(cmd: &str) -> Vec<String> {
    cmd.split_whitespace().map(str::to_string).collect()
}
