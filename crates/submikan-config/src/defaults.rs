//! Default values applied when an environment variable is absent.

pub(crate) const POLLING_INTERVAL_MINUTES: u32 = 30;
pub(crate) const MAX_SUBSCRIPTIONS_PER_POLL: u32 = 50;
pub(crate) const STARTUP_DELAY_SECONDS: u64 = 30;
pub(crate) const ENABLE_POLLING: bool = true;
pub(crate) const FEED_FETCH_TIMEOUT_SECONDS: u64 = 30;
pub(crate) const MIKAN_BASE_URL: &str = "https://mikanani.me";
pub(crate) const PROGRESS_SYNC_INTERVAL_SECONDS: u64 = 30;
pub(crate) const MAX_CONCURRENT_FETCHES: usize = 3;

pub(crate) const TORRENT_CLIENT_HOST: &str = "localhost";
pub(crate) const TORRENT_CLIENT_PORT: u16 = 8080;
pub(crate) const TORRENT_CLIENT_CATEGORY: &str = "submikan";
pub(crate) const TORRENT_CLIENT_DEFAULT_SAVE_PATH: &str = "/downloads";
