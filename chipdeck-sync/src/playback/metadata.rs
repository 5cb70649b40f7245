//! Metadata polling, title sanitizing and play-history deduplication

use std::borrow::Cow;

use crate::config::SyncConfig;

/// Where a source lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Remote,
    Cached,
}

/// Classifies source ids as local, remote or cached
#[derive(Debug, Clone)]
pub struct SourceClassifier {
    remote_schemes: Vec<String>,
    cache_dir_marker: String,
}

impl SourceClassifier {
    pub fn new(remote_schemes: Vec<String>, cache_dir_marker: String) -> Self {
        Self {
            remote_schemes: remote_schemes
                .into_iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            cache_dir_marker,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.remote_schemes.clone(), config.cache_dir_marker.clone())
    }

    pub fn classify(&self, source_id: &str) -> SourceKind {
        if let Some((scheme, _)) = source_id.split_once("://") {
            if self
                .remote_schemes
                .iter()
                .any(|s| s.eq_ignore_ascii_case(scheme))
            {
                return SourceKind::Remote;
            }
        }
        if !self.cache_dir_marker.is_empty() && source_id.contains(&self.cache_dir_marker) {
            return SourceKind::Cached;
        }
        SourceKind::Local
    }

    /// Clean up a title reported for `source_id`
    ///
    /// Engines fall back to the URL or cache file name when a remote source
    /// carries no tag. Local titles pass through untouched.
    pub fn sanitize_title<'a>(&self, raw: &'a str, source_id: &str) -> Cow<'a, str> {
        match self.classify(source_id) {
            SourceKind::Local => Cow::Borrowed(raw),
            SourceKind::Remote | SourceKind::Cached => Cow::Owned(sanitize_remote_title(raw)),
        }
    }
}

fn looks_like_locator(title: &str) -> bool {
    title.contains("://")
        || title.contains('/')
        || title.contains('\\')
        || title.contains('?')
        || title.contains('%')
        || has_file_extension(title)
}

fn has_file_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && !ext.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn sanitize_remote_title(raw: &str) -> String {
    let title = raw.trim();
    if !looks_like_locator(title) {
        return title.to_string();
    }

    let without_query = title.split(|c| c == '?' || c == '#').next().unwrap_or(title);
    let segment = without_query
        .trim_end_matches(&['/', '\\'][..])
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or(without_query);

    let decoded = urlencoding::decode(segment)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let stem = if has_file_extension(&decoded) {
        decoded
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or(decoded)
    } else {
        decoded
    };

    stem.replace('_', " ").trim().to_string()
}

/// Title/artist changes found by one metadata poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataChange {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl MetadataChange {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none()
    }
}

/// Decides when to re-query title/artist and tracks the last seen values
#[derive(Debug, Clone)]
pub struct MetadataPoller {
    fast_ms: i64,
    slow_ms: i64,
    accumulated_ms: i64,
    last_tick_ms: Option<i64>,
    title: Option<String>,
    artist: Option<String>,
}

impl MetadataPoller {
    pub fn new(fast_ms: i64, slow_ms: i64) -> Self {
        Self {
            fast_ms,
            slow_ms,
            accumulated_ms: 0,
            last_tick_ms: None,
            title: None,
            artist: None,
        }
    }

    /// Poll period for the current content
    ///
    /// Missing title or artist usually means tags are still arriving (streams,
    /// slow containers), so poll faster until both are known.
    pub fn threshold_ms(&self) -> i64 {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.title) || blank(&self.artist) {
            self.fast_ms
        } else {
            self.slow_ms
        }
    }

    /// Accumulate elapsed time; true when a re-query is due
    ///
    /// The very first tick is always due.
    pub fn tick(&mut self, now_ms: i64) -> bool {
        let Some(last) = self.last_tick_ms.replace(now_ms) else {
            return true;
        };
        self.accumulated_ms += (now_ms - last).max(0);
        if self.accumulated_ms >= self.threshold_ms() {
            self.accumulated_ms = 0;
            true
        } else {
            false
        }
    }

    /// Make the next tick due regardless of elapsed time
    pub fn force_due(&mut self) {
        self.accumulated_ms = i64::MAX / 2;
    }

    /// Store freshly queried values and report what changed
    pub fn apply(&mut self, title: String, artist: String) -> MetadataChange {
        let mut change = MetadataChange::default();
        if self.title.as_deref() != Some(title.as_str()) {
            change.title = Some(title.clone());
            self.title = Some(title);
        }
        if self.artist.as_deref() != Some(artist.as_str()) {
            change.artist = Some(artist.clone());
            self.artist = Some(artist);
        }
        change
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
}

/// Identity of a recorded play: source, title and artist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySignature {
    pub source_id: String,
    pub title: String,
    pub artist: String,
}

impl PlaySignature {
    /// Title and artist are stored trimmed
    pub fn new(source_id: &str, title: Option<&str>, artist: Option<&str>) -> Self {
        Self {
            source_id: source_id.to_string(),
            title: title.unwrap_or_default().trim().to_string(),
            artist: artist.unwrap_or_default().trim().to_string(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.title.is_empty() || !self.artist.is_empty()
    }
}

/// Suppresses consecutive duplicate history entries
#[derive(Debug, Clone, Default)]
pub struct HistoryGate {
    last_persisted: Option<PlaySignature>,
}

impl HistoryGate {
    /// True (and remembered) when `signature` differs from the last persisted one
    pub fn offer(&mut self, signature: PlaySignature) -> bool {
        if self.last_persisted.as_ref() == Some(&signature) {
            return false;
        }
        self.last_persisted = Some(signature);
        true
    }

    /// Note a play recorded outside [`offer`](Self::offer) so identical
    /// follow-up offers are suppressed
    pub fn remember(&mut self, signature: PlaySignature) {
        self.last_persisted = Some(signature);
    }
}
