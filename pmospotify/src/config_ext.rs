//! Extension pour intégrer la configuration du pipeline dans pmoconfig
//!
//! Ce module fournit le trait `SpotifyConfigExt`, qui ajoute à
//! `pmoconfig::Config` les délais de réessai de chaque étape, et
//! `PipelineConfig`, la vue typée qu'en garde le pipeline.

use crate::request::RequestKind;
use anyhow::{Result, anyhow};
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

/// Délai de réessai par défaut, en secondes
pub const DEFAULT_RETRY_TIMEOUT_SECS: u64 = 10;

const PLAYLIST_RETRY: &[&str] = &["spotify", "playlist", "retry_timeout"];
const SEARCH_RETRY: &[&str] = &["spotify", "search", "retry_timeout"];
const BROWSE_RETRY: &[&str] = &["spotify", "browse", "retry_timeout"];

/// Trait d'extension pour gérer la configuration du pipeline dans pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmospotify::SpotifyConfigExt;
///
/// let config = get_config();
/// let timeout = config.get_spotify_search_retry_timeout()?;
/// ```
pub trait SpotifyConfigExt {
    /// Délai de réessai des chargements de conteneur et de playlist
    fn get_spotify_playlist_retry_timeout(&self) -> Result<Duration>;

    fn set_spotify_playlist_retry_timeout(&self, timeout: Duration) -> Result<()>;

    /// Délai de réessai des recherches
    fn get_spotify_search_retry_timeout(&self) -> Result<Duration>;

    fn set_spotify_search_retry_timeout(&self, timeout: Duration) -> Result<()>;

    /// Délai de réessai des browse de tracks
    fn get_spotify_browse_retry_timeout(&self) -> Result<Duration>;

    fn set_spotify_browse_retry_timeout(&self, timeout: Duration) -> Result<()>;
}

fn get_seconds(config: &Config, path: &[&str]) -> Result<Duration> {
    match config.get_value(path) {
        Ok(Value::Number(n)) => n
            .as_u64()
            .map(Duration::from_secs)
            .ok_or_else(|| anyhow!("{} must be a positive number of seconds", path.join("."))),
        Ok(_) => Err(anyhow!("{} must be a number of seconds", path.join("."))),
        Err(_) => Ok(Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECS)),
    }
}

fn set_seconds(config: &Config, path: &[&str], timeout: Duration) -> Result<()> {
    config.set_value(path, Value::Number(Number::from(timeout.as_secs())))
}

impl SpotifyConfigExt for Config {
    fn get_spotify_playlist_retry_timeout(&self) -> Result<Duration> {
        get_seconds(self, PLAYLIST_RETRY)
    }

    fn set_spotify_playlist_retry_timeout(&self, timeout: Duration) -> Result<()> {
        set_seconds(self, PLAYLIST_RETRY, timeout)
    }

    fn get_spotify_search_retry_timeout(&self) -> Result<Duration> {
        get_seconds(self, SEARCH_RETRY)
    }

    fn set_spotify_search_retry_timeout(&self, timeout: Duration) -> Result<()> {
        set_seconds(self, SEARCH_RETRY, timeout)
    }

    fn get_spotify_browse_retry_timeout(&self) -> Result<Duration> {
        get_seconds(self, BROWSE_RETRY)
    }

    fn set_spotify_browse_retry_timeout(&self, timeout: Duration) -> Result<()> {
        set_seconds(self, BROWSE_RETRY, timeout)
    }
}

/// Settings of the pipeline driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub playlist_retry: Duration,
    pub search_retry: Duration,
    pub browse_retry: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let retry = Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECS);
        Self {
            playlist_retry: retry,
            search_retry: retry,
            browse_retry: retry,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        Ok(Self {
            playlist_retry: config.get_spotify_playlist_retry_timeout()?,
            search_retry: config.get_spotify_search_retry_timeout()?,
            browse_retry: config.get_spotify_browse_retry_timeout()?,
        })
    }

    /// Même délai pour toutes les étapes
    pub fn uniform(retry: Duration) -> Self {
        Self {
            playlist_retry: retry,
            search_retry: retry,
            browse_retry: retry,
        }
    }

    /// The container is fetched with the playlist command and shares its delay.
    pub fn retry_timeout(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Container | RequestKind::Playlist => self.playlist_retry,
            RequestKind::Search => self.search_retry,
            RequestKind::Browse => self.browse_retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_embedded_yaml() {
        let dir = tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        let pipeline = PipelineConfig::from_config(&config).unwrap();
        assert_eq!(pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_set_and_read_back() {
        let dir = tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        config
            .set_spotify_search_retry_timeout(Duration::from_secs(3))
            .unwrap();
        let pipeline = PipelineConfig::from_config(&config).unwrap();
        assert_eq!(pipeline.retry_timeout(RequestKind::Search), Duration::from_secs(3));
        assert_eq!(
            pipeline.retry_timeout(RequestKind::Container),
            Duration::from_secs(DEFAULT_RETRY_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let dir = tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        config
            .set_value(BROWSE_RETRY, Value::String("soon".into()))
            .unwrap();
        assert!(config.get_spotify_browse_retry_timeout().is_err());
        assert!(PipelineConfig::from_config(&config).is_err());
    }
}
