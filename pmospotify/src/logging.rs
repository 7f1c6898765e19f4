//! Initialisation du logging à partir de la configuration
//!
//! Même montage que le serveur : un `Registry` filtré par un `LevelFilter`
//! lu dans `host.logger.min_level`, et une couche console optionnelle
//! (`host.logger.enable_console`).

use pmoconfig::Config;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Installe le subscriber global.
///
/// Retourne `false` si un subscriber était déjà installé (tests, application
/// hôte qui a initialisé ses propres logs).
pub fn init_logging(config: &Config) -> bool {
    let level = config
        .get_log_min_level()
        .ok()
        .and_then(|l| string_to_levelfilter(&l))
        .unwrap_or(DEFAULT_LEVEL);

    let enable_console = config.get_log_enable_console().unwrap_or(true);

    let subscriber = Registry::default().with(level);
    let installed = if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .try_init()
    } else {
        subscriber.try_init()
    };

    installed.is_ok()
}

fn string_to_levelfilter(s: &str) -> Option<LevelFilter> {
    match s.trim().to_uppercase().as_str() {
        "OFF" => Some(LevelFilter::OFF),
        "ERROR" => Some(LevelFilter::ERROR),
        "WARN" => Some(LevelFilter::WARN),
        "INFO" => Some(LevelFilter::INFO),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "TRACE" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(string_to_levelfilter("debug"), Some(LevelFilter::DEBUG));
        assert_eq!(string_to_levelfilter(" WARN "), Some(LevelFilter::WARN));
        assert_eq!(string_to_levelfilter("off"), Some(LevelFilter::OFF));
        assert_eq!(string_to_levelfilter("verbose"), None);
    }
}
