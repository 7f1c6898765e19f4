//! Gestion des erreurs du pipeline de récupération

use pmoutils::{HexIdError, InflateError, XmlError};
use thiserror::Error;

/// Type Result personnalisé pour pmospotify
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Erreurs possibles du pipeline
///
/// Seule [`SpotifyError::Transport`] est transitoire : toutes les autres
/// variantes produites par un parseur d'étape terminent la requête en erreur
/// permanente.
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Document XML illisible
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// Élément obligatoire absent
    #[error("Missing XML element: {0}")]
    MissingElement(String),

    /// Version de réponse de recherche non supportée
    #[error("Unsupported search XML version: '{0}'")]
    UnsupportedVersion(String),

    /// Identifiant mal formé (caractères non hexadécimaux, trop court)
    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] HexIdError),

    /// Identifiant de longueur inattendue
    #[error("Invalid identifier '{token}': expected {expected} hex digits")]
    IdLength { token: String, expected: &'static str },

    /// Compteur non numérique
    #[error("Invalid number in <{element}>: '{value}'")]
    InvalidNumber { element: String, value: String },

    /// Erreur de décompression
    #[error("Decompression error: {0}")]
    Inflate(#[from] InflateError),

    /// Échec d'ouverture de canal (réessayé par le planificateur)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Playlist absente du conteneur
    #[error("No playlist at container position {0}")]
    UnknownPlaylist(usize),

    /// Requête abandonnée à l'arrêt du planificateur
    #[error("Request abandoned at shutdown")]
    Shutdown,

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl SpotifyError {
    pub fn missing(path: &[&str]) -> Self {
        SpotifyError::MissingElement(path.join("/"))
    }

    pub fn invalid_number(element: &str, value: &str) -> Self {
        SpotifyError::InvalidNumber {
            element: element.to_string(),
            value: value.to_string(),
        }
    }
}
