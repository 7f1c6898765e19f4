//! # pmospotify - Pipeline de récupération pour le protocole de streaming
//!
//! Cette crate transforme les réponses XML compressées et multiplexées sur
//! des canaux en un graphe d'objets dédupliqué à comptage de références :
//! conteneur de playlists, playlists, tracks, artistes, albums et résultats
//! de recherche.
//!
//! ## Architecture
//!
//! - `cache` : cache d'entités (une seule instance vivante par id)
//! - `buffer` : accumulation des chunks d'un canal
//! - `channel` : trait `Transport`, événements de canal, machine à états
//!   par canal
//! - `parser` : parseurs d'étape purs (conteneur, playlist, recherche, browse)
//! - `pipeline` : envoi des commandes, fin de flux, fan-out
//! - `request` : requêtes, trait `Scheduler` et file de référence
//! - `session` : contexte explicite (cache + conteneur)
//! - `runtime` : boucle tokio mono-tâche
//!
//! ## Enchaînement
//!
//! ```text
//! LoadContainer ──▶ LoadPlaylist (une par playlist découverte)
//!                      └──▶ BrowsePlaylistTracks (une par playlist non vide)
//! ```
//!
//! Une requête est terminée dès que sa propre étape est parsée ; elle
//! n'attend pas ses enfants. Les erreurs de canal sont réessayées après le
//! délai de l'étape, les erreurs de parse sont définitives.
//!
//! ## Utilisation
//!
//! ```rust,ignore
//! use pmospotify::{PipelineConfig, SearchQuery, SpotifyClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut client = SpotifyClient::new(transport, PipelineConfig::default());
//! client.load_container();
//! client.search(SearchQuery::new("Miles Davis"));
//! client.run(&mut events, Duration::from_millis(100), CancellationToken::new()).await;
//!
//! for result in client.take_search_results() {
//!     println!("{} tracks", result.tracks.len());
//!     client.release_search(result);
//! }
//! ```

pub mod buffer;
pub mod cache;
pub mod channel;
pub mod checksum;
pub mod config_ext;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod playlist;
pub mod request;
pub mod runtime;
pub mod search;
pub mod session;

pub use cache::{CacheStats, EntityCache, EntityKind};
pub use channel::{ChannelEvent, ChannelHandle, Command, Transport};
pub use checksum::{checksum_container, checksum_playlist};
pub use config_ext::{PipelineConfig, SpotifyConfigExt};
pub use error::{Result, SpotifyError};
pub use ids::{AlbumId, ArtistId, EntityId, PlaylistId, TrackId};
pub use logging::init_logging;
pub use models::{Album, Artist, Track};
pub use pipeline::{DispatchStatus, Pipeline};
pub use playlist::{ContainerObserver, Playlist, PlaylistContainer, PlaylistState};
pub use request::{
    Request, RequestId, RequestKind, RequestOutcome, RequestPayload, RequestQueue, RequestState,
    RequestStatus, Scheduler, StagePayload,
};
pub use runtime::{SpotifyClient, TransportEvent};
pub use search::{SearchQuery, SearchResult};
pub use session::Session;
