//! Requêtes du pipeline et file d'attente de référence.
//!
//! Le planificateur externe possède les requêtes ; le pipeline n'en garde
//! que l'identifiant pendant qu'un canal est en vol. [`RequestQueue`] est
//! une implémentation en mémoire du trait [`Scheduler`] : elle avance les
//! requêtes à chaque tick et relance celles dont le délai a expiré.

use crate::channel::Transport;
use crate::error::SpotifyError;
use crate::ids::{PlaylistId, TrackId};
use crate::pipeline::{DispatchStatus, Pipeline};
use crate::search::{SearchQuery, SearchResult};
use crate::session::Session;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Identifiant d'une requête, attribué par le planificateur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RequestKind {
    Container,
    Playlist,
    Search,
    Browse,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestKind::Container => "container",
            RequestKind::Playlist => "playlist",
            RequestKind::Search => "search",
            RequestKind::Browse => "browse",
        })
    }
}

/// Tracks of one playlist sent for hydration.
///
/// Every id holds one temporary cache reference from the moment the batch is
/// enqueued until its browse stage ends, or until the queue shuts down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseBatch {
    pub playlist: PlaylistId,
    pub position: usize,
    pub tracks: Vec<TrackId>,
}

/// Input of a request, one variant per stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    LoadContainer,
    LoadPlaylist { position: usize, id: PlaylistId },
    Search(SearchQuery),
    BrowsePlaylistTracks(BrowseBatch),
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestPayload::LoadContainer => RequestKind::Container,
            RequestPayload::LoadPlaylist { .. } => RequestKind::Playlist,
            RequestPayload::Search(_) => RequestKind::Search,
            RequestPayload::BrowsePlaylistTracks(_) => RequestKind::Browse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestState {
    New,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RequestStatus {
    Ok,
    PermanentError,
}

/// Result attached to a completed request
#[derive(Debug, Clone, PartialEq)]
pub enum StagePayload {
    /// Positions des playlists découvertes par ce chargement
    Container { discovered: Vec<usize> },
    Playlist { position: usize, id: PlaylistId },
    /// Les références du résultat sont rendues par `Session::release_search`
    Search(SearchResult),
    Browse { playlist: PlaylistId, hydrated: usize },
}

#[derive(Debug)]
pub struct RequestOutcome {
    pub status: RequestStatus,
    pub payload: Option<StagePayload>,
    pub error: Option<SpotifyError>,
}

impl RequestOutcome {
    pub fn ok(payload: StagePayload) -> Self {
        Self {
            status: RequestStatus::Ok,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failed(error: SpotifyError, payload: Option<StagePayload>) -> Self {
        Self {
            status: RequestStatus::PermanentError,
            payload,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RequestStatus::Ok
    }
}

#[derive(Debug)]
pub struct Request {
    pub id: RequestId,
    pub payload: RequestPayload,
    pub state: RequestState,
    /// Deadline after which a running request is dispatched again
    pub next_timeout: Option<Instant>,
    pub outcome: Option<RequestOutcome>,
}

impl Request {
    pub fn new(id: RequestId, payload: RequestPayload) -> Self {
        Self {
            id,
            payload,
            state: RequestState::New,
            next_timeout: None,
            outcome: None,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RequestState::Done | RequestState::Error)
    }

    /// NEW, or RUNNING with an elapsed timeout
    pub fn is_due(&self, now: Instant) -> bool {
        match self.state {
            RequestState::New => true,
            RequestState::Running => self.next_timeout.is_none_or(|deadline| deadline <= now),
            RequestState::Done | RequestState::Error => false,
        }
    }
}

/// Primitives the pipeline needs from the outer scheduler.
pub trait Scheduler {
    /// Queues a new request in state NEW.
    fn enqueue(&mut self, payload: RequestPayload) -> RequestId;

    /// Moves a request to its terminal state. Called once per request.
    fn complete(&mut self, id: RequestId, outcome: RequestOutcome);
}

/// In-memory scheduler driving requests in creation order
#[derive(Debug, Default)]
pub struct RequestQueue {
    next_id: u64,
    requests: BTreeMap<RequestId, Request>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    pub fn state(&self, id: RequestId) -> Option<RequestState> {
        self.requests.get(&id).map(|r| r.state)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests not yet DONE or ERROR
    pub fn pending_count(&self) -> usize {
        self.requests.values().filter(|r| !r.is_terminal()).count()
    }

    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0
    }

    /// Requests currently in `state`, in creation order
    pub fn ids_in_state(&self, state: RequestState) -> Vec<RequestId> {
        self.requests
            .values()
            .filter(|r| r.state == state)
            .map(|r| r.id)
            .collect()
    }

    /// Hands every due request to the pipeline. Returns how many channels
    /// were opened.
    pub fn tick<T: Transport + ?Sized>(
        &mut self,
        pipeline: &mut Pipeline,
        session: &mut Session,
        transport: &mut T,
        now: Instant,
    ) -> usize {
        let due: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.is_due(now))
            .map(|r| r.id)
            .collect();

        let mut dispatched = 0;
        for id in due {
            let Some(request) = self.requests.get_mut(&id) else {
                continue;
            };
            let status = pipeline.process(session, transport, request, now);
            if let DispatchStatus::Dispatched(_) = status {
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Removes and returns terminal requests, in creation order.
    pub fn take_finished(&mut self) -> Vec<Request> {
        self.take_finished_where(|_| true)
    }

    /// Like [`RequestQueue::take_finished`], leaving in the queue the
    /// terminal requests `select` rejects.
    pub fn take_finished_where<F>(&mut self, select: F) -> Vec<Request>
    where
        F: Fn(&Request) -> bool,
    {
        let finished: Vec<RequestId> = self
            .requests
            .values()
            .filter(|r| r.is_terminal() && select(r))
            .map(|r| r.id)
            .collect();
        finished
            .into_iter()
            .filter_map(|id| self.requests.remove(&id))
            .collect()
    }

    /// Fails every pending request and releases the temporary references of
    /// browse batches that never reached their end of stream.
    ///
    /// The pipeline must have dropped its in-flight channels beforehand, or
    /// a late end of stream would release the same batch twice.
    pub fn shutdown(&mut self, session: &mut Session) -> usize {
        let mut abandoned = 0;
        for request in self.requests.values_mut().filter(|r| !r.is_terminal()) {
            if let RequestPayload::BrowsePlaylistTracks(batch) = &request.payload {
                session.release_batch(&batch.tracks);
            }
            request.state = RequestState::Error;
            request.outcome = Some(RequestOutcome::failed(SpotifyError::Shutdown, None));
            abandoned += 1;
        }
        if abandoned > 0 {
            info!(abandoned, "Request queue shut down");
        }
        abandoned
    }
}

impl Scheduler for RequestQueue {
    fn enqueue(&mut self, payload: RequestPayload) -> RequestId {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        debug!(%id, kind = %payload.kind(), "Enqueuing request");
        self.requests.insert(id, Request::new(id, payload));
        id
    }

    fn complete(&mut self, id: RequestId, outcome: RequestOutcome) {
        let Some(request) = self.requests.get_mut(&id) else {
            warn!(%id, "Completion for an unknown request");
            return;
        };
        if request.is_terminal() {
            warn!(%id, state = ?request.state, "Request already completed, ignoring");
            return;
        }

        request.state = if outcome.is_ok() {
            RequestState::Done
        } else {
            RequestState::Error
        };
        request.next_timeout = None;
        request.outcome = Some(outcome);
        debug!(%id, state = ?request.state, "Request completed");
    }
}
