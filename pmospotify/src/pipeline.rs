//! Pilote du pipeline : envoi des commandes, fin de flux, fan-out.
//!
//! `process` ne bloque jamais : il ouvre un canal et rend la main. La suite
//! arrive par `on_channel_event`, appelé par la boucle d'E/S pour chaque
//! événement de canal. Une erreur de transport laisse la requête RUNNING
//! jusqu'à l'expiration de son délai ; une erreur de parse la termine en
//! erreur permanente.

use crate::channel::{
    ChannelEvent, ChannelHandle, Command, InFlight, LATEST_REVISION, Stage, Step, Transport,
};
use crate::config_ext::PipelineConfig;
use crate::error::{Result, SpotifyError};
use crate::ids::PlaylistId;
use crate::parser::{parse_browse, parse_container, parse_playlist, parse_search};
use crate::request::{
    BrowseBatch, Request, RequestId, RequestOutcome, RequestPayload, RequestState, Scheduler,
    StagePayload,
};
use crate::search::SearchResult;
use crate::session::Session;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Result of one `process` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// A fresh channel carries the request
    Dispatched(ChannelHandle),
    /// Opening the channel failed; retried once the timeout elapses
    Deferred,
    /// Still in flight and not yet due
    Waiting,
    /// Already DONE or ERROR
    Finished,
}

pub struct Pipeline {
    config: PipelineConfig,
    channels: HashMap<ChannelHandle, InFlight>,
    active: HashMap<RequestId, ChannelHandle>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            channels: HashMap::new(),
            active: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of channels awaiting their terminal event
    pub fn in_flight(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, handle: ChannelHandle) -> Option<&InFlight> {
        self.channels.get(&handle)
    }

    /// Channel currently carrying `request`
    pub fn channel_of(&self, request: RequestId) -> Option<ChannelHandle> {
        self.active.get(&request).copied()
    }

    /// Drops every in-flight channel; their later events are ignored.
    pub fn abandon_all(&mut self) -> usize {
        let count = self.channels.len();
        self.channels.clear();
        self.active.clear();
        count
    }

    /// Dispatches `request` if it is NEW or its retry timeout has elapsed.
    pub fn process<T: Transport + ?Sized>(
        &mut self,
        session: &mut Session,
        transport: &mut T,
        request: &mut Request,
        now: Instant,
    ) -> DispatchStatus {
        if request.is_terminal() {
            return DispatchStatus::Finished;
        }
        if !request.is_due(now) {
            return DispatchStatus::Waiting;
        }

        let retry = request.state == RequestState::Running;
        request.state = RequestState::Running;
        request.next_timeout = Some(now + self.config.retry_timeout(request.kind()));

        if let Some(stale) = self.active.remove(&request.id) {
            self.channels.remove(&stale);
            debug!(request = %request.id, channel = %stale, "Abandoning timed out channel");
        }

        let (command, stage) = match &request.payload {
            RequestPayload::LoadContainer => (
                Command::GetPlaylist {
                    id: PlaylistId::CONTAINER,
                    revision: LATEST_REVISION,
                },
                Stage::Container,
            ),
            RequestPayload::LoadPlaylist { position, id } => {
                if let Some(playlist) = session.container.get_mut(*position) {
                    playlist.last_request = Some(now);
                }
                (
                    Command::GetPlaylist {
                        id: *id,
                        revision: LATEST_REVISION,
                    },
                    Stage::Playlist {
                        position: *position,
                        id: *id,
                    },
                )
            }
            RequestPayload::Search(query) => {
                (Command::Search(query.clone()), Stage::Search(query.clone()))
            }
            RequestPayload::BrowsePlaylistTracks(batch) => (
                Command::BrowseTracks {
                    ids: batch.tracks.clone(),
                },
                Stage::Browse(batch.clone()),
            ),
        };

        let name = command.name();
        match transport.open_channel(command) {
            Ok(handle) => {
                debug!(
                    request = %request.id,
                    channel = %handle,
                    command = name,
                    retry,
                    "Channel opened"
                );
                self.channels.insert(handle, InFlight::new(request.id, stage));
                self.active.insert(request.id, handle);
                DispatchStatus::Dispatched(handle)
            }
            Err(e) => {
                warn!(
                    request = %request.id,
                    command = name,
                    "Cannot open channel, will retry: {}",
                    e
                );
                DispatchStatus::Deferred
            }
        }
    }

    /// Feeds one transport event to the channel it belongs to.
    pub fn on_channel_event<S: Scheduler + ?Sized>(
        &mut self,
        session: &mut Session,
        scheduler: &mut S,
        handle: ChannelHandle,
        event: ChannelEvent,
    ) {
        let Some(state) = self.channels.get_mut(&handle) else {
            debug!(channel = %handle, "Event for an unknown or abandoned channel, ignoring");
            return;
        };

        match state.apply(event) {
            Step::Continue => {
                trace!(channel = %handle, received = state.received(), "Chunk buffered");
            }
            Step::Failed => {
                if let Some(state) = self.release_channel(handle) {
                    warn!(
                        request = %state.request,
                        channel = %handle,
                        stage = %state.stage,
                        "Channel error, request left for retry"
                    );
                }
            }
            Step::Finished(payload) => {
                if let Some(state) = self.release_channel(handle) {
                    self.finish(session, scheduler, state, payload);
                }
            }
        }
    }

    fn release_channel(&mut self, handle: ChannelHandle) -> Option<InFlight> {
        let state = self.channels.remove(&handle)?;
        if self.active.get(&state.request) == Some(&handle) {
            self.active.remove(&state.request);
        }
        Some(state)
    }

    fn finish<S: Scheduler + ?Sized>(
        &mut self,
        session: &mut Session,
        scheduler: &mut S,
        state: InFlight,
        payload: Bytes,
    ) {
        let request = state.request;
        let stage_name = state.stage.to_string();

        let outcome = match state.stage {
            Stage::Container => container_loaded(session, scheduler, &payload),
            Stage::Playlist { position, id } => {
                playlist_loaded(session, scheduler, &payload, position, id)
            }
            Stage::Search(query) => {
                let committed =
                    parse_search(&payload).and_then(|plan| session.commit_search(&query, plan));
                match committed {
                    Ok(result) => Ok(StagePayload::Search(result)),
                    Err(e) => Err((e, Some(StagePayload::Search(SearchResult::empty(query))))),
                }
            }
            Stage::Browse(batch) => browse_loaded(session, &payload, batch),
        };

        match outcome {
            Ok(result) => {
                info!(%request, stage = %stage_name, bytes = payload.len(), "Stage completed");
                scheduler.complete(request, RequestOutcome::ok(result));
            }
            Err((e, result)) => {
                error!(%request, stage = %stage_name, "Stage failed: {}", e);
                scheduler.complete(request, RequestOutcome::failed(e, result));
            }
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

/// Failure of a stage, with the payload to report alongside the error
type StageFailure = (SpotifyError, Option<StagePayload>);

type StageResult = std::result::Result<StagePayload, StageFailure>;

fn without_payload<T>(result: Result<T>) -> std::result::Result<T, StageFailure> {
    result.map_err(|e| (e, None))
}

/// One `LoadPlaylist` per newly discovered playlist, in discovery order.
fn container_loaded<S: Scheduler + ?Sized>(
    session: &mut Session,
    scheduler: &mut S,
    payload: &[u8],
) -> StageResult {
    let ids = without_payload(parse_container(payload))?;
    let discovered = session.add_playlists(&ids);
    for &position in &discovered {
        if let Some(playlist) = session.container.get(position) {
            scheduler.enqueue(RequestPayload::LoadPlaylist {
                position,
                id: playlist.id,
            });
        }
    }
    debug!(playlists = discovered.len(), "Container enumerated");
    Ok(StagePayload::Container { discovered })
}

/// Replaces the track list, then sends it for hydration.
fn playlist_loaded<S: Scheduler + ?Sized>(
    session: &mut Session,
    scheduler: &mut S,
    payload: &[u8],
    position: usize,
    id: PlaylistId,
) -> StageResult {
    let tracks = without_payload(parse_playlist(payload))?;
    without_payload(session.set_playlist_tracks(position, tracks.clone()))?;

    if !tracks.is_empty() {
        session.retain_batch(&tracks);
        scheduler.enqueue(RequestPayload::BrowsePlaylistTracks(BrowseBatch {
            playlist: id,
            position,
            tracks,
        }));
    }
    Ok(StagePayload::Playlist { position, id })
}

/// The batch references are released whether or not the response parsed.
fn browse_loaded(session: &mut Session, payload: &[u8], batch: BrowseBatch) -> StageResult {
    let result =
        parse_browse(payload).and_then(|plan| session.hydrate_tracks(plan, &batch.tracks));
    session.release_batch(&batch.tracks);

    let hydrated = without_payload(result)?;
    debug!(
        position = batch.position,
        hydrated,
        batch = batch.tracks.len(),
        "Browse batch done"
    );
    Ok(StagePayload::Browse {
        playlist: batch.playlist,
        hydrated,
    })
}
