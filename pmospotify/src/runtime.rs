//! Boucle d'événements du pipeline.
//!
//! Un seul worker logique : la file de requêtes, le pipeline et la session
//! sont possédés par [`SpotifyClient`] et toutes les mutations passent par
//! la tâche qui exécute [`SpotifyClient::run`]. Le transport livre ses
//! événements de canal par un `mpsc`.

use crate::channel::{ChannelEvent, ChannelHandle, Transport};
use crate::config_ext::PipelineConfig;
use crate::pipeline::Pipeline;
use crate::error::{Result, SpotifyError};
use crate::request::{
    Request, RequestId, RequestKind, RequestPayload, RequestQueue, Scheduler, StagePayload,
};
use crate::search::{SearchQuery, SearchResult};
use crate::session::Session;
use pmoconfig::Config;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Event delivered by the transport for one channel
pub type TransportEvent = (ChannelHandle, ChannelEvent);

pub struct SpotifyClient<T: Transport> {
    pipeline: Pipeline,
    session: Session,
    queue: RequestQueue,
    transport: T,
}

impl<T: Transport> SpotifyClient<T> {
    pub fn new(transport: T, config: PipelineConfig) -> Self {
        Self {
            pipeline: Pipeline::new(config),
            session: Session::new(),
            queue: RequestQueue::new(),
            transport,
        }
    }

    /// Client whose retry delays come from `spotify.*.retry_timeout`
    pub fn from_config(transport: T, config: &Config) -> Result<Self> {
        Ok(Self::new(transport, PipelineConfig::from_config(config)?))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Queues the container load; playlists and their tracks follow by fan-out.
    pub fn load_container(&mut self) -> RequestId {
        self.queue.enqueue(RequestPayload::LoadContainer)
    }

    /// Queues a reload of the playlist at `position`.
    pub fn load_playlist(&mut self, position: usize) -> Result<RequestId> {
        let id = self
            .session
            .container
            .get(position)
            .map(|playlist| playlist.id)
            .ok_or(SpotifyError::UnknownPlaylist(position))?;
        Ok(self.queue.enqueue(RequestPayload::LoadPlaylist { position, id }))
    }

    pub fn search(&mut self, query: SearchQuery) -> RequestId {
        self.queue.enqueue(RequestPayload::Search(query))
    }

    /// Dispatches every due request. Returns the number of channels opened.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.queue
            .tick(&mut self.pipeline, &mut self.session, &mut self.transport, now)
    }

    pub fn handle_event(&mut self, handle: ChannelHandle, event: ChannelEvent) {
        self.pipeline
            .on_channel_event(&mut self.session, &mut self.queue, handle, event);
    }

    pub fn take_finished(&mut self) -> Vec<Request> {
        self.queue.take_finished()
    }

    /// Search results carried by finished search requests; each must
    /// eventually be handed back to [`SpotifyClient::release_search`].
    /// Other finished requests stay available to [`SpotifyClient::take_finished`].
    pub fn take_search_results(&mut self) -> Vec<SearchResult> {
        self.queue
            .take_finished_where(|r| r.kind() == RequestKind::Search)
            .into_iter()
            .filter_map(|r| r.outcome.and_then(|o| o.payload))
            .filter_map(|payload| match payload {
                StagePayload::Search(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn release_search(&mut self, result: SearchResult) {
        self.session.release_search(result);
    }

    /// Drives the pipeline until `cancel` fires, or until the event stream
    /// is closed and no request is pending.
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<TransportEvent>,
        tick_every: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut closed = false;

        info!("Pipeline event loop started");
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Pipeline event loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick(Instant::now());
                }
                event = events.recv(), if !closed => match event {
                    Some((handle, event)) => self.handle_event(handle, event),
                    None => {
                        debug!("Transport event stream closed");
                        closed = true;
                    }
                },
            }

            if closed && self.queue.is_idle() {
                info!("Pipeline idle, event loop stopped");
                break;
            }
        }
    }

    /// Drops in-flight channels, fails pending requests, then tears the
    /// session down.
    pub fn shutdown(&mut self) {
        let channels = self.pipeline.abandon_all();
        let abandoned = self.queue.shutdown(&mut self.session);
        for request in self.queue.take_finished() {
            if let Some(StagePayload::Search(result)) = request.outcome.and_then(|o| o.payload) {
                self.session.release_search(result);
            }
        }
        self.session.teardown();
        info!(channels, abandoned, "Client shut down");
    }
}
