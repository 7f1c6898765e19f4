mod common;

use common::*;
use pmospotify::{PipelineConfig, RequestState, SearchQuery, SpotifyClient, Track};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_millis(5);

#[tokio::test]
async fn test_run_loads_container_playlists_and_tracks() {
    // conteneur + 2 playlists + 2 browse
    let (transport, mut events) = ScriptedTransport::new(5, vec![T1, T2]);
    let mut client = SpotifyClient::new(transport, PipelineConfig::default());
    client.load_container();

    client.run(&mut events, TICK, CancellationToken::new()).await;

    assert!(client.queue().is_idle());
    assert_eq!(client.queue().ids_in_state(RequestState::Done).len(), 5);

    let session = client.session();
    assert_eq!(session.container.len(), 2);
    assert!(session.container.playlists().iter().all(|p| p.is_loaded()));
    // Une référence par playlist, lots de browse rendus
    assert_eq!(session.cache.ref_count::<Track>(&T1.parse().unwrap()), 2);
    assert!(session.cache.is_loaded::<Track>(&T2.parse().unwrap()));

    client.shutdown();
    assert!(client.session().cache.is_empty());
}

#[tokio::test]
async fn test_run_search() {
    let (transport, mut events) = ScriptedTransport::new(1, Vec::new());
    let mut client = SpotifyClient::new(transport, PipelineConfig::default());
    client.search(SearchQuery::new("so what"));

    client.run(&mut events, TICK, CancellationToken::new()).await;

    let results = client.take_search_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].did_you_mean, "miles davis");
    for result in results {
        client.release_search(result);
    }
    assert!(client.session().cache.is_empty());
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let (transport, mut events) = ScriptedTransport::new(0, Vec::new());
    let mut client = SpotifyClient::new(transport, PipelineConfig::default());
    let container = client.load_container();

    let cancel = CancellationToken::new();
    cancel.cancel();
    client.run(&mut events, TICK, cancel).await;

    assert_ne!(client.queue().state(container), Some(RequestState::Done));
}

#[test]
fn test_run_on_blocking_runtime() {
    let (transport, mut events) = ScriptedTransport::new(1, Vec::new());
    let mut client = SpotifyClient::new(transport, PipelineConfig::default());
    let search = client.search(SearchQuery::new("blue"));

    tokio_test::block_on(client.run(&mut events, TICK, CancellationToken::new()));

    assert_eq!(client.queue().state(search), Some(RequestState::Done));
}
