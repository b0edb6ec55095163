//! Periodic fetch loops feeding snapshots to the frame loop.
//!
//! Each feed is one async task: `loop { cycle().await; sleep(period).await }`.
//! The timer therefore only restarts once the previous cycle has completed or
//! failed, so two cycles of the same feed never overlap. Feeds are independent;
//! a hung request stalls only its own feed.
//!
//! winit owns the main thread, so the tasks run on a single-threaded tokio
//! runtime on their own thread and hand results over a channel. The frame loop
//! drains that channel between frames and is the only writer of the entity table.

use std::fmt;
use std::future::Future;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::client::SimClient;
use super::error::FetchError;
use crate::engine::snapshot::{AgentSnapshot, ObstacleSnapshot, SignalSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Agents,
    Signals,
    Obstacles,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feed::Agents => "agents",
            Feed::Signals => "signals",
            Feed::Obstacles => "obstacles",
        })
    }
}

/// Messages from the fetch thread to the frame loop.
#[derive(Debug)]
pub enum FeedEvent {
    Agents(Vec<AgentSnapshot>),
    Signals(Vec<SignalSnapshot>),
    Obstacles(Vec<ObstacleSnapshot>),
    /// One cycle of `feed` was dropped. Nothing was changed.
    Failed { feed: Feed, error: String },
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Car count requested in the `/init` handshake.
    pub max_cars: u32,
    /// Pause between the end of one cycle and the start of the next.
    pub period: Duration,
}

/// Start the fetch thread. Events arrive on the returned receiver; the thread
/// winds down once the receiver is dropped.
pub fn spawn(
    client: SimClient,
    settings: PollerSettings,
) -> std::io::Result<(JoinHandle<()>, UnboundedReceiver<FeedEvent>)> {
    let (tx, rx) = unbounded_channel();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let handle = std::thread::Builder::new()
        .name("feed-poller".into())
        .spawn(move || runtime.block_on(run(client, settings, tx)))?;

    Ok((handle, rx))
}

/// Handshake, one-shot obstacle fetch, then both periodic feeds until the
/// receiver goes away.
pub async fn run(client: SimClient, settings: PollerSettings, tx: UnboundedSender<FeedEvent>) {
    match client.init(settings.max_cars).await {
        Ok(()) => log::info!(
            "Configuration sent to {} ({} cars)",
            client.base_url(),
            settings.max_cars
        ),
        // Best effort: the server may already be initialised.
        Err(e) => log::warn!("Configuration handshake failed: {}", e),
    }

    let obstacles = client.obstacles().await;
    if !forward(&tx, Feed::Obstacles, obstacles, FeedEvent::Obstacles) {
        return;
    }

    tokio::join!(
        poll_feed(Feed::Agents, settings.period, &tx, || agent_cycle(&client), FeedEvent::Agents),
        poll_feed(Feed::Signals, settings.period, &tx, || client.signals(), FeedEvent::Signals),
    );
    log::debug!("Feed receiver dropped, fetch loops stopped");
}

/// Advance the simulation, then read back car positions.
async fn agent_cycle(client: &SimClient) -> Result<Vec<AgentSnapshot>, FetchError> {
    client.step().await?;
    client.agents().await
}

async fn poll_feed<T, F, Fut>(
    feed: Feed,
    period: Duration,
    tx: &UnboundedSender<FeedEvent>,
    mut cycle: F,
    wrap: fn(T) -> FeedEvent,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    loop {
        let result = cycle().await;
        if !forward(tx, feed, result, wrap) {
            return;
        }
        tokio::time::sleep(period).await;
    }
}

/// Send the outcome of one cycle. Returns `false` once nobody is listening.
fn forward<T>(
    tx: &UnboundedSender<FeedEvent>,
    feed: Feed,
    result: Result<T, FetchError>,
    wrap: fn(T) -> FeedEvent,
) -> bool {
    let event = match result {
        Ok(snapshot) => wrap(snapshot),
        Err(e) => {
            log::warn!("{} fetch failed, skipping this cycle: {}", feed, e);
            FeedEvent::Failed { feed, error: e.to_string() }
        }
    };
    tx.send(event).is_ok()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::net::client::{AGENTS_ENDPOINT, INIT_ENDPOINT, OBSTACLES_ENDPOINT, SIGNALS_ENDPOINT, UPDATE_ENDPOINT};

    const AGENTS_BODY: &str = r#"{"positions": [{"id": "A1", "x": 1, "y": 0, "z": 1, "arrived": false}]}"#;
    const SIGNALS_BODY: &str = r#"{"positions": [{"id": "S1", "x": 4, "y": 4, "state": true}]}"#;

    fn settings() -> PollerSettings {
        PollerSettings { max_cars: 3, period: Duration::from_millis(20) }
    }

    async fn next(rx: &mut UnboundedReceiver<FeedEvent>) -> FeedEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no feed event within 5s")
            .expect("feed closed")
    }

    #[tokio::test]
    async fn feeds_deliver_snapshots_after_handshake() {
        let mut server = mockito::Server::new_async().await;
        let init = server.mock("POST", INIT_ENDPOINT).with_status(200).create_async().await;
        server.mock("GET", OBSTACLES_ENDPOINT).with_body(r#"{"positions": []}"#).create_async().await;
        let update = server.mock("GET", UPDATE_ENDPOINT).with_body("{}").expect_at_least(1).create_async().await;
        server.mock("GET", AGENTS_ENDPOINT).with_body(AGENTS_BODY).create_async().await;
        server.mock("GET", SIGNALS_ENDPOINT).with_body(SIGNALS_BODY).create_async().await;

        let (tx, mut rx) = unbounded_channel();
        let poller = tokio::spawn(run(SimClient::new(server.url()), settings(), tx));

        assert!(matches!(next(&mut rx).await, FeedEvent::Obstacles(ref o) if o.is_empty()));

        let (mut agents, mut signals) = (false, false);
        while !(agents && signals) {
            match next(&mut rx).await {
                FeedEvent::Agents(a) => {
                    assert_eq!(a[0].id, "A1");
                    agents = true;
                }
                FeedEvent::Signals(s) => {
                    assert!(s[0].active);
                    signals = true;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        drop(rx);
        poller.await.unwrap();
        init.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn failed_handshake_does_not_stop_polling() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", INIT_ENDPOINT).with_status(500).create_async().await;
        server.mock("GET", OBSTACLES_ENDPOINT).with_body(r#"{"positions": []}"#).create_async().await;
        server.mock("GET", UPDATE_ENDPOINT).with_body("{}").create_async().await;
        server.mock("GET", AGENTS_ENDPOINT).with_body(AGENTS_BODY).create_async().await;
        server.mock("GET", SIGNALS_ENDPOINT).with_body(SIGNALS_BODY).create_async().await;

        let (tx, mut rx) = unbounded_channel();
        let poller = tokio::spawn(run(SimClient::new(server.url()), settings(), tx));

        loop {
            if let FeedEvent::Agents(a) = next(&mut rx).await {
                assert_eq!(a.len(), 1);
                break;
            }
        }
        drop(rx);
        poller.await.unwrap();
    }

    #[tokio::test]
    async fn failing_feed_reports_and_keeps_the_other_alive() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", INIT_ENDPOINT).create_async().await;
        server.mock("GET", OBSTACLES_ENDPOINT).with_body(r#"{"positions": []}"#).create_async().await;
        server.mock("GET", UPDATE_ENDPOINT).with_body("{}").create_async().await;
        server.mock("GET", AGENTS_ENDPOINT).with_body(AGENTS_BODY).create_async().await;
        server.mock("GET", SIGNALS_ENDPOINT).with_status(503).create_async().await;

        let (tx, mut rx) = unbounded_channel();
        let poller = tokio::spawn(run(SimClient::new(server.url()), settings(), tx));

        let (mut failures, mut agent_snapshots) = (0, 0);
        while failures < 2 || agent_snapshots < 2 {
            match next(&mut rx).await {
                FeedEvent::Failed { feed, error } => {
                    assert_eq!(feed, Feed::Signals);
                    assert!(error.contains("503"), "{error}");
                    failures += 1;
                }
                FeedEvent::Agents(_) => agent_snapshots += 1,
                _ => {}
            }
        }
        drop(rx);
        poller.await.unwrap();
    }

    #[tokio::test]
    async fn failed_update_skips_the_agent_fetch() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", UPDATE_ENDPOINT).with_status(500).create_async().await;
        let agents = server.mock("GET", AGENTS_ENDPOINT).with_body(AGENTS_BODY).expect(0).create_async().await;

        let client = SimClient::new(server.url());
        assert!(agent_cycle(&client).await.is_err());
        agents.assert_async().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_of_one_feed_never_overlap() {
        let period = Duration::from_millis(100);
        let in_flight = Rc::new(Cell::new(0u32));
        let peak = Rc::new(Cell::new(0u32));
        let cycle = || {
            let (in_flight, peak) = (in_flight.clone(), peak.clone());
            async move {
                in_flight.set(in_flight.get() + 1);
                peak.set(peak.get().max(in_flight.get()));
                // Each request outlives the polling period.
                tokio::time::sleep(period * 3).await;
                in_flight.set(in_flight.get() - 1);
                Ok::<_, FetchError>(Vec::new())
            }
        };

        let (tx, mut rx) = unbounded_channel();
        let start = tokio::time::Instant::now();
        tokio::select! {
            _ = poll_feed(Feed::Signals, period, &tx, cycle, FeedEvent::Signals) => panic!("poll loop returned"),
            _ = async {
                for _ in 0..5 {
                    assert!(matches!(rx.recv().await, Some(FeedEvent::Signals(_))));
                }
            } => {}
        }

        assert_eq!(peak.get(), 1);
        // Five 300ms cycles separated by four 100ms waits.
        assert!(start.elapsed() >= Duration::from_millis(1900), "{:?}", start.elapsed());
    }
}
