//! Deep-link intake.
//!
//! The OS reports the link that launched the app once at start-up and
//! every later link as a live event. Some platforms also replay the
//! launch link as the first live event; [`DeepLinkListener`] drops that
//! replay so the invite is processed once.

use std::sync::{Arc, Mutex};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc::UnboundedReceiver;

use super::orchestrator::{JoinOrchestrator, LinkDisposition};

/// Link event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Link that launched the app, if any.
    ColdStart(Option<String>),
    /// Link opened while the app is running.
    Live(String),
}

#[derive(Debug, Default)]
struct ReplayState {
    cold_start: Option<String>,
    cold_start_seen: bool,
    first_live: Option<String>,
    replay_consumed: bool,
}

/// Normalizes cold-start and live link events.
#[derive(Debug, Default)]
pub struct DeepLinkListener {
    state: Mutex<ReplayState>,
}

impl DeepLinkListener {
    /// Creates a listener that has seen nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the URL to process for `event`, or `None` if it is a replay.
    pub fn accept(&self, event: LinkEvent) -> Option<String> {
        let Ok(mut state) = self.state.lock() else {
            log::error!("Deep link state poisoned, passing event through");
            return match event {
                LinkEvent::ColdStart(url) => url,
                LinkEvent::Live(url) => Some(url),
            };
        };

        match event {
            LinkEvent::ColdStart(url) => {
                if state.cold_start_seen {
                    log::debug!("Ignoring second cold-start event");
                    return None;
                }
                state.cold_start_seen = true;
                let url = url?;
                // The live event may have won the race.
                if !state.replay_consumed && state.first_live.as_deref() == Some(url.as_str()) {
                    state.replay_consumed = true;
                    log::debug!("Cold-start link already delivered live");
                    return None;
                }
                state.cold_start = Some(url.clone());
                Some(url)
            }
            LinkEvent::Live(url) => {
                if !state.cold_start_seen {
                    if state.first_live.is_none() {
                        state.first_live = Some(url.clone());
                    }
                    return Some(url);
                }
                if !state.replay_consumed && state.cold_start.as_deref() == Some(url.as_str()) {
                    state.replay_consumed = true;
                    log::debug!("Dropping replay of cold-start link");
                    return None;
                }
                state.replay_consumed = true;
                Some(url)
            }
        }
    }

    /// Forwards `event` to the orchestrator unless it is a replay.
    pub async fn dispatch(
        &self,
        event: LinkEvent,
        orchestrator: &JoinOrchestrator,
    ) -> Option<LinkDisposition> {
        let url = self.accept(event)?;
        Some(orchestrator.handle_incoming_link(&url).await)
    }

    /// Processes link events until the stream ends.
    ///
    /// Events are handled one at a time in arrival order.
    pub async fn run<S>(&self, events: S, orchestrator: Arc<JoinOrchestrator>)
    where
        S: Stream<Item = LinkEvent> + Send,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            self.dispatch(event, &orchestrator).await;
        }
        log::debug!("Deep link stream closed");
    }

    /// Processes events from a channel until every sender is dropped.
    pub async fn run_channel(
        &self,
        mut events: UnboundedReceiver<LinkEvent>,
        orchestrator: Arc<JoinOrchestrator>,
    ) {
        let stream = futures::stream::poll_fn(move |cx| events.poll_recv(cx));
        self.run(stream, orchestrator).await;
    }
}
