use crate::api::{self, AuthSession, Error};
use crate::metric_collector::MetricCollector;
use crate::model::{AuthToken, RawPayload, Snapshot, Source};
use crate::settings::CoordinatorConfig;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Authenticating,
    Fetching,
    Normalizing,
    Published,
    Failed,
}

/// What readers see of the coordinator.
///
/// `snapshot` is the last good snapshot. It survives failed cycles, in which
/// case `available` is false.
#[derive(Debug, Clone)]
pub struct Status {
    pub state: CycleState,
    pub available: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub snapshot: Option<Arc<Snapshot>>,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            state: CycleState::Idle,
            available: false,
            consecutive_failures: 0,
            last_error: None,
            snapshot: None,
        }
    }
}

/// Drives the refresh cycle of one installation.
///
/// A cycle logs in when no token is held, reads the overview and the
/// production endpoints and merges them into a `Snapshot`. A rejected token
/// gets exactly one re-authentication per cycle.
pub struct Coordinator {
    session: AuthSession,
    interval: Duration,
    status: watch::Sender<Status>,
}

impl Coordinator {
    pub fn new(config: &CoordinatorConfig) -> Result<Self, Error> {
        let api = api::api(&config.api_url, config.timeout)?;
        let session = AuthSession::new(api, config.credentials.clone());
        Ok(Coordinator::with_session(session, config.interval))
    }

    pub fn with_session(session: AuthSession, interval: Duration) -> Self {
        let (status, _) = watch::channel(Status::default());
        Coordinator {
            session,
            interval,
            status,
        }
    }

    /// Build a coordinator and run the first refresh. Failing that refresh
    /// fails the whole setup.
    pub async fn setup(config: &CoordinatorConfig) -> Result<Self, Error> {
        let mut coordinator = Coordinator::new(config)?;
        coordinator.first_refresh().await?;
        Ok(coordinator)
    }

    pub async fn first_refresh(&mut self) -> Result<Arc<Snapshot>, Error> {
        self.refresh().await.map_err(|e| {
            log::error!(
                "Unable to connect to Hypontech API as {}: {}",
                self.session.credentials().identifier(),
                e
            );
            Error::NotReady(e.to_string())
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.status.borrow().snapshot.clone()
    }

    pub fn available(&self) -> bool {
        self.status.borrow().available
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle. On success the cached snapshot is replaced and
    /// subscribers are notified; on failure the previous snapshot is kept and
    /// the coordinator reports itself unavailable.
    pub async fn refresh(&mut self) -> Result<Arc<Snapshot>, Error> {
        match self.cycle().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.status.send_modify(|status| {
                    status.state = CycleState::Published;
                    status.available = true;
                    status.consecutive_failures = 0;
                    status.last_error = None;
                    status.snapshot = Some(Arc::clone(&snapshot));
                });
                log::debug!("Published snapshot: {:?}", snapshot);
                Ok(snapshot)
            }
            Err(e) => {
                self.status.send_modify(|status| {
                    status.state = CycleState::Failed;
                    status.available = false;
                    status.consecutive_failures += 1;
                    status.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    async fn cycle(&mut self) -> Result<Snapshot, Error> {
        let mut reauthenticated = false;

        if self.session.token().is_none() {
            self.transition(CycleState::Authenticating);
            self.session.login().await?;
        }

        self.transition(CycleState::Fetching);
        let overview = self.acquire(Source::Overview, &mut reauthenticated).await?;
        let production = self.acquire(Source::Production, &mut reauthenticated).await?;

        self.transition(CycleState::Normalizing);
        Ok(Snapshot::merge(&overview, &production))
    }

    async fn fetch(&self, source: Source, token: &AuthToken) -> Result<RawPayload, Error> {
        match source {
            Source::Overview => self.session.overview(token).await,
            Source::Production => self.session.production(token).await,
        }
    }

    async fn acquire(
        &mut self,
        source: Source,
        reauthenticated: &mut bool,
    ) -> Result<RawPayload, Error> {
        let token = self.session.ensure_token().await?;

        let result = match self.fetch(source, &token).await {
            Err(Error::Unauthorized) if !*reauthenticated => {
                log::warn!("{:?} endpoint rejected token, logging in again", source);
                *reauthenticated = true;
                self.session.invalidate();

                self.transition(CycleState::Authenticating);
                let token = self.session.login().await?;
                self.transition(CycleState::Fetching);
                self.fetch(source, &token).await
            }
            result => result,
        };

        if let Err(Error::Unauthorized) = result {
            self.session.invalidate();
        }
        result
    }

    /* intermediate states are visible to readers but do not wake them */
    fn transition(&self, state: CycleState) {
        log::debug!("Refresh cycle: {:?}", state);
        self.status.send_if_modified(|status| {
            status.state = state;
            false
        });
    }

    /// Refresh every `interval` until `shutdown` resolves. Failures are
    /// logged, never propagated.
    pub async fn run<F>(mut self, mut collectors: Vec<Box<dyn MetricCollector>>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        /* the first tick fires immediately; setup already did that refresh */
        ticker.tick().await;

        let status = self.status();
        collectors.iter_mut().for_each(|c| c.publish(&status));

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Stopping refresh loop");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh().await {
                        log::warn!(
                            "Refresh failed ({} in a row), serving last snapshot: {}",
                            self.status.borrow().consecutive_failures,
                            e
                        );
                    }

                    let status = self.status();
                    collectors.iter_mut().for_each(|c| c.publish(&status));
                }
            }
        }
    }
}
