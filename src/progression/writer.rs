//! Single-writer profile actor.
//!
//! All reductions for one profile run on one task, in submission order.
//! Readers get whole snapshots from a `watch` channel. Saving happens on a
//! second task that only ever writes the newest snapshot and retries with
//! backoff until it succeeds or the writer shuts down. Accepted reps are
//! handed to a third task for the rep log. Store and sink calls run on the
//! blocking pool, so a slow disk never holds up a reduction.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::engine::{ProgressionEngine, Reduction};
use super::persist::{ProfileStore, RepResultSink};
use super::profile::UserProfile;
use crate::config::PersistenceConfig;
use crate::error::{CoachError, Result};
use crate::session::RepResult;

const QUEUE_DEPTH: usize = 64;

enum Command {
    Submit {
        rep: RepResult,
        today: NaiveDate,
        reply: oneshot::Sender<Reduction>,
    },
}

/// What the writer left behind
#[derive(Debug)]
pub struct WriterShutdown {
    pub profile: UserProfile,
    /// Set when the last snapshot never reached the store
    pub persist_error: Option<CoachError>,
}

pub struct ProfileWriter {
    tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<UserProfile>,
    actor: JoinHandle<UserProfile>,
    logger: JoinHandle<()>,
    persister: JoinHandle<Result<()>>,
}

impl ProfileWriter {
    /// Starts the actor and persistence tasks on the current runtime.
    ///
    /// `history` is the rep log already folded into `profile`.
    pub fn spawn(
        engine: ProgressionEngine,
        profile: UserProfile,
        history: Vec<RepResult>,
        store: Arc<dyn ProfileStore>,
        sink: Arc<dyn RepResultSink>,
        config: &PersistenceConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let (snapshot_tx, snapshot_rx) = watch::channel(profile.clone());
        let (log_tx, log_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            engine,
            profile,
            history,
            log_tx,
            snapshot_tx,
        };
        let actor = tokio::spawn(actor.run(rx));
        let logger = tokio::spawn(log_loop(sink, log_rx));
        let persister = tokio::spawn(persist_loop(
            store,
            snapshot_rx.clone(),
            config.retry_delay(),
            config.max_retry_delay(),
        ));

        Self {
            tx,
            snapshot_rx,
            actor,
            logger,
            persister,
        }
    }

    /// Queues `rep` and waits for its reduction
    pub async fn submit(&self, rep: RepResult, today: NaiveDate) -> Result<Reduction> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Submit { rep, today, reply })
            .await
            .map_err(|_| CoachError::WriterClosed)?;
        response.await.map_err(|_| CoachError::WriterClosed)
    }

    /// Latest profile; never a partially applied update
    pub fn snapshot(&self) -> UserProfile {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UserProfile> {
        self.snapshot_rx.clone()
    }

    /// Drains queued reps, waits for the rep log and the final save attempt
    /// and returns the final profile
    pub async fn shutdown(self) -> Result<WriterShutdown> {
        let Self {
            tx,
            snapshot_rx,
            actor,
            logger,
            persister,
        } = self;
        drop(tx);

        let profile = match actor.await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!("[writer] actor task failed: {}", e);
                snapshot_rx.borrow().clone()
            }
        };
        if let Err(e) = logger.await {
            tracing::error!("[writer] rep log task failed: {}", e);
        }
        let persist_error = match persister.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(e) => Some(CoachError::Persistence {
                attempts: 0,
                message: format!("persistence task failed: {}", e),
            }),
        };
        if let Some(e) = &persist_error {
            tracing::error!("[writer] final profile not saved: {}", e);
        }
        Ok(WriterShutdown { profile, persist_error })
    }
}

struct Actor {
    engine: ProgressionEngine,
    profile: UserProfile,
    history: Vec<RepResult>,
    log_tx: mpsc::UnboundedSender<RepResult>,
    snapshot_tx: watch::Sender<UserProfile>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) -> UserProfile {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Submit { rep, today, reply } => {
                    let reduction = self.apply(rep, today);
                    // the caller may have stopped waiting; the update stands
                    let _ = reply.send(reduction);
                }
            }
        }
        tracing::debug!("[writer] queue closed after {} reps", self.history.len());
        self.profile
    }

    fn apply(&mut self, rep: RepResult, today: NaiveDate) -> Reduction {
        let reduction = self.engine.reduce(&self.profile, &self.history, &rep, today);
        self.profile = reduction.profile.clone();
        self.snapshot_tx.send_replace(self.profile.clone());

        if self.log_tx.send(rep.clone()).is_err() {
            tracing::warn!("[writer] rep log closed; rep {} not logged", rep.id);
        }
        self.history.push(rep);
        reduction
    }
}

/// Hands each accepted rep to the sink, in order, off the async workers
async fn log_loop(sink: Arc<dyn RepResultSink>, mut rx: mpsc::UnboundedReceiver<RepResult>) {
    while let Some(rep) = rx.recv().await {
        let id = rep.id;
        let sink = Arc::clone(&sink);
        match tokio::task::spawn_blocking(move || sink.emit(&rep)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("[writer] rep {} not logged: {}", id, e),
            Err(e) => tracing::error!("[writer] rep {} log task failed: {}", id, e),
        }
    }
}

/// Saves each new snapshot, newest wins.
///
/// Retryable save failures are retried with doubling delays capped at
/// `max_delay`. Once the actor has gone away, a save that still fails after
/// the delay has reached its cap is given up on and the error returned.
async fn persist_loop(
    store: Arc<dyn ProfileStore>,
    mut rx: watch::Receiver<UserProfile>,
    base_delay: Duration,
    max_delay: Duration,
) -> Result<()> {
    while rx.changed().await.is_ok() {
        let mut delay = base_delay;
        let mut attempts: u32 = 0;
        loop {
            let snapshot = rx.borrow_and_update().clone();
            attempts += 1;
            let saved = tokio::task::spawn_blocking({
                let store = Arc::clone(&store);
                move || store.save(&snapshot)
            })
            .await;
            let err = match saved {
                Ok(Ok(())) => {
                    if attempts > 1 {
                        tracing::info!("[persist] profile saved after {} attempts", attempts);
                    }
                    break;
                }
                Ok(Err(e)) => e,
                Err(e) => {
                    return Err(CoachError::Persistence {
                        attempts,
                        message: format!("save task failed: {}", e),
                    })
                }
            };

            let closed = rx.has_changed().is_err();
            if !err.is_retryable() || (closed && delay >= max_delay) {
                return Err(CoachError::Persistence {
                    attempts,
                    message: err.to_string(),
                });
            }
            tracing::warn!(
                "[persist] save attempt {} failed: {}; retrying in {:?}",
                attempts,
                err,
                delay
            );
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(max_delay);
        }
    }
    Ok(())
}
