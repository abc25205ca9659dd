//! Tick scheduler: one interval driver per actor
//!
//! A `RunSession` spawns a tokio task per driven actor. Each task ticks on
//! its own fixed-period interval; actors are not synchronized with each
//! other, so a collision sweep may see another actor's pose from its
//! previous tick. Every tick re-checks the run generation and publishes its
//! events under the world lock, so nothing mutates the world or reaches
//! subscribers once the run has ended.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::error::{Result, StageError};
use super::events::{EventBus, StageEvent};
use super::ids::ActorId;
use super::world::{TickOutcome, World};

/// An active run: the generation it drives plus its driver tasks
pub struct RunSession {
    generation: u64,
    shutdown: watch::Sender<bool>,
    drivers: Vec<JoinHandle<()>>,
}

impl RunSession {
    /// Begin a run on `world` and spawn one driver per actor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(world: Arc<Mutex<World>>, bus: EventBus, period: Duration) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| StageError::NoAsyncRuntime)?;

        let (generation, driven) = {
            let mut world = world.lock();
            let generation = world.begin_run();
            let driven = world
                .run_state()
                .map(|run| run.driven().to_vec())
                .unwrap_or_default();
            (generation, driven)
        };

        bus.publish([StageEvent::RunStarted {
            actors: driven.len(),
        }]);

        let (shutdown, signal) = watch::channel(false);
        let drivers = driven
            .into_iter()
            .map(|actor| {
                handle.spawn(drive_actor(
                    world.clone(),
                    bus.clone(),
                    actor,
                    generation,
                    period,
                    signal.clone(),
                ))
            })
            .collect();

        Ok(Self {
            generation,
            shutdown,
            drivers,
        })
    }

    /// Generation of the run this session drives
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of driver tasks
    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Signal and abort every driver, returning their handles
    pub fn cancel(self) -> Vec<JoinHandle<()>> {
        let _ = self.shutdown.send(true);
        for driver in &self.drivers {
            driver.abort();
        }
        self.drivers
    }

    /// Cancel and wait until every driver has finished
    pub async fn shutdown(self) {
        let drivers = self.cancel();
        join_all(drivers).await;
    }
}

async fn drive_actor(
    world: Arc<Mutex<World>>,
    bus: EventBus,
    actor: ActorId,
    generation: u64,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // publish under the lock so nothing lands after RunStopped
                let finished = {
                    let mut guard = world.lock();
                    match guard.tick_actor(actor, generation) {
                        TickOutcome::Ticked(events) => {
                            bus.publish(events);
                            false
                        }
                        TickOutcome::Stale | TickOutcome::ActorGone => true,
                    }
                };
                if finished {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::debug!(%actor, generation, "tick driver finished");
}
