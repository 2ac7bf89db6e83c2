use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::exam::flow::ExamFlow;

/// A live flow. Mutating requests take the lock with `try_lock`, so a second
/// request arriving mid-call is turned away instead of queued.
pub type SharedFlow = Arc<Mutex<ExamFlow>>;

struct Entry {
    flow: SharedFlow,
    touched: Instant,
}

/// In-memory registry of running exam flows, keyed by a server-issued id.
///
/// Feedback is optional, so flows are also dropped once nobody has looked
/// them up for the idle TTL (see [`ExamRegistry::spawn_sweeper`]).
#[derive(Default)]
pub struct ExamRegistry {
    flows: RwLock<HashMap<Uuid, Entry>>,
}

impl ExamRegistry {
    pub fn insert(&self, flow: ExamFlow) -> Uuid {
        let id = Uuid::new_v4();
        let mut flows = self.flows.write().unwrap_or_else(|e| e.into_inner());
        flows.insert(
            id,
            Entry {
                flow: Arc::new(Mutex::new(flow)),
                touched: Instant::now(),
            },
        );
        id
    }

    /// Looks a flow up and marks it as recently used.
    pub fn get(&self, id: &Uuid) -> Option<SharedFlow> {
        let mut flows = self.flows.write().unwrap_or_else(|e| e.into_inner());
        flows.get_mut(id).map(|entry| {
            entry.touched = Instant::now();
            entry.flow.clone()
        })
    }

    pub fn remove(&self, id: &Uuid) -> Option<SharedFlow> {
        let mut flows = self.flows.write().unwrap_or_else(|e| e.into_inner());
        flows.remove(id).map(|entry| entry.flow)
    }

    pub fn len(&self) -> usize {
        self.flows.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drops flows idle for at least `ttl`. A flow that is serving a request
    /// right now is kept. Returns how many were dropped.
    pub fn evict_idle(&self, now: Instant, ttl: Duration) -> usize {
        let mut flows = self.flows.write().unwrap_or_else(|e| e.into_inner());
        let before = flows.len();
        flows.retain(|_, entry| {
            now.saturating_duration_since(entry.touched) < ttl || entry.flow.try_lock().is_err()
        });
        before - flows.len()
    }

    /// Runs `evict_idle` every `every` for as long as the registry is alive.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration, ttl: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.evict_idle(Instant::now(), ttl);
                if evicted > 0 {
                    info!(
                        "Dropped {evicted} idle exam flow(s), {} remaining",
                        registry.len()
                    );
                }
            }
        })
    }
}
