//! # Preview Coordinator
//!
//! Keyed, cancellable generation for interactive previews (hover, typing).
//!
//! ## Coordination Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PreviewCoordinator                                 │
//! │                                                                         │
//! │  request(target, spec, closed)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Issue ticket #n for target ──► older tickets of target superseded  │
//! │       │                            (stale request aborted if no other  │
//! │       │                             target still waits on its key)     │
//! │       ▼                                                                 │
//! │  2. Cache hit?  ──── yes ──► Ready(artifacts)                          │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  3. In flight for key? ── yes ──► join (watch channel)                 │
//! │       │ no                                                              │
//! │       ▼                                                                 │
//! │  4. Spawn gateway call, register as in flight                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  5. Await result; ticket still current? ── no ──► Superseded           │
//! │                                          └─ yes ─► Ready / error        │
//! │     (the ticket is dropped either way; only pending requests count)    │
//! │                                                                         │
//! │  INVARIANTS:                                                           │
//! │  • At most one in-flight gateway call per GenerationKey                │
//! │  • Completed artifacts served from a bounded cache (moka)              │
//! │  • A superseded ticket never yields Ready                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use atelier_core::ValidatedSpecification;
use moka::sync::Cache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::error::{GatewayError, GatewayResult};
use crate::generation::{Artifacts, GenerationGateway, GenerationKey};

/// Shared slot an in-flight call publishes its result into.
type ResultSlot = watch::Receiver<Option<GatewayResult<Artifacts>>>;

// =============================================================================
// Outcome
// =============================================================================

/// Result of a preview request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Artifacts for the target's current request.
    Ready(Artifacts),

    /// A newer request for the same target replaced this one.
    Superseded,
}

impl PreviewOutcome {
    pub fn artifacts(&self) -> Option<&Artifacts> {
        match self {
            PreviewOutcome::Ready(artifacts) => Some(artifacts),
            PreviewOutcome::Superseded => None,
        }
    }
}

// =============================================================================
// State
// =============================================================================

struct InFlight {
    /// Distinguishes this call from a later one for the same key.
    id: u64,
    result: ResultSlot,
    abort: AbortHandle,
}

#[derive(Debug, Clone)]
struct Ticket {
    id: u64,
    key: GenerationKey,
}

#[derive(Default)]
struct State {
    in_flight: HashMap<GenerationKey, InFlight>,
    targets: HashMap<String, Ticket>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Aborts the call for `key` if no target's current ticket points at it.
    fn release(&mut self, key: &GenerationKey) {
        let still_wanted = self.targets.values().any(|ticket| &ticket.key == key);
        if still_wanted {
            return;
        }
        if let Some(flight) = self.in_flight.remove(key) {
            debug!(%key, "Aborting superseded generation");
            flight.abort.abort();
        }
    }
}

struct Inner {
    gateway: Arc<dyn GenerationGateway>,
    cache: Cache<GenerationKey, Artifacts>,
    state: Mutex<State>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Deduplicating, caching front for a [`GenerationGateway`].
///
/// Cheap to clone; clones share the cache and in-flight table.
///
/// ## Usage
/// ```rust,ignore
/// let coordinator = PreviewCoordinator::new(gateway, 256);
/// let spec = atelier_core::check("M1(1000,400,1000)bE")?;
///
/// match coordinator.request("hover", &spec, true).await? {
///     PreviewOutcome::Ready(artifacts) => show(artifacts.glb_url),
///     PreviewOutcome::Superseded => {} // user already moved on
/// }
/// ```
#[derive(Clone)]
pub struct PreviewCoordinator {
    inner: Arc<Inner>,
}

impl PreviewCoordinator {
    /// Creates a coordinator caching up to `cache_capacity` completed results.
    pub fn new(gateway: Arc<dyn GenerationGateway>, cache_capacity: u64) -> Self {
        PreviewCoordinator {
            inner: Arc::new(Inner {
                gateway,
                cache: Cache::new(cache_capacity),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Requests artifacts for `spec` on behalf of `target`.
    ///
    /// A later request for the same target makes this one resolve to
    /// [`PreviewOutcome::Superseded`], whatever the gateway returned.
    pub async fn request(
        &self,
        target: &str,
        spec: &ValidatedSpecification,
        closed: bool,
    ) -> GatewayResult<PreviewOutcome> {
        let key = GenerationKey::new(spec, closed);
        let (ticket, mut slot) = match self.enter(target, &key) {
            Entry::Cached(artifacts) => return Ok(PreviewOutcome::Ready(artifacts)),
            Entry::Waiting { ticket, slot } => (ticket, slot),
        };

        let result = wait_for(&mut slot).await;

        if !ticket.settle() {
            debug!(preview_target = target, %key, "Discarding superseded preview result");
            return Ok(PreviewOutcome::Superseded);
        }

        match result {
            Some(Ok(artifacts)) => Ok(PreviewOutcome::Ready(artifacts)),
            Some(Err(e)) => Err(e),
            None => Err(GatewayError::Cancelled),
        }
    }

    /// Withdraws `target`'s current request, aborting it if nobody else waits
    /// on the same key. Its pending caller resolves to `Superseded`.
    pub fn cancel(&self, target: &str) {
        let mut state = self.inner.state();
        if let Some(ticket) = state.targets.remove(target) {
            state.release(&ticket.key);
        }
    }

    /// Completed artifacts for a key, if cached.
    pub fn cached(&self, key: &GenerationKey) -> Option<Artifacts> {
        self.inner.cache.get(key)
    }

    /// Number of gateway calls currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.state().in_flight.len()
    }

    /// Number of targets with an unresolved request.
    pub fn pending_targets(&self) -> usize {
        self.inner.state().targets.len()
    }

    /// Issues a ticket, then serves from cache, joins, or starts a call.
    fn enter(&self, target: &str, key: &GenerationKey) -> Entry {
        let mut state = self.inner.state();

        let ticket_id = state.next_id();
        let previous = state.targets.insert(
            target.to_string(),
            Ticket {
                id: ticket_id,
                key: key.clone(),
            },
        );
        if let Some(previous) = previous.filter(|p| &p.key != key) {
            state.release(&previous.key);
        }

        if let Some(artifacts) = self.inner.cache.get(key) {
            debug!(preview_target = target, %key, "Preview cache hit");
            state.targets.remove(target);
            return Entry::Cached(artifacts);
        }

        let ticket = PendingTicket {
            inner: Arc::clone(&self.inner),
            target: target.to_string(),
            id: ticket_id,
            key: key.clone(),
        };

        if let Some(flight) = state.in_flight.get(key) {
            debug!(preview_target = target, %key, "Joining in-flight generation");
            return Entry::Waiting {
                ticket,
                slot: flight.result.clone(),
            };
        }

        let flight_id = state.next_id();
        let (tx, rx) = watch::channel(None);
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        info!(preview_target = target, %key, "Starting generation");
        let handle = tokio::spawn(async move {
            let result = inner.gateway.generate(&task_key).await;
            if let Ok(artifacts) = &result {
                inner.cache.insert(task_key.clone(), artifacts.clone());
            }
            {
                let mut state = inner.state();
                if state
                    .in_flight
                    .get(&task_key)
                    .is_some_and(|flight| flight.id == flight_id)
                {
                    state.in_flight.remove(&task_key);
                }
            }
            // Every waiter may have gone; nothing to do then
            let _ = tx.send(Some(result));
        });

        state.in_flight.insert(
            key.clone(),
            InFlight {
                id: flight_id,
                result: rx.clone(),
                abort: handle.abort_handle(),
            },
        );

        Entry::Waiting { ticket, slot: rx }
    }
}

enum Entry {
    Cached(Artifacts),
    Waiting {
        ticket: PendingTicket,
        slot: ResultSlot,
    },
}

/// A target's ticket while its request is unresolved.
///
/// The ticket leaves `State::targets` once the request resolves or its
/// future is dropped, so only pending requests keep a key alive.
struct PendingTicket {
    inner: Arc<Inner>,
    target: String,
    id: u64,
    key: GenerationKey,
}

impl PendingTicket {
    /// Removes the ticket if it is still the target's current one.
    /// Returns `false` when a newer request or a cancel replaced it.
    fn settle(&self) -> bool {
        let mut state = self.inner.state();
        let current = state
            .targets
            .get(&self.target)
            .is_some_and(|ticket| ticket.id == self.id);
        if current {
            state.targets.remove(&self.target);
            state.release(&self.key);
        }
        current
    }
}

impl Drop for PendingTicket {
    fn drop(&mut self) {
        self.settle();
    }
}

/// Waits for the slot to be filled. `None` means the call was aborted.
async fn wait_for(slot: &mut ResultSlot) -> Option<GatewayResult<Artifacts>> {
    loop {
        let current = slot.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if slot.changed().await.is_err() {
            // Sender dropped; it may have published just before
            let last = slot.borrow().clone();
            return last;
        }
    }
}
