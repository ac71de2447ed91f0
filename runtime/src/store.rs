//! Store: owns reducer state and executes the effects reductions return.
//!
//! Unlike a fire-and-forget `send`, callers that need to read state and
//! act on it atomically take the lock with [`Store::lock`] and reduce
//! through [`Store::apply`] while holding it. Effects run on the tokio
//! runtime and never while the state lock is held by them.

use boxoffice_core::effect::Effect;
use boxoffice_core::reducer::Reducer;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard};

struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reducer state behind an async mutex, plus the reducer and its environment.
pub struct Store<R: Reducer> {
    state: Arc<Mutex<R::State>>,
    reducer: Arc<R>,
    environment: Arc<R::Environment>,
    pending_effects: Arc<AtomicUsize>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            environment: Arc::clone(&self.environment),
            pending_effects: Arc::clone(&self.pending_effects),
        }
    }
}

impl<R: Reducer> fmt::Debug for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("pending_effects", &self.pending_effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync + 'static,
    R::State: Send + 'static,
    R::Action: Send + 'static,
    R::Environment: Send + Sync + 'static,
{
    /// Create a store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial_state)),
            reducer: Arc::new(reducer),
            environment: Arc::new(environment),
            pending_effects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Locks the state for a read-check-apply sequence
    pub async fn lock(&self) -> MutexGuard<'_, R::State> {
        self.state.lock().await
    }

    /// Locks the state only if nobody else holds it
    #[must_use]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, R::State>> {
        self.state.try_lock().ok()
    }

    /// Reduces `action` against state the caller has locked, then starts
    /// the resulting effects.
    pub fn apply(&self, state: &mut R::State, action: R::Action) {
        let effects = self.reducer.reduce(state, action, &self.environment);
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Locks the state and reduces a single action
    pub async fn send(&self, action: R::Action) {
        let mut state = self.state.lock().await;
        self.apply(&mut state, action);
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::SeqCst)
    }

    fn execute_effect(&self, effect: Effect<R::Action>) {
        match effect {
            Effect::None => {
                tracing::trace!("Executing Effect::None (no-op)");
            }
            Effect::Future(fut) => {
                tracing::trace!("Executing Effect::Future");
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                let store = self.clone();

                tokio::spawn(async move {
                    let _pending_guard = pending_guard;
                    if let Some(action) = fut.await {
                        tracing::trace!("Effect::Future produced an action, sending to store");
                        store.send(action).await;
                    }
                });
            }
            Effect::Parallel(effects) => {
                tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                for effect in effects {
                    self.execute_effect(effect);
                }
            }
        }
    }
}
