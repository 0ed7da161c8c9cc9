//! Ordered, id-addressable notification handlers.
//!
//! A [`Signal`] is a cheap handle onto a shared registry, so a handler can
//! hold a clone of the signal that invokes it and connect or disconnect
//! handlers while an emission is in progress. Emission always walks a
//! snapshot taken before the first handler runs.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::error;

use crate::{LayoutError, Result};

/// Error returned by a failing handler or callback.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of invoking a handler or callback.
pub type HandlerResult = std::result::Result<(), HandlerError>;

type Handler = Arc<dyn Fn() -> HandlerResult + Send + Sync>;

/// Identifies a connected handler within one signal. Ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

struct Registry {
    next_id: u64,
    handlers: Vec<(HandlerId, Handler)>,
}

/// A named list of handlers invoked in connection order.
#[derive(Clone)]
pub struct Signal {
    name: &'static str,
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}

impl Signal {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry {
                next_id: 1,
                handlers: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a handler and return its id.
    pub fn connect<F>(&self, handler: F) -> HandlerId
    where
        F: Fn() -> HandlerResult + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = HandlerId(registry.next_id);
        registry.next_id += 1;
        registry.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Remove the handler with `id`.
    ///
    /// An unknown id is an error unless `allow_missing` is set.
    pub fn disconnect(&self, id: HandlerId, allow_missing: bool) -> Result<()> {
        let mut registry = self.registry();
        let before = registry.handlers.len();
        registry.handlers.retain(|(existing, _)| *existing != id);
        if registry.handlers.len() == before && !allow_missing {
            return Err(LayoutError::HandlerNotConnected { id });
        }
        Ok(())
    }

    /// Remove every handler. Ids keep increasing afterwards.
    pub fn clear(&self) {
        self.registry().handlers.clear();
    }

    pub fn size(&self) -> usize {
        self.registry().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Invoke every handler connected when the call starts.
    ///
    /// Failing handlers are logged and do not stop the rest.
    pub fn emit(&self) {
        let snapshot: Vec<(HandlerId, Handler)> = self.registry().handlers.clone();
        for (id, handler) in snapshot {
            if let Err(e) = handler() {
                error!(signal = self.name, handler = id.0, error = %e, "signal_handler_failed");
            }
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Handlers never run under the lock, so poisoning cannot leave it inconsistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
