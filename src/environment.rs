use std::sync::Arc;

use slog::Logger;

use crate::store::RideStore;

pub type SharedStore = dyn RideStore + Send + Sync;

/// Everything a request handler needs, injected once at startup so
/// call sites never branch on which store implementation is active.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub store: Arc<SharedStore>,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, store: Arc<SharedStore>) -> Self {
        Self { logger, store }
    }
}
