//! Shared application state handed to every route handler.

use crate::config::Config;
use governor::{Quota, RateLimiter};
use governor::state::{InMemoryState, NotKeyed};
use governor::clock::DefaultClock;
use kibotos_objectstore::ObjectStore;
use kibotos_store::Store;
use kibotos_vlm::VlmClient;
use std::num::NonZeroU32;
use std::sync::Arc;

pub type VlmPacer = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub objectstore: Arc<ObjectStore>,
    pub vlm_client: Arc<dyn VlmClient>,
    pub admin_token: Arc<String>,
    pub presign_ttl_sec: u32,
    pub vlm_model: Arc<String>,
    /// In-process pacer for the internal `/v1/evaluate/vlm` proxy, separate
    /// from the durable `acquire_vlm_tokens` counter the store enforces
    /// across replicas.
    pub vlm_pacer: Arc<VlmPacer>,
}

impl AppState {
    pub fn new(
        store: Store,
        objectstore: ObjectStore,
        vlm_client: Arc<dyn VlmClient>,
        config: &Config,
    ) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.vlm_rate_per_sec.max(1)).expect("nonzero"),
        );
        Self {
            store,
            objectstore: Arc::new(objectstore),
            vlm_client,
            admin_token: Arc::new(config.admin_token.clone()),
            presign_ttl_sec: config.presign_ttl_sec,
            vlm_model: Arc::new(config.vlm_model.clone()),
            vlm_pacer: Arc::new(RateLimiter::direct(quota)),
        }
    }
}
