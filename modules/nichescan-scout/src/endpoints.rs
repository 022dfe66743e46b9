use std::collections::HashSet;
use std::sync::Mutex;

use catalog_client::Endpoint;
use rand::seq::IndexedRandom;
use serde::Serialize;
use tracing::warn;

/// Rotation over the configured egress proxies.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<String>,
    dead: Mutex<HashSet<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub total: usize,
    pub alive: usize,
    pub dead: Vec<String>,
    pub using_proxies: bool,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let endpoints = endpoints
            .into_iter()
            .filter(|e| seen.insert(e.clone()))
            .collect();
        Self {
            endpoints,
            dead: Mutex::new(HashSet::new()),
        }
    }

    pub fn direct() -> Self {
        Self::new(Vec::new())
    }

    /// A live endpoint chosen uniformly at random, or `Direct` when nothing
    /// is configured. An exhausted pool is revived before choosing.
    pub fn pick(&self) -> Endpoint {
        if self.endpoints.is_empty() {
            return Endpoint::Direct;
        }

        let mut dead = self.lock();
        if self.endpoints.iter().all(|e| dead.contains(e)) {
            warn!(total = self.endpoints.len(), "All endpoints dead, resetting pool");
            dead.clear();
        }

        let alive: Vec<&String> = self
            .endpoints
            .iter()
            .filter(|e| !dead.contains(*e))
            .collect();
        match alive.choose(&mut rand::rng()) {
            Some(url) => Endpoint::Proxy((*url).clone()),
            None => Endpoint::Direct,
        }
    }

    pub fn mark_dead(&self, endpoint: &Endpoint) {
        if let Endpoint::Proxy(url) = endpoint {
            if self.lock().insert(url.clone()) {
                warn!(endpoint = %url, "Endpoint marked dead");
            }
        }
    }

    pub fn status(&self) -> PoolStatus {
        let dead = self.lock();
        let mut dead_list: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| dead.contains(*e))
            .cloned()
            .collect();
        dead_list.sort();
        PoolStatus {
            total: self.endpoints.len(),
            alive: self.endpoints.len() - dead_list.len(),
            dead: dead_list,
            using_proxies: !self.endpoints.is_empty(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.dead.lock().unwrap_or_else(|e| e.into_inner())
    }
}
