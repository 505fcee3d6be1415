use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use proj::TileKey;
use tracing::warn;

use crate::cache::{CacheLimits, TileCache};
use crate::decode::TileDecoder;
use crate::feature::Feature;
use crate::source::TileSource;

type SharedLoad = Shared<BoxFuture<'static, Arc<[Feature]>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LoadKey {
    key: TileKey,
    layer: String,
}

/// Resolves tiles to feature lists: cache first, otherwise fetch + decode +
/// cache fill. Concurrent resolves of the same (tile, layer) share one
/// in-flight future, so exactly one fetch is issued.
///
/// `resolve` never fails out: fetch and decode errors are logged with the
/// tile key and degrade to an empty feature list, which is not cached, so
/// the next render retries naturally.
pub struct TileLoader<S, D> {
    source: S,
    decoder: D,
    cache: Mutex<TileCache>,
    in_flight: Mutex<HashMap<LoadKey, SharedLoad>>,
}

impl<S: TileSource, D: TileDecoder> TileLoader<S, D> {
    pub fn new(source: S, decoder: D, limits: CacheLimits) -> Self {
        Self {
            source,
            decoder,
            cache: Mutex::new(TileCache::new(limits)),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_tiles(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub async fn resolve(self: &Arc<Self>, key: TileKey, layer: &str) -> Arc<[Feature]> {
        if let Some(hit) = self.cache.lock().get(&key, layer, Instant::now()) {
            return hit;
        }

        let load_key = LoadKey {
            key,
            layer: layer.to_string(),
        };
        let load = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&load_key) {
                Some(load) => load.clone(),
                None => {
                    let this = Arc::clone(self);
                    let started = load_key.clone();
                    let load: SharedLoad =
                        async move { this.fetch_and_store(started).await }.boxed().shared();
                    in_flight.insert(load_key, load.clone());
                    load
                }
            }
        };
        load.await
    }

    async fn fetch_and_store(self: Arc<Self>, load_key: LoadKey) -> Arc<[Feature]> {
        let LoadKey { key, layer } = &load_key;

        let decoded = match self.source.fetch(*key, layer).await {
            Ok(bytes) => self.decoder.decode(&bytes, key.z).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let features: Arc<[Feature]> = match decoded {
            Ok(features) => {
                let features: Arc<[Feature]> = features.into();
                self.cache
                    .lock()
                    .insert(*key, layer.clone(), Arc::clone(&features), Instant::now());
                features
            }
            Err(error) => {
                warn!(tile = %key, layer, error, "tile resolve failed, serving empty tile");
                Vec::new().into()
            }
        };

        self.in_flight.lock().remove(&load_key);
        features
    }
}

impl<S, D> std::fmt::Debug for TileLoader<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("cached_tiles", &self.cache.lock().len())
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}
