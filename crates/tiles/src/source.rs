use std::fmt;
use std::future::Future;

use proj::TileKey;

/// Fetch failure for one tile. Recoverable: the loader logs it and serves
/// an empty tile instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport-level failure (DNS, connect, body read, ...).
    Transport(String),
    /// The server answered with a non-success status.
    Status(u16),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(reason) => write!(f, "tile fetch failed: {reason}"),
            FetchError::Status(code) => write!(f, "tile fetch failed: http status {code}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Async byte source for raw tile payloads.
///
/// No retries and no deadline: a stalled fetch stalls only its tile.
pub trait TileSource: Send + Sync + 'static {
    fn fetch(
        &self,
        key: TileKey,
        layer: &str,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Tile source speaking the map backend's HTTP contract:
/// `GET {base}/api/maps/tiles/{z}/{x}/{y}.mvt?layer={layer}`.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTileSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn tile_url(&self, key: TileKey, layer: &str) -> String {
        format!(
            "{}/api/maps/tiles/{}/{}/{}.mvt?layer={layer}",
            self.base_url.trim_end_matches('/'),
            key.z,
            key.x,
            key.y,
        )
    }
}

impl TileSource for HttpTileSource {
    async fn fetch(&self, key: TileKey, layer: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(self.tile_url(key, layer))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpTileSource;
    use proj::TileKey;

    #[test]
    fn tile_url_shape() {
        let source = HttpTileSource::new("https://fleet.example/");
        assert_eq!(
            source.tile_url(TileKey::new(10, 567, 354), "boundaries"),
            "https://fleet.example/api/maps/tiles/10/567/354.mvt?layer=boundaries"
        );
    }
}
