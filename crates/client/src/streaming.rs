//! Async asset loading used by hosts to answer `AnimationCommand::Stream`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;

#[derive(Debug, thiserror::Error)]
pub enum StreamingError {
    #[error("timed out after {after:?} waiting for {asset}")]
    Timeout { asset: String, after: Duration },
    #[error("streamer dropped {0} before it loaded")]
    StreamerGone(String),
}

/// Something that can start loading an asset and report readiness.
pub trait AssetStreamer {
    fn request(&self, asset: &str) -> watch::Receiver<bool>;
}

/// Suspends until `ready` flips to true or `timeout` elapses.
pub async fn wait_until_loaded(
    mut ready: watch::Receiver<bool>,
    asset: &str,
    timeout: Duration,
) -> Result<(), StreamingError> {
    match tokio::time::timeout(timeout, ready.wait_for(|loaded| *loaded)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(StreamingError::StreamerGone(asset.to_string())),
        Err(_) => Err(StreamingError::Timeout {
            asset: asset.to_string(),
            after: timeout,
        }),
    }
}

pub async fn stream_asset(
    streamer: &dyn AssetStreamer,
    asset: &str,
    timeout: Duration,
) -> Result<(), StreamingError> {
    let ready = streamer.request(asset);
    wait_until_loaded(ready, asset, timeout).await
}

/// In-process streamer whose assets are flipped to loaded by the host when
/// the game reports them.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: RefCell<HashMap<String, watch::Sender<bool>>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_loaded(&self, asset: &str) {
        let mut assets = self.assets.borrow_mut();
        let sender = assets
            .entry(asset.to_string())
            .or_insert_with(|| watch::channel(false).0);
        sender.send_replace(true);
    }

    pub fn unload(&self, asset: &str) {
        if let Some(sender) = self.assets.borrow().get(asset) {
            sender.send_replace(false);
        }
    }

    pub fn is_loaded(&self, asset: &str) -> bool {
        self.assets
            .borrow()
            .get(asset)
            .is_some_and(|sender| *sender.borrow())
    }
}

impl AssetStreamer for AssetRegistry {
    fn request(&self, asset: &str) -> watch::Receiver<bool> {
        self.assets
            .borrow_mut()
            .entry(asset.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }
}
