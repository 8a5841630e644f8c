// Shared fixtures for integration tests
#![allow(dead_code)]

use interview_relay::{Asset, AssetKind, MemoryRepository, SessionStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub fn image_asset(asset_id: &str, title: &str) -> Asset {
    Asset {
        asset_id: asset_id.to_string(),
        title: title.to_string(),
        kind: AssetKind::Image,
        url: format!("/storage/{}.png", asset_id),
        poster_url: None,
        duration_sec: None,
        start_time: None,
        end_time: None,
    }
}

pub fn video_asset(asset_id: &str, title: &str, duration_sec: f64) -> Asset {
    Asset {
        asset_id: asset_id.to_string(),
        title: title.to_string(),
        kind: AssetKind::Video,
        url: format!("/storage/{}.mp4", asset_id),
        poster_url: Some(format!("/storage/{}-poster.jpg", asset_id)),
        duration_sec: Some(duration_sec),
        start_time: None,
        end_time: None,
    }
}

pub fn memory_store() -> Arc<SessionStore> {
    Arc::new(SessionStore::new(Arc::new(MemoryRepository::new())))
}

/// Poll `check` until it returns true or two seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
