//! Vehicle marker animation and the follow camera.

use haul_core::spatial::interpolate;
use haul_core::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Linear marker move between two consecutive path points.
#[derive(Debug, Clone, Copy)]
pub struct MarkerAnimation {
    from: GeoPoint,
    to: GeoPoint,
    started_at: Instant,
    duration: Duration,
}

impl MarkerAnimation {
    /// A marker standing still at `position`.
    pub fn resting(position: GeoPoint, now: Instant) -> Self {
        Self {
            from: position,
            to: position,
            started_at: now,
            duration: Duration::ZERO,
        }
    }

    pub fn start(from: GeoPoint, to: GeoPoint, now: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started_at: now,
            duration,
        }
    }

    pub fn position_at(&self, now: Instant) -> GeoPoint {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        interpolate(
            self.from,
            self.to,
            elapsed.as_secs_f64() / self.duration.as_secs_f64(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub target: GeoPoint,
    pub zoom: f32,
    pub bearing: f32,
    pub following: bool,
}

impl CameraState {
    pub fn new(target: GeoPoint, zoom: f32) -> Self {
        Self {
            target,
            zoom,
            bearing: 0.0,
            following: true,
        }
    }

    /// Called for every animation frame; only moves while following.
    /// Zoom and bearing are kept.
    pub fn on_frame(&mut self, marker: GeoPoint) {
        if self.following {
            self.target = marker;
        }
    }

    /// Manual pan or zoom by the user.
    pub fn user_gesture(&mut self, zoom: Option<f32>) {
        if let Some(zoom) = zoom {
            self.zoom = zoom;
        }
        if self.following {
            tracing::debug!("Camera follow disabled by user gesture");
        }
        self.following = false;
    }

    /// Flip follow mode; enabling jumps straight to the marker.
    pub fn toggle_follow(&mut self, marker: GeoPoint) -> bool {
        self.following = !self.following;
        if self.following {
            self.target = marker;
        }
        self.following
    }

    pub fn reset(&mut self, target: GeoPoint, zoom: f32) {
        self.target = target;
        self.zoom = zoom;
    }
}
