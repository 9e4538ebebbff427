//! Lock-free listener pose transport.
//!
//! The navigation/UI thread publishes complete [`ListenerPose`] values
//! through a [`PosePublisher`]; the audio thread reads one consistent
//! snapshot per block through the matching [`PoseCell`]. The slot is an
//! atomic pointer swap, so a reader can never observe a half-written
//! pose and never blocks. A pose published mid-block takes effect at
//! the next block boundary.

use std::sync::Arc;

use arc_swap::ArcSwap;

use shac_math::Vec3;

/// Listener position and orientation.
///
/// Yaw is the azimuth turn around +Y (up); pitch is the elevation turn
/// around the local +X (right) axis after yaw. Radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ListenerPose {
    /// Position in meters.
    pub position: Vec3,
    /// Azimuth orientation in radians; positive turns toward +X.
    pub yaw: f32,
    /// Elevation orientation in radians; positive looks up.
    pub pitch: f32,
}

impl ListenerPose {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    /// True when every field is finite; the decoder treats anything
    /// else as one silent block.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.yaw.is_finite() && self.pitch.is_finite()
    }
}

/// Create a linked publisher/reader pair seeded with `initial`.
pub fn pose_slot(initial: ListenerPose) -> (PosePublisher, PoseCell) {
    let shared = Arc::new(ArcSwap::from_pointee(initial));
    (
        PosePublisher {
            shared: Arc::clone(&shared),
        },
        PoseCell { shared },
    )
}

/// Writer half of the pose slot. One producer: the navigation thread.
#[derive(Debug)]
pub struct PosePublisher {
    shared: Arc<ArcSwap<ListenerPose>>,
}

impl PosePublisher {
    /// Publish a complete pose; readers see either the previous or the
    /// new value, never a mix.
    pub fn publish(&self, pose: ListenerPose) {
        self.shared.store(Arc::new(pose));
    }
}

/// Reader half of the pose slot, owned by the decoder.
#[derive(Debug)]
pub struct PoseCell {
    shared: Arc<ArcSwap<ListenerPose>>,
}

impl PoseCell {
    /// Load the most recently published pose.
    pub fn snapshot(&self) -> ListenerPose {
        **self.shared.load()
    }
}
