use crate::types::{MAX_NUM_USERS, Resolution};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Color,
    Depth,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Color => DisplayMode::Depth,
            DisplayMode::Depth => DisplayMode::Color,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Color => "color",
            DisplayMode::Depth => "depth",
        }
    }
}

/// What to do with depth samples at or above `MAX_DEPTH`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DepthRangePolicy {
    /// Treat the sample as `MAX_DEPTH - 1`.
    #[default]
    Clamp,
    /// Fail the frame with `ViewerError::DataRange`.
    Reject,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    #[default]
    Synthetic,
    #[cfg(feature = "camera-nokhwa")]
    Webcam { index: u32 },
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Synthetic => "synthetic",
            #[cfg(feature = "camera-nokhwa")]
            SourceKind::Webcam { .. } => "webcam",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub source: SourceKind,
    /// Output mode requested from sources that let us choose one.
    pub output: Resolution,
    /// Synthetic population size, capped at `MAX_NUM_USERS`.
    pub users: usize,
    /// Synthetic frame pacing; 0 disables pacing.
    pub fps: u32,
    pub display_mode: DisplayMode,
    pub mirror: bool,
    pub depth_policy: DepthRangePolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            output: Resolution::new(640, 480),
            users: MAX_NUM_USERS,
            fps: 30,
            display_mode: DisplayMode::default(),
            mirror: false,
            depth_policy: DepthRangePolicy::default(),
        }
    }
}

impl ViewerConfig {
    pub fn user_count(&self) -> usize {
        self.users.min(MAX_NUM_USERS)
    }
}
