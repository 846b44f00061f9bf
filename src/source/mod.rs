mod projection;
mod synthetic;

#[cfg(feature = "camera-nokhwa")]
mod rgb_converter;
#[cfg(feature = "camera-nokhwa")]
mod webcam;

pub use projection::ProjectiveTransform;
pub use synthetic::SyntheticSource;
#[cfg(feature = "camera-nokhwa")]
pub use webcam::{WebcamDevice, WebcamSource, available_webcams};

use crate::{
    config::{SourceKind, ViewerConfig},
    error::{Result, SourceError},
    types::{ColorFrame, DepthFrame, Joint, JointName, Point2, Point3, Resolution, TrackedUser, UserId},
};

/// Skeleton queries against the current frame snapshot.
pub trait JointProvider {
    /// `None` when the user is no longer part of the snapshot.
    fn joint(&self, user: UserId, name: JointName) -> Option<Joint>;

    /// Real-world to projective transform, applied to a batch of points.
    fn project_to_screen(&self, points: &[Point3]) -> Vec<Point2>;
}

/// A sensor (or stand-in) producing synchronized depth, color and user data.
///
/// Accessors return the snapshot captured by the last successful
/// [`FrameSource::wait_for_next_frame`]; before the first call they return a
/// blank frame at the negotiated resolution.
pub trait FrameSource: JointProvider {
    fn name(&self) -> &str;

    /// Blocks until every generator has advanced by one frame.
    fn wait_for_next_frame(&mut self) -> Result<(), SourceError>;

    fn depth_frame(&self) -> &DepthFrame;

    fn color_frame(&self) -> &ColorFrame;

    /// At most `MAX_NUM_USERS` users, in source order.
    fn tracked_users(&self) -> Vec<TrackedUser>;

    /// Output mode negotiated when the source was opened.
    fn output_resolution(&self) -> Resolution;

    fn set_mirror(&mut self, mirrored: bool);

    fn is_mirrored(&self) -> bool;
}

pub fn open_source(config: &ViewerConfig) -> Result<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match config.source {
        SourceKind::Synthetic => Box::new(SyntheticSource::new(
            config.output,
            config.user_count(),
            config.fps,
        )?),
        #[cfg(feature = "camera-nokhwa")]
        SourceKind::Webcam { index } => Box::new(WebcamSource::open(index)?),
    };

    log::info!(
        "opened {} source at {}",
        source.name(),
        source.output_resolution()
    );
    Ok(source)
}
