use anyhow::anyhow;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::{FrameSource, JointProvider, ProjectiveTransform, rgb_converter};
use crate::{
    error::{Result, SourceError, ViewerError},
    types::{
        ColorFrame, DepthFrame, Joint, JointName, Point2, Point3, Resolution, TrackedUser, UserId,
    },
};

// Prefer pixel formats that are widely supported on macOS (the built-in cameras
// often reject YUYV even though Nokhwa reports it).
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct WebcamDevice {
    pub index: CameraIndex,
    pub label: String,
}

pub fn available_webcams() -> anyhow::Result<Vec<WebcamDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info| WebcamDevice {
            index: info.index().clone(),
            label: device_label(&info),
        })
        .collect())
}

fn device_label(info: &CameraInfo) -> String {
    format!("{} ({})", info.human_name(), info.description())
}

fn build_camera(index: CameraIndex) -> anyhow::Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Color-only frame source backed by a webcam. Depth stays blank and no
/// users are ever reported.
pub struct WebcamSource {
    camera: Camera,
    name: String,
    resolution: Resolution,
    transform: ProjectiveTransform,
    mirrored: bool,
    depth: DepthFrame,
    color: ColorFrame,
}

impl WebcamSource {
    pub fn open(index: u32) -> Result<Self> {
        let camera = build_camera(CameraIndex::Index(index))
            .map_err(|err| SourceError::Device(format!("webcam {index}: {err:#}")))?;

        let negotiated = camera.resolution();
        let resolution = Resolution::new(negotiated.width_x, negotiated.height_y);
        if resolution.is_empty() {
            return Err(ViewerError::Configuration(format!(
                "webcam {index} negotiated an empty output mode"
            )));
        }

        let name = camera.info().human_name();
        log::info!(
            "webcam {index} ({name}) streaming {resolution} as {:?}",
            camera.frame_format()
        );

        Ok(Self {
            camera,
            name,
            resolution,
            transform: ProjectiveTransform::kinect(resolution),
            mirrored: false,
            depth: DepthFrame::blank(resolution),
            color: ColorFrame::blank(resolution),
        })
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(err) = self.camera.stop_stream() {
            log::warn!("failed to stop webcam stream: {err:?}");
        }
    }
}

impl JointProvider for WebcamSource {
    fn joint(&self, _user: UserId, _name: JointName) -> Option<Joint> {
        None
    }

    fn project_to_screen(&self, points: &[Point3]) -> Vec<Point2> {
        self.transform.project_all(points)
    }
}

/// Some backends hand back an empty buffer when no new frame was captured.
fn require_payload(data: &[u8]) -> Result<(), SourceError> {
    if data.is_empty() {
        return Err(SourceError::NoUpdate);
    }
    Ok(())
}

impl FrameSource for WebcamSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn wait_for_next_frame(&mut self) -> Result<(), SourceError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|err| SourceError::Device(format!("frame read failed: {err:?}")))?;
        require_payload(buffer.buffer())?;
        let image = rgb_converter::convert_camera_frame(&buffer)
            .map_err(|err| SourceError::Device(format!("frame decode failed: {err:#}")))?;

        if Resolution::new(image.width, image.height) != self.resolution {
            return Err(SourceError::Device(format!(
                "webcam switched to {}x{} mid-stream, expected {}",
                image.width, image.height, self.resolution
            )));
        }

        let mut color = ColorFrame::new(self.resolution, image.pixels)
            .map_err(|err| SourceError::Device(err.to_string()))?;
        if self.mirrored {
            let width = self.resolution.width as usize;
            for row in color.pixels_mut().chunks_exact_mut(width) {
                row.reverse();
            }
        }
        self.color = color;
        Ok(())
    }

    fn depth_frame(&self) -> &DepthFrame {
        &self.depth
    }

    fn color_frame(&self) -> &ColorFrame {
        &self.color
    }

    fn tracked_users(&self) -> Vec<TrackedUser> {
        Vec::new()
    }

    fn output_resolution(&self) -> Resolution {
        self.resolution
    }

    fn set_mirror(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    fn is_mirrored(&self) -> bool {
        self.mirrored
    }
}
