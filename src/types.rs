use std::{fmt, time::Instant};

use crate::error::{Result, ViewerError};

/// Depth samples are expected in `[0, MAX_DEPTH)` millimetres.
pub const MAX_DEPTH: usize = 10_000;

/// Upper bound on users queried from a frame source per tick.
pub const MAX_NUM_USERS: usize = 3;

pub type Rgb = [u8; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Real-world position in millimetres (X right, Y up, Z away from the sensor).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Projective (screen) position in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug)]
pub struct DepthFrame {
    width: u32,
    height: u32,
    samples: Vec<u16>,
}

impl DepthFrame {
    pub fn new(width: u32, height: u32, samples: Vec<u16>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(ViewerError::MalformedFrame(format!(
                "depth buffer holds {} samples, expected {expected} for {width}x{height}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// A frame where every pixel is "no reading".
    pub fn blank(resolution: Resolution) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            samples: vec![0; resolution.pixel_count()],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [u16] {
        &mut self.samples
    }
}

/// RGB image whose valid region is a sub-rectangle of the full sensor frame.
#[derive(Clone, Debug)]
pub struct ColorFrame {
    full: Resolution,
    x_offset: u32,
    y_offset: u32,
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl ColorFrame {
    pub fn new(full: Resolution, pixels: Vec<Rgb>) -> Result<Self> {
        Self::cropped(full, 0, 0, full.width, full.height, pixels)
    }

    pub fn cropped(
        full: Resolution,
        x_offset: u32,
        y_offset: u32,
        width: u32,
        height: u32,
        pixels: Vec<Rgb>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ViewerError::MalformedFrame(format!(
                "color buffer holds {} pixels, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        if x_offset.saturating_add(width) > full.width
            || y_offset.saturating_add(height) > full.height
        {
            return Err(ViewerError::MalformedFrame(format!(
                "color region {width}x{height}+{x_offset}+{y_offset} exceeds full frame {full}"
            )));
        }
        Ok(Self {
            full,
            x_offset,
            y_offset,
            width,
            height,
            pixels,
        })
    }

    pub fn blank(full: Resolution) -> Self {
        Self {
            full,
            x_offset: 0,
            y_offset: 0,
            width: full.width,
            height: full.height,
            pixels: vec![[0, 0, 0]; full.pixel_count()],
        }
    }

    pub fn full_resolution(&self) -> Resolution {
        self.full
    }

    pub fn x_offset(&self) -> u32 {
        self.x_offset
    }

    pub fn y_offset(&self) -> u32 {
        self.y_offset
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    pub fn row(&self, y: u32) -> &[Rgb] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }
}

/// Histogram-equalized depth, one 8-bit intensity per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<u8>,
    /// Pixels that carried a depth reading.
    pub valid_pixels: u32,
}

/// Fixed-size RGB canvas handed to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgb>,
}

impl Texture {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            pixels: vec![[0, 0, 0]; resolution.pixel_count()],
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill([0, 0, 0]);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointName {
    Head,
    Neck,
    Torso,
    LeftShoulder,
    LeftElbow,
    LeftHand,
    RightShoulder,
    RightElbow,
    RightHand,
    LeftHip,
    LeftKnee,
    LeftFoot,
    RightHip,
    RightKnee,
    RightFoot,
}

impl JointName {
    pub const COUNT: usize = 15;

    pub const ALL: [JointName; Self::COUNT] = [
        JointName::Head,
        JointName::Neck,
        JointName::Torso,
        JointName::LeftShoulder,
        JointName::LeftElbow,
        JointName::LeftHand,
        JointName::RightShoulder,
        JointName::RightElbow,
        JointName::RightHand,
        JointName::LeftHip,
        JointName::LeftKnee,
        JointName::LeftFoot,
        JointName::RightHip,
        JointName::RightKnee,
        JointName::RightFoot,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    pub position: Point3,
    /// Tracker certainty in `[0, 1]`.
    pub confidence: f32,
}

impl Joint {
    pub const fn new(position: Point3, confidence: f32) -> Self {
        Self {
            position,
            confidence,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracking lifecycle of a detected person.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserState {
    #[default]
    Detected,
    Calibrating,
    Tracked,
    Lost,
}

impl UserState {
    pub fn label(&self) -> &'static str {
        match self {
            UserState::Detected => "detected",
            UserState::Calibrating => "calibrating",
            UserState::Tracked => "tracked",
            UserState::Lost => "lost",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedUser {
    pub id: UserId,
    /// Display slot, only used to pick an overlay color.
    pub slot: usize,
    pub state: UserState,
}

impl TrackedUser {
    pub fn is_tracked(&self) -> bool {
        self.state == UserState::Tracked
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScreenPrimitive {
    Line {
        from: Point2,
        to: Point2,
        width: f32,
        color: Rgb,
    },
    Point {
        at: Point2,
        radius: f32,
        color: Rgb,
    },
}

/// RGBA frame ready for display.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}
