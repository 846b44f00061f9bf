use std::{
    thread,
    time::{Duration, Instant},
};

use super::{FrameSource, JointProvider, ProjectiveTransform};
use crate::{
    error::{Result, SourceError, ViewerError},
    pipeline::skeleton::LIMBS,
    types::{
        ColorFrame, DepthFrame, Joint, JointName, MAX_NUM_USERS, Point2, Point3, Resolution, Rgb,
        TrackedUser, UserId, UserState,
    },
};

// Lifecycle timings, in frames.
const DETECTION_FRAMES: u32 = 15;
const CALIBRATION_FRAMES: u32 = 45;
const TRACKED_FRAMES: u32 = 900;
const TRACKED_FRAMES_PER_SLOT: u32 = 150;
const LOST_FRAMES: u32 = 30;
const RESPAWN_FRAMES: u32 = 60;
const SPAWN_STAGGER: u32 = 20;

// Scene geometry, in millimetres relative to the sensor.
const WALL_DEPTH: f32 = 4_000.0;
const FLOOR_DROP: f32 = 900.0;
const TORSO_HEIGHT: f32 = 100.0;
const LIMB_RADIUS: f32 = 70.0;
const HEAD_RADIUS: f32 = 110.0;

// Columns on the left edge where the IR projector casts no pattern.
const SHADOW_BAND: u32 = 8;

const PHASE_STEP: f32 = 0.08;

/// Deterministic in-process stand-in for a depth sensor with user tracking.
///
/// Renders a wall and floor, walks up to [`MAX_NUM_USERS`] articulated people
/// through `Detected -> Calibrating -> Tracked -> Lost` and respawns them.
pub struct SyntheticSource {
    resolution: Resolution,
    transform: ProjectiveTransform,
    frame_interval: Option<Duration>,
    last_frame: Option<Instant>,
    frame_number: u64,
    frame_limit: Option<u64>,
    mirrored: bool,
    slots: Vec<Slot>,
    next_user_id: u32,
    background_depth: Vec<u16>,
    backdrop: Vec<Rgb>,
    depth: DepthFrame,
    color: ColorFrame,
}

struct Slot {
    actor: Option<Actor>,
    respawn_in: u32,
}

struct Actor {
    id: UserId,
    slot: usize,
    state: UserState,
    frames_in_state: u32,
    lane_x: f32,
    distance: f32,
    phase: f32,
    skeleton: [Joint; JointName::COUNT],
}

impl SyntheticSource {
    pub fn new(resolution: Resolution, users: usize, fps: u32) -> Result<Self> {
        if resolution.is_empty() {
            return Err(ViewerError::Configuration(format!(
                "synthetic output mode {resolution} has no pixels"
            )));
        }
        if users > MAX_NUM_USERS {
            return Err(ViewerError::Configuration(format!(
                "synthetic population of {users} exceeds {MAX_NUM_USERS} users"
            )));
        }

        let transform = ProjectiveTransform::kinect(resolution);
        let (background_depth, backdrop) = build_background(&transform);
        let slots = (0..users)
            .map(|slot| Slot {
                actor: None,
                respawn_in: slot as u32 * SPAWN_STAGGER,
            })
            .collect();

        Ok(Self {
            resolution,
            transform,
            frame_interval: (fps > 0).then(|| Duration::from_secs(1) / fps),
            last_frame: None,
            frame_number: 0,
            frame_limit: None,
            mirrored: false,
            slots,
            next_user_id: 1,
            background_depth,
            backdrop,
            depth: DepthFrame::blank(resolution),
            color: ColorFrame::blank(resolution),
        })
    }

    /// Reports `SourceError::Disconnected` once `limit` frames were produced.
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.frame_interval, self.last_frame) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());
    }

    fn advance(&mut self) {
        for (slot_idx, slot) in self.slots.iter_mut().enumerate() {
            let expired = match &mut slot.actor {
                None => {
                    if slot.respawn_in == 0 {
                        let id = UserId(self.next_user_id);
                        self.next_user_id += 1;
                        log::debug!("frame {}: new user {id}", self.frame_number);
                        slot.actor = Some(Actor::new(id, slot_idx));
                    } else {
                        slot.respawn_in -= 1;
                    }
                    false
                }
                Some(actor) => {
                    actor.step(self.frame_number);
                    actor.state == UserState::Lost && actor.frames_in_state >= LOST_FRAMES
                }
            };

            if expired {
                slot.actor = None;
                slot.respawn_in = RESPAWN_FRAMES;
            }
        }
    }

    fn render(&mut self) {
        self.depth
            .samples_mut()
            .copy_from_slice(&self.background_depth);
        self.color.pixels_mut().copy_from_slice(&self.backdrop);

        let mut scene = SceneCanvas {
            width: self.resolution.width,
            height: self.resolution.height,
            depth: self.depth.samples_mut(),
            color: self.color.pixels_mut(),
        };

        for actor in self.slots.iter().filter_map(|slot| slot.actor.as_ref()) {
            if actor.state == UserState::Lost {
                continue;
            }
            let tint = body_tint(actor.slot, actor.distance);
            for &(a, b) in LIMBS {
                let ja = actor.skeleton[a.index()].position;
                let jb = actor.skeleton[b.index()].position;
                let z = (ja.z + jb.z) / 2.0;
                scene.stamp_capsule(
                    self.transform.to_projective(ja),
                    self.transform.to_projective(jb),
                    LIMB_RADIUS * self.transform.scale_at(z),
                    z as u16,
                    tint,
                );
            }
            let head = actor.skeleton[JointName::Head.index()].position;
            let center = self.transform.to_projective(head);
            scene.stamp_capsule(
                center,
                center,
                HEAD_RADIUS * self.transform.scale_at(head.z),
                head.z as u16,
                tint,
            );
        }

        if self.mirrored {
            let width = self.resolution.width as usize;
            for row in self.depth.samples_mut().chunks_exact_mut(width) {
                row.reverse();
            }
            for row in self.color.pixels_mut().chunks_exact_mut(width) {
                row.reverse();
            }
        }
    }

    fn find_actor(&self, user: UserId) -> Option<&Actor> {
        self.slots
            .iter()
            .filter_map(|slot| slot.actor.as_ref())
            .find(|actor| actor.id == user)
    }
}

impl JointProvider for SyntheticSource {
    fn joint(&self, user: UserId, name: JointName) -> Option<Joint> {
        let actor = self.find_actor(user)?;
        let mut joint = actor.skeleton[name.index()];
        if self.mirrored {
            joint.position.x = -joint.position.x;
        }
        Some(joint)
    }

    fn project_to_screen(&self, points: &[Point3]) -> Vec<Point2> {
        self.transform.project_all(points)
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn wait_for_next_frame(&mut self) -> Result<(), SourceError> {
        if self.frame_limit.is_some_and(|limit| self.frame_number >= limit) {
            return Err(SourceError::Disconnected);
        }

        self.pace();
        self.frame_number += 1;
        self.advance();
        self.render();
        Ok(())
    }

    fn depth_frame(&self) -> &DepthFrame {
        &self.depth
    }

    fn color_frame(&self) -> &ColorFrame {
        &self.color
    }

    fn tracked_users(&self) -> Vec<TrackedUser> {
        self.slots
            .iter()
            .filter_map(|slot| slot.actor.as_ref())
            .map(|actor| TrackedUser {
                id: actor.id,
                slot: actor.slot,
                state: actor.state,
            })
            .take(MAX_NUM_USERS)
            .collect()
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

impl Actor {
    fn new(id: UserId, slot: usize) -> Self {
        let lane_x = match slot {
            0 => 0.0,
            1 => -900.0,
            _ => 900.0,
        };
        let mut actor = Self {
            id,
            slot,
            state: UserState::Detected,
            frames_in_state: 0,
            lane_x,
            distance: 2_500.0 + slot as f32 * 300.0,
            phase: slot as f32 * 1.3,
            skeleton: [Joint::new(Point3::default(), 0.0); JointName::COUNT],
        };
        actor.pose();
        actor
    }

    fn step(&mut self, frame_number: u64) {
        self.frames_in_state += 1;
        self.phase += PHASE_STEP;

        let next = match self.state {
            UserState::Detected if self.frames_in_state >= DETECTION_FRAMES => {
                log::debug!("frame {frame_number}: calibration started for user {}", self.id);
                Some(UserState::Calibrating)
            }
            UserState::Calibrating if self.frames_in_state >= CALIBRATION_FRAMES => {
                log::debug!(
                    "frame {frame_number}: calibration complete, start tracking user {}",
                    self.id
                );
                Some(UserState::Tracked)
            }
            UserState::Tracked
                if self.frames_in_state
                    >= TRACKED_FRAMES + self.slot as u32 * TRACKED_FRAMES_PER_SLOT =>
            {
                log::debug!("frame {frame_number}: lost user {}", self.id);
                Some(UserState::Lost)
            }
            _ => None,
        };

        if let Some(state) = next {
            self.state = state;
            self.frames_in_state = 0;
        }

        self.pose();
    }

    fn pose(&mut self) {
        let phase = self.phase;
        let torso = Point3::new(
            self.lane_x + 250.0 * (phase * 0.25).sin(),
            TORSO_HEIGHT,
            self.distance + 150.0 * (phase * 0.1).sin(),
        );
        let at = |dx: f32, dy: f32, dz: f32| Point3::new(torso.x + dx, torso.y + dy, torso.z + dz);
        let reach = |from: Point3, length: f32, angle: f32, side: f32| {
            Point3::new(
                from.x + side * length * angle.sin(),
                from.y - length * angle.cos(),
                from.z,
            )
        };

        let neck = at(0.0, 250.0, 0.0);
        let head = at(0.0, 420.0, -20.0);
        let left_shoulder = at(-170.0, 230.0, 0.0);
        let right_shoulder = at(170.0, 230.0, 0.0);

        let left_arm = 0.35 + 0.25 * phase.sin();
        let right_arm = 1.2 + 0.9 * (phase * 1.7).sin();
        let left_elbow = reach(left_shoulder, 280.0, left_arm, -1.0);
        let left_hand = reach(left_elbow, 260.0, left_arm + 0.3, -1.0);
        let right_elbow = reach(right_shoulder, 280.0, right_arm, 1.0);
        let right_hand = reach(right_elbow, 260.0, right_arm + 0.5, 1.0);

        let left_hip = at(-100.0, -200.0, 0.0);
        let right_hip = at(100.0, -200.0, 0.0);
        let stride = 0.25 * phase.sin();
        let left_knee = reach(left_hip, 420.0, stride, 1.0);
        let left_foot = reach(left_knee, 430.0, stride * 0.5, 1.0);
        let right_knee = reach(right_hip, 420.0, -stride, 1.0);
        let right_foot = reach(right_knee, 430.0, -stride * 0.5, 1.0);

        let tracked = self.state == UserState::Tracked;
        let confidence = if tracked { 1.0 } else { 0.0 };
        // The raised hand drops out now and then, like a hand passing behind the head.
        let hand_confidence = if tracked && (phase * 0.5).sin() <= 0.9 {
            1.0
        } else {
            0.0
        };

        let mut set = |name: JointName, position: Point3, confidence: f32| {
            self.skeleton[name.index()] = Joint::new(position, confidence);
        };
        set(JointName::Head, head, confidence);
        set(JointName::Neck, neck, confidence);
        set(JointName::Torso, torso, confidence);
        set(JointName::LeftShoulder, left_shoulder, confidence);
        set(JointName::LeftElbow, left_elbow, confidence);
        set(JointName::LeftHand, left_hand, confidence);
        set(JointName::RightShoulder, right_shoulder, confidence);
        set(JointName::RightElbow, right_elbow, confidence);
        set(JointName::RightHand, right_hand, hand_confidence);
        set(JointName::LeftHip, left_hip, confidence);
        set(JointName::LeftKnee, left_knee, confidence);
        set(JointName::LeftFoot, left_foot, confidence);
        set(JointName::RightHip, right_hip, confidence);
        set(JointName::RightKnee, right_knee, confidence);
        set(JointName::RightFoot, right_foot, confidence);
    }
}

struct SceneCanvas<'a> {
    width: u32,
    height: u32,
    depth: &'a mut [u16],
    color: &'a mut [Rgb],
}

impl SceneCanvas<'_> {
    /// Fills every pixel within `radius` of segment `a..b` that is nearer
    /// than what is already there.
    fn stamp_capsule(&mut self, a: Point2, b: Point2, radius: f32, depth: u16, color: Rgb) {
        let max_x = self.width as f32 - 1.0;
        let max_y = self.height as f32 - 1.0;
        let left = (a.x.min(b.x) - radius).floor().max(0.0);
        let right = (a.x.max(b.x) + radius).ceil().min(max_x);
        let top = (a.y.min(b.y) - radius).floor().max(0.0);
        let bottom = (a.y.max(b.y) + radius).ceil().min(max_y);
        if !(left <= right && top <= bottom) {
            return;
        }

        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let length_sq = dx * dx + dy * dy;
        let radius_sq = radius * radius;

        for y in top as u32..=bottom as u32 {
            for x in left as u32..=right as u32 {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let t = if length_sq > 0.0 {
                    (((px - a.x) * dx + (py - a.y) * dy) / length_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (ox, oy) = (a.x + t * dx - px, a.y + t * dy - py);
                if ox * ox + oy * oy > radius_sq {
                    continue;
                }

                let idx = y as usize * self.width as usize + x as usize;
                let current = self.depth[idx];
                if current == 0 || depth < current {
                    self.depth[idx] = depth;
                    self.color[idx] = color;
                }
            }
        }
    }
}

fn body_tint(slot: usize, distance: f32) -> Rgb {
    const TINTS: [Rgb; MAX_NUM_USERS] = [[214, 170, 140], [120, 150, 210], [150, 200, 130]];
    let shade = (1.0 - (distance - 1_500.0) / 4_000.0).clamp(0.4, 1.0);
    let base = TINTS[slot.min(MAX_NUM_USERS - 1)];
    base.map(|c| (c as f32 * shade) as u8)
}

/// Static wall and floor: depth per pixel plus a matching color backdrop.
fn build_background(transform: &ProjectiveTransform) -> (Vec<u16>, Vec<Rgb>) {
    let resolution = transform.resolution();
    let mut depth = Vec::with_capacity(resolution.pixel_count());
    let mut color = Vec::with_capacity(resolution.pixel_count());

    for y in 0..resolution.height {
        // Height of the pixel ray per millimetre of depth; negative below the horizon.
        let ray = transform.to_real_world(Point2::new(0.0, y as f32 + 0.5), 1.0).y;
        let floor_depth = if ray < 0.0 {
            -FLOOR_DROP / ray
        } else {
            f32::INFINITY
        };

        for x in 0..resolution.width {
            if x < SHADOW_BAND {
                depth.push(0);
                color.push([24, 24, 28]);
                continue;
            }

            if floor_depth < WALL_DEPTH {
                depth.push(floor_depth as u16);
                let checker = ((x / 32) + (y / 16)) % 2 == 0;
                let shade = (floor_depth / WALL_DEPTH * 60.0) as u8;
                color.push(if checker {
                    [110 - shade, 100 - shade, 90 - shade]
                } else {
                    [90 - shade, 82 - shade, 74 - shade]
                });
            } else {
                depth.push(WALL_DEPTH as u16);
                let gy = (y * 60 / resolution.height) as u8;
                let gx = (x * 40 / resolution.width) as u8;
                color.push([60 + gy, 80 + gx, 120 + gy / 2]);
            }
        }
    }

    (depth, color)
}
