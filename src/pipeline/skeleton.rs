use crate::{
    source::JointProvider,
    types::{JointName, Rgb, ScreenPrimitive, TrackedUser},
};

/// Limb table, drawn in this order for every tracked user.
pub const LIMBS: &[(JointName, JointName)] = &[
    (JointName::Head, JointName::Neck),
    (JointName::Neck, JointName::LeftShoulder),
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftHand),
    (JointName::Neck, JointName::RightShoulder),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightHand),
    (JointName::LeftShoulder, JointName::Torso),
    (JointName::RightShoulder, JointName::Torso),
    (JointName::Torso, JointName::LeftHip),
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftFoot),
    (JointName::Torso, JointName::RightHip),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightFoot),
    (JointName::LeftHip, JointName::RightHip),
];

pub const CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const LIMB_LINE_WIDTH: f32 = 2.0;
pub const JOINT_MARKER_RADIUS: f32 = 8.0;

pub const PALETTE: [Rgb; 11] = [
    [255, 255, 255],
    [0, 0, 255],
    [0, 255, 0],
    [255, 255, 0],
    [255, 0, 0],
    [255, 128, 0],
    [128, 255, 0],
    [0, 128, 255],
    [128, 0, 255],
    [255, 255, 128],
    [0, 255, 255],
];

/// Slots past the end of the palette reuse its last entry.
pub fn slot_color(slot: usize) -> Rgb {
    PALETTE[slot.min(PALETTE.len() - 1)]
}

pub fn build_overlay<P>(users: &[TrackedUser], joints: &P) -> Vec<ScreenPrimitive>
where
    P: JointProvider + ?Sized,
{
    let mut primitives = Vec::new();

    for user in users.iter().filter(|user| user.is_tracked()) {
        let color = slot_color(user.slot);
        for &(a, b) in LIMBS {
            if let Some(limb) = limb_primitives(user, a, b, color, joints) {
                primitives.extend_from_slice(&limb);
            }
        }
    }

    primitives
}

fn limb_primitives<P>(
    user: &TrackedUser,
    a: JointName,
    b: JointName,
    color: Rgb,
    joints: &P,
) -> Option<[ScreenPrimitive; 3]>
where
    P: JointProvider + ?Sized,
{
    let ja = joints.joint(user.id, a)?;
    let jb = joints.joint(user.id, b)?;
    if ja.confidence < CONFIDENCE_THRESHOLD || jb.confidence < CONFIDENCE_THRESHOLD {
        return None;
    }

    let projected = joints.project_to_screen(&[ja.position, jb.position]);
    let (&pa, &pb) = (projected.first()?, projected.get(1)?);

    Some([
        ScreenPrimitive::Line {
            from: pa,
            to: pb,
            width: LIMB_LINE_WIDTH,
            color,
        },
        ScreenPrimitive::Point {
            at: pa,
            radius: JOINT_MARKER_RADIUS,
            color,
        },
        ScreenPrimitive::Point {
            at: pb,
            radius: JOINT_MARKER_RADIUS,
            color,
        },
    ])
}
