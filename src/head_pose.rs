use crate::error::LinkError;
use crate::types::{Landmarks, Point3D, PoseAngles};

pub const NOSE_INDEX: usize = 1;
pub const LEFT_EYE_INDEX: usize = 33;
pub const RIGHT_EYE_INDEX: usize = 263;

pub(crate) fn landmark(landmarks: &Landmarks, index: usize) -> Result<Point3D, LinkError> {
    landmarks
        .get(index)
        .copied()
        .ok_or(LinkError::MissingLandmark {
            index,
            len: landmarks.len(),
        })
}

/// Derive yaw and pitch from the eye corners and the nose tip.
///
/// Yaw is `atan2(dx, dy)` over the eye-to-eye vector. The argument order is
/// swapped relative to the usual `atan2(dy, dx)`; receivers are calibrated
/// against it, so level eyes give roughly +/- PI/2.
/// Pitch is the nose height remapped around the frame centre, +1 at the top
/// edge and -1 at the bottom. It is a proxy, not an angle in radians.
pub fn derive_pose(landmarks: &Landmarks) -> Result<PoseAngles, LinkError> {
    let nose = landmark(landmarks, NOSE_INDEX)?;
    let left_eye = landmark(landmarks, LEFT_EYE_INDEX)?;
    let right_eye = landmark(landmarks, RIGHT_EYE_INDEX)?;

    Ok(compute_pose(&nose, &left_eye, &right_eye))
}

// Pure function for regression testing
pub fn compute_pose(nose: &Point3D, left_eye: &Point3D, right_eye: &Point3D) -> PoseAngles {
    let dx = right_eye.x - left_eye.x;
    let dy = right_eye.y - left_eye.y;

    PoseAngles {
        yaw: dx.atan2(dy),
        pitch: -(nose.y - 0.5) * 2.0,
    }
}
