//! Wire format for one face sample.
//!
//! A datagram is a flat run of 4-byte IEEE-754 floats in host byte order,
//! with no header and no length field:
//!
//! ```text
//! x,y,z of SELECTED_INDICES[0] .. x,y,z of SELECTED_INDICES[8] | yaw | pitch
//! ```
//!
//! Receivers know the count and order out of band.

use crate::error::LinkError;
use crate::head_pose::landmark;
use crate::types::{Landmarks, Point3D, PoseAngles};

/// Nose tip, nose bridge, eye corners, brows, inner lips, chin
pub const SELECTED_INDICES: [usize; 9] = [1, 2, 33, 263, 70, 300, 13, 14, 152];

pub const PAYLOAD_FLOATS: usize = SELECTED_INDICES.len() * 3 + 2;
pub const PAYLOAD_BYTES: usize = PAYLOAD_FLOATS * std::mem::size_of::<f32>();

/// Gather the selected landmarks followed by yaw and pitch.
pub fn encode_floats(
    landmarks: &Landmarks,
    pose: PoseAngles,
) -> Result<[f32; PAYLOAD_FLOATS], LinkError> {
    let mut floats = [0.0f32; PAYLOAD_FLOATS];
    for (slot, &index) in SELECTED_INDICES.iter().enumerate() {
        let pt = landmark(landmarks, index)?;
        floats[slot * 3] = pt.x;
        floats[slot * 3 + 1] = pt.y;
        floats[slot * 3 + 2] = pt.z;
    }
    floats[PAYLOAD_FLOATS - 2] = pose.yaw;
    floats[PAYLOAD_FLOATS - 1] = pose.pitch;
    Ok(floats)
}

/// Pack floats back to back in native byte order.
pub fn to_bytes(floats: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(floats.len() * 4);
    for value in floats {
        buf.extend_from_slice(&value.to_ne_bytes());
    }
    buf
}

/// Encode one face straight to a datagram body.
pub fn encode(landmarks: &Landmarks, pose: PoseAngles) -> Result<Vec<u8>, LinkError> {
    Ok(to_bytes(&encode_floats(landmarks, pose)?))
}

/// Landmarks and angles recovered from a datagram
#[derive(Debug, Clone, PartialEq)]
pub struct FaceSample {
    pub points: Vec<Point3D>,
    pub pose: PoseAngles,
}

/// Read a datagram the way the consumer does: whole floats only, grouped in
/// threes, with yaw and pitch straight after the last whole triple. Anything
/// left over after pitch is ignored.
pub fn decode(bytes: &[u8]) -> Result<FaceSample, LinkError> {
    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    if floats.len() < 2 {
        return Err(LinkError::TooShort(floats.len()));
    }

    let count = (floats.len() - 2) / 3;
    let points = floats[..count * 3]
        .chunks_exact(3)
        .map(|c| Point3D::new(c[0], c[1], c[2]))
        .collect();

    Ok(FaceSample {
        points,
        pose: PoseAngles {
            yaw: floats[count * 3],
            pitch: floats[count * 3 + 1],
        },
    })
}
