//! Small geometry value types shared by the decoders.

/// A 3-component float vector, the format's native position/normal type.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Whether all components are finite and within `limit` in magnitude.
    ///
    /// Header bytes misread as positions produce garbage like 1e30; the
    /// decoders filter on this before accepting a vertex.
    pub fn is_plausible(&self, limit: f32) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|v| v.is_finite() && v.abs() < limit)
    }
}

/// An integer Euler rotation in the engine's 65536-per-revolution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rotator {
    pub pitch: i32,
    pub yaw: i32,
    pub roll: i32,
}
