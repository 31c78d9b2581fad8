//! Entity placement and the cached local-to-world transform
//!
//! Rotation is kept in degrees (0 points up the screen, positive turns
//! clockwise in screen space). The cached affine maps an entity's local point
//! list into world space and is refreshed once per frame after movement.

use glam::{Affine2, Vec2};
use serde::{Deserialize, Serialize};

use crate::{wrap_coord, wrap_degrees};

/// Position, velocity, rotation and scale of one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    pub pos: Vec2,
    /// Linear velocity (pixels/second)
    pub vel: Vec2,
    /// Angular velocity (degrees/second)
    pub spin: f32,
    /// Current rotation (degrees, [0, 360))
    pub rot: f32,
    pub scale: f32,
    #[serde(skip, default = "identity")]
    matrix: Affine2,
}

fn identity() -> Affine2 {
    Affine2::IDENTITY
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(Vec2::ZERO)
    }
}

impl Transform {
    pub fn at(pos: Vec2) -> Self {
        let mut transform = Self {
            pos,
            vel: Vec2::ZERO,
            spin: 0.0,
            rot: 0.0,
            scale: 1.0,
            matrix: Affine2::IDENTITY,
        };
        transform.configure();
        transform
    }

    /// Euler step of position and rotation
    pub fn integrate(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.rot = wrap_degrees(self.rot + self.spin * dt);
    }

    /// Wrap position onto the torus
    pub fn wrap(&mut self, width: f32, height: f32) {
        self.pos.x = wrap_coord(self.pos.x, width);
        self.pos.y = wrap_coord(self.pos.y, height);
    }

    /// Rebuild the cached affine from the current fields
    pub fn configure(&mut self) {
        self.matrix = Affine2::from_scale_angle_translation(
            Vec2::splat(self.scale.max(0.0)),
            self.rot.to_radians(),
            self.pos,
        );
    }

    /// Project a local point into world space through the cached affine
    #[inline]
    pub fn project(&self, local: Vec2) -> Vec2 {
        self.matrix.transform_point2(local)
    }
}
