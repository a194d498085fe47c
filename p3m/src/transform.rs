//! Conversions between the host's coordinate conventions and the file's.
//!
//! The file frame is the host frame with Y and Z exchanged ([`AxisSwap`]) and X
//! mirrored ([`SignFlip`]). Both maps are involutions and commute, so the same
//! composition takes host values into the file ([`to_file_frame`]) and file values
//! back into the host ([`SceneCorrection`]).

use glam::{Mat3, Vec2, Vec3};

/// Exchanges the Y and Z axes. Host `(x, y, z)` is file `(x, z, y)` and vice versa.
#[derive(Debug, Clone, Copy)]
pub struct AxisSwap;

impl AxisSwap {
    #[must_use]
    pub fn apply(v: Vec3) -> Vec3 {
        Vec3::new(v.x, v.z, v.y)
    }
}

/// Negates the X component.
/// An exact zero of either sign becomes `+0.0`, so no `-0.0` is ever written.
#[derive(Debug, Clone, Copy)]
pub struct SignFlip;

impl SignFlip {
    #[must_use]
    pub fn apply(v: Vec3) -> Vec3 {
        Vec3::new(Self::negate(v.x), v.y, v.z)
    }

    #[must_use]
    pub fn negate(x: f32) -> f32 {
        if x == 0.0 {
            0.0
        } else {
            -x
        }
    }
}

/// Converts between top-left and bottom-left texture origins: `v' = 1 - v`.
#[derive(Debug, Clone, Copy)]
pub struct UvFlip;

impl UvFlip {
    #[must_use]
    pub fn apply(uv: Vec2) -> Vec2 {
        Vec2::new(uv.x, 1.0 - uv.y)
    }
}

/// The reflection applied once to a decoded skeleton and mesh:
/// `x ↦ -x`, `y ↦ z`, `z ↦ y`.
#[derive(Debug, Clone, Copy)]
pub struct SceneCorrection;

impl SceneCorrection {
    /// The correction as a matrix, for hosts that transform their own objects.
    /// Rows and columns coincide since the map is symmetric.
    #[must_use]
    pub fn matrix() -> Mat3 {
        Mat3::from_cols(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[must_use]
    pub fn apply(v: Vec3) -> Vec3 {
        SignFlip::apply(AxisSwap::apply(v))
    }
}

/// Maps an absolute host position, or a host direction, into the file frame.
#[must_use]
pub fn to_file_frame(v: Vec3) -> Vec3 {
    SignFlip::apply(AxisSwap::apply(v))
}

/// Offset of `point` from `origin` in the file frame, both given in the host frame.
/// The difference is taken before the X flip, as the legacy exporter does.
#[must_use]
pub fn relative_in_file_frame(point: Vec3, origin: Vec3) -> Vec3 {
    SignFlip::apply(AxisSwap::apply(point) - AxisSwap::apply(origin))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn axis_swap_exchanges_y_and_z() {
        assert_eq!(
            AxisSwap::apply(Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(1.0, 3.0, 2.0)
        );
    }

    #[test]
    fn sign_flip_never_writes_negative_zero() {
        assert!(SignFlip::negate(0.0).is_sign_positive());
        assert!(SignFlip::negate(-0.0).is_sign_positive());
        assert_eq!(SignFlip::negate(2.5), -2.5);

        let flipped = SignFlip::apply(Vec3::new(0.0, -1.0, 4.0));
        assert!(flipped.x.is_sign_positive());

        let relative = relative_in_file_frame(Vec3::new(3.0, 1.0, 2.0), Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(relative.x.to_bits(), 0.0_f32.to_bits());
    }

    #[test]
    fn uv_flip_is_an_involution() {
        for uv in [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.25, 0.75),
            Vec2::new(0.5, 1.0),
            Vec2::new(0.125, 0.375),
            Vec2::new(1.0, 0.5),
        ] {
            assert_eq!(UvFlip::apply(UvFlip::apply(uv)), uv);
        }

        // off the 2^-24 grid the round trip is only within an ulp of 1.0
        let uv = Vec2::new(0.3, 0.1);
        assert_relative_eq!(UvFlip::apply(UvFlip::apply(uv)), uv, epsilon = 1e-7);
    }

    #[test]
    fn scene_correction_inverts_file_frame() {
        let v = Vec3::new(1.5, -2.0, 0.25);

        assert_eq!(SceneCorrection::apply(to_file_frame(v)), v);
        assert_eq!(to_file_frame(v), Vec3::new(-1.5, 0.25, -2.0));
    }

    #[test]
    fn matrix_agrees_with_apply() {
        let v = Vec3::new(3.0, -4.0, 5.0);

        assert_eq!(SceneCorrection::matrix() * v, SceneCorrection::apply(v));
        assert_relative_eq!(SceneCorrection::matrix() * SceneCorrection::matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn relative_offsets_sum_back() {
        let parent = Vec3::new(1.0, 2.0, 3.0);
        let child = Vec3::new(1.5, 2.0, 4.0);

        let offset = relative_in_file_frame(child, parent);
        assert_eq!(offset, Vec3::new(-0.5, 1.0, 0.0));
        assert_eq!(
            SceneCorrection::apply(to_file_frame(parent) + offset),
            child
        );
    }
}
