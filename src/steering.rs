/*
 * Steering Module
 *
 * Steering primitives shared by the flock and predator updates: the
 * Reynolds seek, force clamping, the curvature bias that makes boids arc,
 * and the push back from the walls of the volume.
 */

use glam::DVec3;

use crate::boid::Boid;
use crate::noise_field::NoiseField;
use crate::params::SimulationParams;

// Pairs closer than this (squared) are treated as coincident and ignored
pub const DEGENERATE_DISTANCE_SQ: f64 = 1e-8;
// Below this speed a velocity has no usable heading
pub const DEGENERATE_SPEED: f64 = 1e-6;

// Blend between the oscillating and the noise-driven parts of the curve
const ARC_WAVE_SHARE: f64 = 0.68;
const ARC_NOISE_SHARE: f64 = 0.32;
const ARC_NOISE_TIME_SCALE: f64 = 0.35;
const ARC_VERTICAL_RATE: f64 = 0.6;

/// Scale `force` down to `max_force` if it is longer; never lengthens it.
#[inline]
pub fn clamp_steer(force: DVec3, max_force: f64) -> DVec3 {
    let magnitude = force.length();
    if magnitude > max_force && magnitude > 0.0 {
        force * (max_force / magnitude)
    } else {
        force
    }
}

/// Reynolds steering: desired velocity along `direction` at `speed`, minus
/// the current velocity, limited to `max_force`.
///
/// Returns `None` when `direction` has zero length so the caller can skip the
/// term instead of steering towards the origin.
#[inline]
pub fn seek(direction: DVec3, velocity: DVec3, speed: f64, max_force: f64) -> Option<DVec3> {
    let magnitude = direction.length();
    if magnitude > 0.0 {
        let desired = direction * (speed / magnitude);
        Some(clamp_steer(desired - velocity, max_force))
    } else {
        None
    }
}

/// Horizontal unit axis perpendicular to `velocity`.
///
/// Falls back to +X when the velocity is too small or points straight up or
/// down, which keeps the curvature term continuous through a stall.
#[inline]
pub fn lateral_axis(velocity: DVec3) -> DVec3 {
    let speed = velocity.length();
    if speed > DEGENERATE_SPEED {
        let lateral = DVec3::new(-velocity.z / speed, 0.0, velocity.x / speed);
        let length = lateral.length();
        if length > DEGENERATE_SPEED {
            return lateral / length;
        }
    }
    DVec3::X
}

/// Curvature bias that makes a boid bank and arc instead of flying straight.
pub fn curvature<N: NoiseField + ?Sized>(boid: &Boid, params: &SimulationParams, noise: &N, sim_time: f64) -> DVec3 {
    let lateral = lateral_axis(boid.velocity);

    let curve_noise = noise.noise3(
        boid.position.x * params.arc_noise_scale + boid.arc_seed,
        boid.position.y * params.arc_noise_scale,
        sim_time * ARC_NOISE_TIME_SCALE + boid.arc_seed,
    );
    let curve_wave = (sim_time * boid.arc_rate + boid.arc_phase).sin();
    let curve = curve_wave * ARC_WAVE_SHARE + curve_noise * ARC_NOISE_SHARE;

    let vertical = (sim_time * boid.arc_rate * ARC_VERTICAL_RATE + boid.arc_phase).sin() * params.arc_vertical_strength;

    lateral * (params.arc_turn_strength * curve) + DVec3::new(0.0, vertical, 0.0)
}

/// Restoring push for every axis on which `position` is within `margin` of a face.
#[inline]
pub fn boundary_push(position: DVec3, half_extent: f64, margin: f64, strength: f64) -> DVec3 {
    let limit = half_extent - margin;
    let axis = |p: f64| {
        let mut push = 0.0;
        if p > limit {
            push -= strength;
        }
        if p < -limit {
            push += strength;
        }
        push
    };
    DVec3::new(axis(position.x), axis(position.y), axis(position.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise_field::FlatField;

    #[test]
    fn clamp_only_shortens() {
        let long = clamp_steer(DVec3::new(30.0, 40.0, 0.0), 5.0);
        assert!((long.length() - 5.0).abs() < 1e-12);
        assert!((long.normalize() - DVec3::new(0.6, 0.8, 0.0)).length() < 1e-12);

        let short = DVec3::new(1.0, 0.0, 0.0);
        assert_eq!(clamp_steer(short, 5.0), short);
        assert_eq!(clamp_steer(DVec3::ZERO, 0.0), DVec3::ZERO);
    }

    #[test]
    fn seek_skips_zero_direction() {
        assert_eq!(seek(DVec3::ZERO, DVec3::X, 10.0, 1.0), None);
    }

    #[test]
    fn seek_subtracts_current_velocity() {
        let force = seek(DVec3::new(0.0, 0.0, 2.0), DVec3::new(0.0, 0.0, 3.0), 5.0, 100.0).unwrap();
        assert!((force - DVec3::new(0.0, 0.0, 2.0)).length() < 1e-12);
    }

    #[test]
    fn lateral_axis_is_horizontal_and_perpendicular() {
        let velocity = DVec3::new(3.0, 2.0, -4.0);
        let lateral = lateral_axis(velocity);
        assert!((lateral.length() - 1.0).abs() < 1e-12);
        assert_eq!(lateral.y, 0.0);
        assert!(lateral.dot(DVec3::new(velocity.x, 0.0, velocity.z)).abs() < 1e-12);
    }

    #[test]
    fn lateral_axis_falls_back_when_heading_is_undefined() {
        assert_eq!(lateral_axis(DVec3::ZERO), DVec3::X);
        assert_eq!(lateral_axis(DVec3::new(0.0, 5.0, 0.0)), DVec3::X);
    }

    #[test]
    fn curvature_is_finite_for_a_stalled_boid() {
        let mut boid = Boid::new(DVec3::new(10.0, -3.0, 7.0), DVec3::ZERO);
        boid.arc_phase = 1.0;
        let force = curvature(&boid, &SimulationParams::default(), &FlatField(0.5), 2.0);
        assert!(force.is_finite());
        assert_eq!(force.z, 0.0);
    }

    #[test]
    fn curvature_vanishes_with_zero_phase_and_time() {
        let boid = Boid::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let force = curvature(&boid, &SimulationParams::default(), &FlatField(0.0), 0.0);
        assert_eq!(force, DVec3::ZERO);
    }

    #[test]
    fn boundary_push_points_inwards() {
        let push = boundary_push(DVec3::new(95.0, 0.0, -99.0), 100.0, 10.0, 3.0);
        assert_eq!(push, DVec3::new(-3.0, 0.0, 3.0));
        assert_eq!(boundary_push(DVec3::new(89.0, -89.0, 0.0), 100.0, 10.0, 3.0), DVec3::ZERO);
    }
}
