//! Numeric helpers centralizing clamps and safe casts.

use num_traits::cast::cast;

use crate::constants::{DAMAGE_TIER_KMH, MPS_TO_KMH};

/// Clamp into `[0, 1]`, mapping NaN to zero.
#[must_use]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Convert a speed in metres per second to km/h; non-finite input yields zero.
#[must_use]
pub fn mps_to_kmh(mps: f32) -> f32 {
    if !mps.is_finite() {
        return 0.0;
    }
    mps.abs() * MPS_TO_KMH
}

/// Number of full damage tiers reached at the given speed.
#[must_use]
pub fn damage_tier(speed_kmh: f32) -> i32 {
    if !speed_kmh.is_finite() {
        return 0;
    }
    let tier = (speed_kmh / DAMAGE_TIER_KMH).floor();
    cast::<f32, i32>(tier).unwrap_or(if tier > 0.0 { i32::MAX } else { 0 })
}

/// Damage fraction contributed by a tier: one percent per tier, never negative.
#[must_use]
pub fn tier_to_damage(tier: i32) -> f32 {
    if tier <= 0 {
        return 0.0;
    }
    cast::<i32, f32>(tier).unwrap_or(0.0) / 100.0
}

/// Branch slot as stored by the host; out-of-range indices saturate.
#[must_use]
pub fn branch_slot(index: usize) -> u8 {
    cast::<usize, u8>(index).unwrap_or(u8::MAX)
}

/// Round to the nearest hundredth.
#[must_use]
pub fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp01_handles_sign_magnitude_and_nan() {
        assert!((clamp01(1.7) - 1.0).abs() < f32::EPSILON);
        assert!(clamp01(-0.3).abs() < f32::EPSILON);
        assert!(clamp01(f32::NAN).abs() < f32::EPSILON);
        assert!((clamp01(0.42) - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn tiers_floor_to_full_buckets() {
        assert_eq!(damage_tier(9.99), 0);
        assert_eq!(damage_tier(10.0), 1);
        assert_eq!(damage_tier(47.5), 4);
        assert_eq!(damage_tier(f32::NAN), 0);
        assert_eq!(damage_tier(-25.0), -3);
        assert!(tier_to_damage(-3).abs() < f32::EPSILON);
        assert!((tier_to_damage(4) - 0.04).abs() < 1e-6);
    }

    #[test]
    fn speed_conversion_and_slots() {
        assert!((mps_to_kmh(10.0) - 36.0).abs() < 1e-4);
        assert!(mps_to_kmh(f32::INFINITY).abs() < f32::EPSILON);
        assert_eq!(branch_slot(2), 2);
        assert_eq!(branch_slot(300), u8::MAX);
        assert!((round_hundredths(0.234) - 0.23).abs() < 1e-6);
    }
}
