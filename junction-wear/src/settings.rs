//! User-tunable behaviour of the wear engine.

use serde::{Deserialize, Serialize};

use crate::constants::{
    FLIP_MULTIPLIER_MAX, FLIP_MULTIPLIER_MIN, SAFE_SPEED_MAX_KMH, SAFE_SPEED_MIN_KMH,
};
use crate::error::WearError;
use crate::numbers::round_hundredths;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WearSettings {
    /// Worn junctions may mis-route trains. Also gates impact-speed estimation.
    pub enable_random_flip: bool,
    /// At or below this speed (km/h) no flip is rolled.
    pub safe_no_flip_speed_kmh: f32,
    /// Flip chance at full damage, as a fraction (0.01 ..= 0.50).
    pub flip_multiplier: f32,
    /// Flips are suppressed this long after a forced run-through.
    pub flip_cooldown_after_forced_sec: f32,
    /// Fully worn junctions refuse manual switching.
    pub block_manual_switch_at_full_damage: bool,
    /// Emit routine log lines; failures are logged regardless.
    pub logging: bool,
}

impl Default for WearSettings {
    fn default() -> Self {
        Self {
            enable_random_flip: true,
            safe_no_flip_speed_kmh: 10.0,
            flip_multiplier: 0.10,
            flip_cooldown_after_forced_sec: 3.0,
            block_manual_switch_at_full_damage: true,
            logging: true,
        }
    }
}

impl WearSettings {
    /// Parse settings from JSON and sanitize them.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid settings JSON.
    pub fn from_json(json: &str) -> Result<Self, WearError> {
        let mut settings: Self =
            serde_json::from_str(json).map_err(|err| WearError::Settings(err.to_string()))?;
        settings.sanitize();
        Ok(settings)
    }

    /// Clamp every numeric field into its valid range.
    pub fn sanitize(&mut self) {
        let safe = if self.safe_no_flip_speed_kmh.is_finite() {
            self.safe_no_flip_speed_kmh
        } else {
            Self::default().safe_no_flip_speed_kmh
        };
        self.safe_no_flip_speed_kmh = safe.round().clamp(SAFE_SPEED_MIN_KMH, SAFE_SPEED_MAX_KMH);

        let multiplier = if self.flip_multiplier.is_finite() {
            self.flip_multiplier
        } else {
            Self::default().flip_multiplier
        };
        self.flip_multiplier =
            round_hundredths(multiplier).clamp(FLIP_MULTIPLIER_MIN, FLIP_MULTIPLIER_MAX);

        if !self.flip_cooldown_after_forced_sec.is_finite() {
            self.flip_cooldown_after_forced_sec = Self::default().flip_cooldown_after_forced_sec;
        }
        self.flip_cooldown_after_forced_sec = self.flip_cooldown_after_forced_sec.max(0.0);
    }

    /// Flip chance multiplier in effect, expressed as whole percent 1..=50 then scaled to a fraction.
    #[must_use]
    pub fn effective_flip_multiplier(&self) -> f32 {
        let percent = self.flip_multiplier * 100.0;
        if !percent.is_finite() {
            return FLIP_MULTIPLIER_MIN;
        }
        percent.clamp(1.0, 50.0) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings = WearSettings::from_json(r#"{"logging": false}"#).unwrap();
        assert!(!settings.logging);
        assert!(settings.enable_random_flip);
        assert!((settings.safe_no_flip_speed_kmh - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let settings = WearSettings::from_json(
            r#"{"safe_no_flip_speed_kmh": 95.4, "flip_multiplier": 3.0, "flip_cooldown_after_forced_sec": -2}"#,
        )
        .unwrap();
        assert!((settings.safe_no_flip_speed_kmh - 30.0).abs() < f32::EPSILON);
        assert!((settings.flip_multiplier - 0.5).abs() < f32::EPSILON);
        assert!(settings.flip_cooldown_after_forced_sec.abs() < f32::EPSILON);

        let mut low = WearSettings {
            safe_no_flip_speed_kmh: 0.2,
            flip_multiplier: 0.0,
            ..WearSettings::default()
        };
        low.sanitize();
        assert!((low.safe_no_flip_speed_kmh - 1.0).abs() < f32::EPSILON);
        assert!((low.flip_multiplier - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn effective_multiplier_clamps_unsanitized_values() {
        let settings = WearSettings {
            flip_multiplier: 0.9,
            ..WearSettings::default()
        };
        assert!((settings.effective_flip_multiplier() - 0.5).abs() < f32::EPSILON);
        let settings = WearSettings {
            flip_multiplier: 0.001,
            ..WearSettings::default()
        };
        assert!((settings.effective_flip_multiplier() - 0.01).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            WearSettings::from_json("{not json"),
            Err(WearError::Settings(_))
        ));
    }
}
