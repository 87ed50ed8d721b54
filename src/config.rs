//! Gameplay tuning parsing from tuning.toml files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::constants::physics::TIMESTEP;

/// Head/face gesture thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Averaged head Y velocity below which a nod (grab) fires
    pub nod_y_velocity: f32,
    /// Averaged horizontal face speed at or above which a jerk (throw) fires
    pub jerk_horizontal_speed: f32,
    /// Window (seconds) for the averaged velocities
    pub tracker_window: f32,
    /// Optional very short window that must also exceed the jerk speed
    pub jerk_confirm_window: Option<f32>,
    /// Cooldown (seconds) after any gesture
    pub disable_gestures_duration: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            nod_y_velocity: -3.5,
            jerk_horizontal_speed: 8.0,
            tracker_window: 0.05,
            jerk_confirm_window: None,
            disable_gestures_duration: 0.25,
        }
    }
}

/// Liftable sweep and auto-aim tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    pub max_levitations: usize,
    /// Extra sweep distance past the first blocker
    pub blocker_margin: f32,
    pub blocker_max_distance: f32,
    /// Minimum horizontal dot between aim and cluster direction
    pub auto_aim_min_dot: f32,
    /// Distance of the fallback aim point along the aim direction
    pub default_target_distance: f32,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            max_levitations: 8,
            blocker_margin: 5.0,
            blocker_max_distance: 99999.0,
            auto_aim_min_dot: 0.8,
            default_target_distance: 100.0,
        }
    }
}

/// One axis (horizontal or vertical) of the hover seek
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekAxisConfig {
    pub target_distance: f32,
    pub velocity_towards_target: f32,
    pub velocity_distance_scale: f32,
}

impl Default for SeekAxisConfig {
    fn default() -> Self {
        Self {
            target_distance: 10.0,
            velocity_towards_target: 10.0,
            velocity_distance_scale: 1.0,
        }
    }
}

impl SeekAxisConfig {
    /// Fraction of the remaining displacement covered per second.
    pub fn gain(&self) -> f32 {
        self.velocity_towards_target * self.velocity_distance_scale
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevitationConfig {
    /// Per-axis bound of the random torque impulse applied on levitate
    pub rot_impulse_variance: [f32; 3],
    /// Downward acceleration applied while inert
    pub gravity_acceleration: f32,
    pub horizontal: SeekAxisConfig,
    pub vertical: SeekAxisConfig,
}

impl Default for LevitationConfig {
    fn default() -> Self {
        Self {
            rot_impulse_variance: [100.0, 100.0, 100.0],
            gravity_acceleration: 9.8,
            horizontal: SeekAxisConfig::default(),
            vertical: SeekAxisConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowingConfig {
    pub acceleration: f32,
    pub acceleration_duration: f32,
}

impl Default for ThrowingConfig {
    fn default() -> Self {
        Self {
            acceleration: 300.0,
            acceleration_duration: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboConfig {
    /// Age (seconds) after which a hit no longer counts toward a combo
    pub combo_duration_max: f32,
    pub enemy_combo_amount: usize,
    /// Minimum time between two combos
    pub combo_break_time: f32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            combo_duration_max: 2.0,
            enemy_combo_amount: 3,
            combo_break_time: 3.0,
        }
    }
}

/// Cluster and agent behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub lerp_towards_agents: f32,
    pub agent_cluster_force: f32,
    pub max_separation_force: f32,
    pub max_separation_force_distance: f32,
    pub separation_force_distance_power: f32,
    pub agent_speed: f32,
    /// Momentum (mass * speed) of a levitatable that kills an agent on contact
    pub momentum_to_die: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            lerp_towards_agents: 0.0,
            agent_cluster_force: 10.0,
            max_separation_force: 10.0,
            max_separation_force_distance: 10.0,
            separation_force_distance_power: 1.0,
            agent_speed: 4.0,
            momentum_to_die: 10.0,
        }
    }
}

/// Lifetime rules for the bodies left behind by killed agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadNinjaConfig {
    pub kill_distance_from_player: f32,
    pub death_wait_time: f32,
    pub chance_of_insta_death: f32,
    pub kill_max_speed: f32,
}

impl Default for DeadNinjaConfig {
    fn default() -> Self {
        Self {
            kill_distance_from_player: 100.0,
            death_wait_time: 2.0,
            chance_of_insta_death: 0.5,
            kill_max_speed: 0.5,
        }
    }
}

/// Gameplay tuning from tuning.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub gestures: GestureConfig,
    pub targeting: TargetingConfig,
    pub levitation: LevitationConfig,
    pub throwing: ThrowingConfig,
    pub combo: ComboConfig,
    pub clusters: ClusterConfig,
    pub dead_ninja: DeadNinjaConfig,
}

impl TuningConfig {
    /// Load tuning from a TOML file and validate it
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Rejects values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {}", value),
                })
            }
        }

        positive("gestures.tracker_window", self.gestures.tracker_window)?;
        positive(
            "gestures.disable_gestures_duration",
            self.gestures.disable_gestures_duration,
        )?;
        positive("gestures.jerk_horizontal_speed", self.gestures.jerk_horizontal_speed)?;
        if let Some(window) = self.gestures.jerk_confirm_window {
            positive("gestures.jerk_confirm_window", window)?;
        }
        if self.gestures.nod_y_velocity >= 0.0 {
            return Err(ConfigError::Invalid {
                field: "gestures.nod_y_velocity",
                reason: "a nod is a downward motion, threshold must be negative".to_string(),
            });
        }
        for (field, axis) in [
            ("levitation.horizontal", &self.levitation.horizontal),
            ("levitation.vertical", &self.levitation.vertical),
        ] {
            let gain = axis.gain();
            if !(gain.is_finite() && (0.0..=1.0 / TIMESTEP).contains(&gain)) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!(
                        "seek gain {} must be within [0, {}] or the hover overshoots",
                        gain,
                        1.0 / TIMESTEP
                    ),
                });
            }
        }
        if self.targeting.max_levitations == 0 {
            return Err(ConfigError::Invalid {
                field: "targeting.max_levitations",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("targeting.blocker_max_distance", self.targeting.blocker_max_distance)?;
        positive("targeting.default_target_distance", self.targeting.default_target_distance)?;
        positive("throwing.acceleration_duration", self.throwing.acceleration_duration)?;
        positive("combo.combo_duration_max", self.combo.combo_duration_max)?;
        if self.combo.enemy_combo_amount == 0 {
            return Err(ConfigError::Invalid {
                field: "combo.enemy_combo_amount",
                reason: "must be at least 1".to_string(),
            });
        }
        positive(
            "clusters.max_separation_force_distance",
            self.clusters.max_separation_force_distance,
        )?;
        if !(0.0..=1.0).contains(&self.clusters.lerp_towards_agents) {
            return Err(ConfigError::Invalid {
                field: "clusters.lerp_towards_agents",
                reason: "must be within [0, 1]".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.dead_ninja.chance_of_insta_death) {
            return Err(ConfigError::Invalid {
                field: "dead_ninja.chance_of_insta_death",
                reason: "must be within [0, 1]".to_string(),
            });
        }
        Ok(())
    }
}

/// Errors that can occur when loading tuning configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize tuning: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: TuningConfig = toml::from_str("").unwrap();
        assert_eq!(config.targeting.max_levitations, 8);
        assert_eq!(config.gestures.nod_y_velocity, -3.5);
        assert_eq!(config.throwing.acceleration_duration, 1.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
            [gestures]
            nod_y_velocity = -2.0
            jerk_confirm_window = 0.02

            [levitation.vertical]
            target_distance = 3.0

            [combo]
            enemy_combo_amount = 5
        "#;
        let config: TuningConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.gestures.nod_y_velocity, -2.0);
        assert_eq!(config.gestures.jerk_confirm_window, Some(0.02));
        assert_eq!(config.gestures.tracker_window, 0.05);
        assert_eq!(config.levitation.vertical.target_distance, 3.0);
        assert_eq!(config.levitation.vertical.velocity_towards_target, 10.0);
        assert_eq!(config.combo.enemy_combo_amount, 5);
    }

    #[test]
    fn test_validate_rejects_upward_nod() {
        let mut config = TuningConfig::default();
        config.gestures.nod_y_velocity = 1.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gestures.nod_y_velocity", .. }));
    }

    #[test]
    fn test_validate_rejects_zero_levitations() {
        let mut config = TuningConfig::default();
        config.targeting.max_levitations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overshooting_seek_gain() {
        let mut config = TuningConfig::default();
        config.levitation.vertical.velocity_distance_scale = 6.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "levitation.vertical", .. }));

        config.levitation.vertical.velocity_distance_scale = 4.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = TuningConfig::default().to_toml_string().unwrap();
        let parsed: TuningConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.clusters.momentum_to_die, 10.0);
        assert_eq!(parsed.levitation.rot_impulse_variance, [100.0, 100.0, 100.0]);
    }
}
