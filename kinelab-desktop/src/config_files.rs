//! Scenario configuration: JSON files plus command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use kinelab::physics::FallModel;

// -------------------------------------------------------------------------------------------------

/// Parameters for every scenario. Any field missing from a configuration file takes its
/// default value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabConfig {
    /// Bouncing ball.
    pub bounce: BounceConfig,
    /// Projectile with drag.
    pub projectile: ProjectileConfig,
    /// Colliding disks.
    pub disks: DisksConfig,
    /// Spring chain.
    pub chain: ChainConfig,
    /// Monte Carlo estimation of π.
    pub pi: PiConfig,
}

/// Configuration of the bouncing ball scenario.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BounceConfig {
    /// Initial height.
    pub height: f64,
    /// Initial velocity.
    pub velocity: f64,
    /// Vertical acceleration.
    pub gravity: f64,
    /// Step length in seconds.
    pub dt: f64,
    /// How close to the floor each bounce must be located.
    pub tolerance: f64,
    /// Bisection iteration limit per bounce.
    pub max_iterations: u32,
    /// Trajectory used to locate bounces.
    pub model: ModelChoice,
}

impl Default for BounceConfig {
    fn default() -> Self {
        Self {
            height: 100.0,
            velocity: 0.0,
            gravity: -9.8,
            dt: 1.0,
            tolerance: 1e-6,
            max_iterations: kinelab::physics::DEFAULT_MAX_ITERATIONS,
            model: ModelChoice::default(),
        }
    }
}

/// Serializable name of a [`FallModel`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelChoice {
    /// [`FallModel::UpdatedVelocity`].
    #[default]
    UpdatedVelocity,
    /// [`FallModel::ConstantAcceleration`].
    ConstantAcceleration,
}

impl From<ModelChoice> for FallModel {
    fn from(value: ModelChoice) -> Self {
        match value {
            ModelChoice::UpdatedVelocity => FallModel::UpdatedVelocity,
            ModelChoice::ConstantAcceleration => FallModel::ConstantAcceleration,
        }
    }
}

/// Configuration of the projectile scenario.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectileConfig {
    /// Launch speed.
    pub speed: f64,
    /// Launch angle in degrees above horizontal.
    pub angle: f64,
    /// Horizontal drag coefficient.
    pub friction: f64,
    /// Vertical acceleration.
    pub gravity: f64,
    /// Step length in seconds.
    pub dt: f64,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            speed: 50.0,
            angle: 45.0,
            friction: 0.05,
            gravity: -9.81,
            dt: 0.1,
        }
    }
}

/// Configuration of the colliding disks scenario.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisksConfig {
    /// Number of disks.
    pub count: usize,
    /// Side length of the box.
    pub size: f64,
    /// Random seed for the initial disks.
    pub seed: u64,
    /// Coefficient of restitution.
    pub restitution: f64,
    /// Step length in seconds.
    pub dt: f64,
}

impl Default for DisksConfig {
    fn default() -> Self {
        Self {
            count: 10,
            size: 5.0,
            seed: 0,
            restitution: 1.0,
            dt: 0.01,
        }
    }
}

/// Configuration of the spring chain scenario.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Number of masses.
    pub masses: usize,
    /// Unstretched length of the chain.
    pub length: f64,
    /// Sum of the masses.
    pub total_mass: f64,
    /// Initial height of the bottom mass.
    pub start_height: f64,
    /// Spring constant.
    pub stiffness: f64,
    /// Damping coefficient.
    pub damping: f64,
    /// Vertical acceleration.
    pub gravity: f64,
    /// Step length in seconds.
    pub dt: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            masses: 10,
            length: 0.7,
            total_mass: 0.2,
            start_height: 5.0,
            stiffness: 2.3,
            damping: 0.1,
            gravity: -9.8,
            dt: 0.01,
        }
    }
}

/// Configuration of the π estimation scenario.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PiConfig {
    /// Powers of ten to use as sample counts.
    pub exponents: Vec<u32>,
    /// Runs per sample count, with seeds 0, 1, ….
    pub runs: u64,
}

impl Default for PiConfig {
    fn default() -> Self {
        Self {
            exponents: (2..8).collect(),
            runs: 2,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// [`clap::Args`] argument group struct for args that affect what configuration is used.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// JSON file to read scenario parameters from, instead of using defaults.
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    #[allow(clippy::doc_markdown, reason = "will be displayed in --help")]
    /// Override one scenario parameter, after reading the --config file if any.
    ///
    /// The value is specified as a key-value pair where the key is a section and field
    /// name separated by “.”, the separator is “=”, and the value is a JSON value
    /// (which, if a string, must be quoted); for example: -Sbounce.model='"constant-acceleration"'
    #[arg(long = "set", short = 'S', value_parser = parse_configure, value_name = "SECTION.NAME=JSON")]
    pub set: Vec<(String, serde_json::Value)>,
}

impl ConfigArgs {
    /// Constructs the [`LabConfig`] a run with these args should use.
    pub fn build_config(&self) -> Result<LabConfig, anyhow::Error> {
        let mut config = match &self.config_file {
            Some(path) => read_config_file(path)?,
            None => LabConfig::default(),
        };
        config
            .apply_overrides(&self.set)
            .context("--set did not produce a valid configuration")?;
        Ok(config)
    }
}

impl LabConfig {
    /// Replaces individual fields named `section.field`.
    pub fn apply_overrides(
        &mut self,
        overrides: &[(String, serde_json::Value)],
    ) -> Result<(), anyhow::Error> {
        if overrides.is_empty() {
            return Ok(());
        }
        let serde_json::Value::Object(mut sections) = serde_json::to_value(&*self)? else {
            anyhow::bail!("configuration should serialize as a JSON object");
        };
        for (key, value) in overrides {
            let (section, field) = key
                .split_once('.')
                .ok_or_else(|| anyhow::anyhow!("{key:?} is not of the form SECTION.NAME"))?;
            let Some(serde_json::Value::Object(fields)) = sections.get_mut(section) else {
                anyhow::bail!("unknown configuration section {section:?}");
            };
            fields.insert(field.to_owned(), value.clone());
        }
        *self = serde_json::from_value(serde_json::Value::Object(sections))?;
        Ok(())
    }
}

fn parse_configure(arg: &str) -> Result<(String, serde_json::Value), anyhow::Error> {
    let (key, value) = arg.split_once('=').ok_or_else(|| anyhow::anyhow!("missing '='"))?;
    let value = serde_json::from_str(value)?;
    Ok((key.to_owned(), value))
}

/// Reads a [`LabConfig`] from a JSON file.
pub fn read_config_file(path: &Path) -> Result<LabConfig, anyhow::Error> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read configuration file {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("syntax error in configuration file {}", path.display()))?;
    log::debug!("loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn set(pairs: &[(&str, serde_json::Value)]) -> Vec<(String, serde_json::Value)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn partial_file_contents_use_defaults() {
        let config: LabConfig =
            serde_json::from_value(json!({"bounce": {"height": 10.0}})).unwrap();
        assert_eq!(
            config,
            LabConfig {
                bounce: BounceConfig {
                    height: 10.0,
                    ..BounceConfig::default()
                },
                ..LabConfig::default()
            }
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        serde_json::from_value::<LabConfig>(json!({"bounce": {"hieght": 10.0}})).unwrap_err();
    }

    #[test]
    fn override_fields() {
        let mut config = LabConfig::default();
        config
            .apply_overrides(&set(&[
                ("bounce.model", json!("constant-acceleration")),
                ("bounce.dt", json!(0.5)),
                ("pi.exponents", json!([3, 4])),
            ]))
            .unwrap();
        assert_eq!(config.bounce.model, ModelChoice::ConstantAcceleration);
        assert_eq!(config.bounce.dt, 0.5);
        assert_eq!(config.pi.exponents, vec![3, 4]);
        assert_eq!(config.chain, ChainConfig::default());
    }

    #[test]
    fn override_errors() {
        let mut config = LabConfig::default();
        assert!(config.apply_overrides(&set(&[("dt", json!(1))])).is_err());
        assert!(
            config
                .apply_overrides(&set(&[("nonsense.dt", json!(1))]))
                .is_err()
        );
        assert!(
            config
                .apply_overrides(&set(&[("bounce.nonsense", json!(1))]))
                .is_err()
        );
        assert!(
            config
                .apply_overrides(&set(&[("bounce.dt", json!("fast"))]))
                .is_err()
        );
        assert_eq!(config, LabConfig::default());
    }

    #[test]
    fn parse_set_arg() {
        assert_eq!(
            parse_configure("chain.damping=0").unwrap(),
            ("chain.damping".to_owned(), json!(0))
        );
        assert!(parse_configure("chain.damping").is_err());
        assert!(parse_configure("chain.damping=zero").is_err());
    }

    #[test]
    fn missing_file_is_error() {
        let error = read_config_file(Path::new("/nonexistent/kinelab.json")).unwrap_err();
        assert!(
            error.to_string().contains("could not read configuration file"),
            "{error:#}"
        );
    }

    #[test]
    fn model_choice_names() {
        assert_eq!(
            serde_json::to_value(ModelChoice::ConstantAcceleration).unwrap(),
            json!("constant-acceleration")
        );
        assert_eq!(
            FallModel::from(ModelChoice::UpdatedVelocity),
            FallModel::UpdatedVelocity
        );
    }
}
