use std::path::Path;

use hub::HubConfig;
use serde::Deserialize;
use strategies::{DefaultStrategy, InputStrategy, RandomStrategy};
use types::{GameOptions, Strategy};

use crate::MatchError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Default,
    Random,
    Input,
}

impl StrategyKind {
    /// Seeded random strategies get a different stream per seat.
    pub fn build(self, seed: Option<u64>, seat: usize) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Default => Box::new(DefaultStrategy::default()),
            StrategyKind::Random => match seed {
                Some(seed) => Box::new(RandomStrategy::with_seed(seed.wrapping_add(seat as u64))),
                None => Box::new(RandomStrategy::default()),
            },
            StrategyKind::Input => Box::new(InputStrategy::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// A whole match described in YAML:
///
/// ```yaml
/// options:
///   player_count: 3
///   mafia_count: 1
///   doctor_count: 0
///   sheriff_count: 0
///   day_interval_units: 4
///   night_interval_units: 2
/// players:
///   - name: ann
///   - name: bob
///     strategy: random
///   - name: cat
/// seed: 7
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    pub options: GameOptions,
    pub players: Vec<PlayerConfig>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub hub: HubConfig,
}

impl MatchConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MatchError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| MatchError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, MatchError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), MatchError> {
        self.options.verify()?;
        if self.players.len() != self.options.player_count as usize {
            return Err(MatchError::Config(format!(
                "{} players listed but options ask for {}",
                self.players.len(),
                self.options.player_count
            )));
        }
        Ok(())
    }
}
