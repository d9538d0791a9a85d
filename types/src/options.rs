use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds represented by one day/night interval unit.
pub const INTERVAL_UNIT_SECS: i64 = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("{field} is too large. Max is {max}")]
    TooLarge { field: &'static str, max: u32 },

    #[error("special roles ({special}) exceed the player count ({players})")]
    TooManyRoles { special: u32, players: u32 },

    #[error("encoded options have {0:#x} left over after decoding")]
    ResidualBits(u32),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    pub player_count: u32,
    pub mafia_count: u32,
    pub doctor_count: u32,
    pub sheriff_count: u32,
    pub day_interval_units: u32,
    pub night_interval_units: u32,
}

/// Bit width of each packed field, most significant first.
const FIELD_WIDTHS: [(&str, u32); 6] = [
    ("player_count", 6),
    ("mafia_count", 4),
    ("doctor_count", 2),
    ("sheriff_count", 2),
    ("day_interval_units", 8),
    ("night_interval_units", 8),
];

fn last_n_bits(value: u32, n: u32) -> u32 {
    value & ((1 << n) - 1)
}

impl GameOptions {
    fn fields(&self) -> [u32; 6] {
        [
            self.player_count,
            self.mafia_count,
            self.doctor_count,
            self.sheriff_count,
            self.day_interval_units,
            self.night_interval_units,
        ]
    }

    fn from_fields(fields: [u32; 6]) -> Self {
        let [player_count, mafia_count, doctor_count, sheriff_count, day_interval_units, night_interval_units] =
            fields;
        Self {
            player_count,
            mafia_count,
            doctor_count,
            sheriff_count,
            day_interval_units,
            night_interval_units,
        }
    }

    pub fn verify(&self) -> Result<(), OptionsError> {
        for ((field, width), value) in FIELD_WIDTHS.iter().zip(self.fields()) {
            let max: u32 = (1u32 << *width) - 1;
            if value > max {
                return Err(OptionsError::TooLarge { field: *field, max });
            }
        }

        let special = self.mafia_count + self.doctor_count + self.sheriff_count;
        if special > self.player_count {
            return Err(OptionsError::TooManyRoles {
                special,
                players: self.player_count,
            });
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<u32, OptionsError> {
        self.verify()?;
        let total = FIELD_WIDTHS
            .iter()
            .zip(self.fields())
            .fold(0u32, |total, ((_, width), value)| (total << width) | value);
        Ok(total)
    }

    pub fn decode(encoded: u32) -> Result<Self, OptionsError> {
        let mut remaining = encoded;
        let mut fields = [0u32; 6];
        // least significant field comes out first
        for (slot, (_, width)) in fields.iter_mut().zip(FIELD_WIDTHS.iter()).rev() {
            *slot = last_n_bits(remaining, *width);
            remaining >>= width;
        }
        if remaining != 0 {
            return Err(OptionsError::ResidualBits(remaining));
        }

        let options = Self::from_fields(fields);
        options.verify()?;
        Ok(options)
    }

    pub fn villager_count(&self) -> u32 {
        self.player_count
            .saturating_sub(self.mafia_count + self.doctor_count + self.sheriff_count)
    }

    pub fn day_interval_secs(&self) -> i64 {
        i64::from(self.day_interval_units) * INTERVAL_UNIT_SECS
    }

    pub fn night_interval_secs(&self) -> i64 {
        i64::from(self.night_interval_units) * INTERVAL_UNIT_SECS
    }
}

impl Display for GameOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} players ({} mafia, {} doctors, {} sheriffs, {} villagers), day {}s, night {}s",
            self.player_count,
            self.mafia_count,
            self.doctor_count,
            self.sheriff_count,
            self.villager_count(),
            self.day_interval_secs(),
            self.night_interval_secs()
        )
    }
}
