use phf::phf_map;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Characteristic X-ray lines of common anode materials, in Å.
static PRESETS: phf::Map<&'static str, f64> = phf_map! {
    "CuKa" => 1.54184, "CuKa2" => 1.54439, "CuKa1" => 1.54056, "CuKb1" => 1.39222,
    "MoKa" => 0.71073, "MoKa2" => 0.71359, "MoKa1" => 0.70930, "MoKb1" => 0.63229,
    "CrKa" => 2.29100, "CrKa2" => 2.29361, "CrKa1" => 2.28970, "CrKb1" => 2.08487,
    "FeKa" => 1.93735, "FeKa2" => 1.93998, "FeKa1" => 1.93604, "FeKb1" => 1.75661,
    "CoKa" => 1.79026, "CoKa2" => 1.79285, "CoKa1" => 1.78896, "CoKb1" => 1.63079,
    "AgKa" => 0.560885, "AgKa2" => 0.563813, "AgKa1" => 0.559421, "AgKb1" => 0.497082,
};

pub const DEFAULT_PRESET: &str = "CuKa";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WavelengthError {
    #[error("unknown wavelength preset '{0}'")]
    UnknownPreset(String),
    #[error("wavelength must be positive and finite (value: {0})")]
    NonPositive(f64),
}

/// X-ray wavelength handed to a simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wavelength {
    Preset(&'static str),
    Angstrom(f64),
}

impl Wavelength {
    pub fn preset(name: &str) -> Result<Self, WavelengthError> {
        PRESETS
            .get_key(name)
            .map(|key| Self::Preset(*key))
            .ok_or_else(|| WavelengthError::UnknownPreset(name.to_string()))
    }

    pub fn angstrom(value: f64) -> Result<Self, WavelengthError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self::Angstrom(value))
        } else {
            Err(WavelengthError::NonPositive(value))
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            // Presets are only constructed from keys of the table.
            Self::Preset(name) => PRESETS.get(*name).copied().unwrap_or(f64::NAN),
            Self::Angstrom(value) => *value,
        }
    }

    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.keys().copied()
    }
}

impl Default for Wavelength {
    fn default() -> Self {
        Self::Preset(DEFAULT_PRESET)
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(name) => write!(f, "{} ({} Å)", name, self.value()),
            Self::Angstrom(value) => write!(f, "{} Å", value),
        }
    }
}

impl FromStr for Wavelength {
    type Err = WavelengthError;

    /// Accepts a preset name such as `CuKa` or a numeric value in Å.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<f64>() {
            Ok(value) => Self::angstrom(value),
            Err(_) => Self::preset(trimmed),
        }
    }
}
