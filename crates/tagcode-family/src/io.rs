//! JSON configuration for tag families.

use crate::{builtin_family, compute_minimum_hamming_distance, FamilyError, TagCodeFamily};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum FamilyIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum FamilyConfigError {
    #[error(transparent)]
    Family(#[from] FamilyError),
    #[error(transparent)]
    Io(#[from] FamilyIoError),
    #[error("unknown built-in family {0:?}")]
    UnknownBuiltin(String),
}

fn default_border() -> usize {
    1
}

/// Serialized description of a tag family.
///
/// Codes are written as hex strings (`"0x231b"`); decimal strings are
/// accepted on input too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagFamilyConfig {
    pub name: String,
    pub bit_count: usize,
    /// Computed from the codes when omitted.
    #[serde(default)]
    pub minimum_hamming_distance: Option<u32>,
    #[serde(with = "hex_codes")]
    pub codes: Vec<u64>,
    #[serde(default = "default_border")]
    pub white_border: usize,
    #[serde(default = "default_border")]
    pub black_border: usize,
    /// Takes precedence over `error_recovery_fraction`.
    #[serde(default)]
    pub error_recovery_bits: Option<u32>,
    #[serde(default)]
    pub error_recovery_fraction: Option<f64>,
}

impl TagFamilyConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FamilyIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FamilyIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Describe an existing family, e.g. to export a built-in.
    pub fn from_family(family: &TagCodeFamily) -> Self {
        Self {
            name: family.name().to_string(),
            bit_count: family.bit_count(),
            minimum_hamming_distance: Some(family.minimum_hamming_distance()),
            codes: family.codes().to_vec(),
            white_border: family.white_border(),
            black_border: family.black_border(),
            error_recovery_bits: Some(family.error_recovery_bits()),
            error_recovery_fraction: None,
        }
    }

    /// Validate and build the family.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self), fields(name = %self.name, codes = self.codes.len())))]
    pub fn build_family(&self) -> Result<TagCodeFamily, FamilyError> {
        let min_hamming = match self.minimum_hamming_distance {
            Some(d) => d,
            None => compute_minimum_hamming_distance(self.bit_count, &self.codes).unwrap_or(0),
        };
        let mut family =
            TagCodeFamily::new(self.name.clone(), self.bit_count, min_hamming, self.codes.clone())?
                .with_borders(self.white_border, self.black_border);

        match (self.error_recovery_bits, self.error_recovery_fraction) {
            (Some(bits), _) => family.set_error_recovery_bits(bits),
            (None, Some(fraction)) => family.set_error_recovery_fraction(fraction),
            (None, None) => {}
        }
        Ok(family)
    }
}

/// Where a family comes from: a built-in name or a JSON config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilySource {
    Builtin(String),
    Config(PathBuf),
}

impl FamilySource {
    pub fn load(&self) -> Result<TagCodeFamily, FamilyConfigError> {
        match self {
            FamilySource::Builtin(name) => {
                builtin_family(name).ok_or_else(|| FamilyConfigError::UnknownBuiltin(name.clone()))
            }
            FamilySource::Config(path) => Ok(TagFamilyConfig::load_json(path)?.build_family()?),
        }
    }
}

/// Parse a code word written as `0x…` hex or plain decimal.
pub fn parse_code(text: &str) -> Result<u64, std::num::ParseIntError> {
    let t = text.trim();
    match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => t.replace('_', "").parse(),
    }
}

mod hex_codes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(codes: &[u64], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(codes.iter().map(|c| format!("{c:#x}")))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u64>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| {
                super::parse_code(s).map_err(|e| D::Error::custom(format!("code {s:?}: {e}")))
            })
            .collect()
    }
}
