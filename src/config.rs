//! Typed configuration for the replacement policies.
//!
//! The original reads four scalars per policy directly out of a generic
//! config-string reader (`Sim()->getCfg()->getIntArray(cfgname + "/srrip/...",
//! core_id)`). This module replaces that with a typed [`SrripConfig`] plus
//! named presets, mirroring the `Config`/`SyncMode` preset split this crate's
//! teacher uses for its own database configuration.

use crate::error::{ReplacementError, Result};

/// Configuration scalars shared by the RRIP-family policies.
///
/// Only the fields relevant to a given policy are read by that policy's
/// constructor; see each policy module for which subset it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrripConfig {
    /// `srrip/bits` — number of RRPV bits; determines `rrpv_max` and
    /// `rrpv_insert`.
    pub bits: u8,
    /// `srrip/max_value` — phase length in insertions (DBPV_DYN, DBASP).
    pub max_value: u32,
    /// `srrip/db_threshold` — fixed-point percent times 100, e.g. `9000` for
    /// 90%.
    pub db_threshold: u32,
    /// `srrip/case` — insertion-position table index, `1..=12` (DBPV only).
    pub case: u8,
}

impl SrripConfig {
    /// `rrpv_max = (1 << bits) - 1`.
    pub fn rrpv_max(&self) -> u8 {
        (1u16 << self.bits) as u8 - 1
    }

    /// `rrpv_insert = rrpv_max - 1`.
    pub fn rrpv_insert(&self) -> u8 {
        self.rrpv_max() - 1
    }

    /// A 2-bit RRPV configuration using case 3 (plain SRRIP insertion for
    /// both owners), the baseline DBPV case used throughout the scenarios in
    /// this crate's tests.
    pub fn dbpv_default() -> Self {
        Self {
            bits: 2,
            max_value: 0,
            db_threshold: 0,
            case: 3,
        }
    }

    /// A 2-bit RRPV configuration with a ten-thousand-insertion phase length
    /// and a 90% dead-block threshold, typical values for DBPV_DYN.
    pub fn dbpv_dyn_default() -> Self {
        Self {
            bits: 2,
            max_value: 10_000,
            db_threshold: 9000,
            case: 0,
        }
    }

    /// A 2-bit RRPV configuration for DBASP; `max_value`/`db_threshold` are
    /// unused by DBASP but kept at sensible defaults for uniformity.
    pub fn dbasp_default() -> Self {
        Self {
            bits: 2,
            max_value: 10_000,
            db_threshold: 9000,
            case: 0,
        }
    }
}

/// A keyed source of integer configuration scalars, indexed by core id, in
/// the shape of the original's `getCfg()->getIntArray(key, core_id)`.
///
/// A future embedding simulator implements this over its own config-file
/// format; this crate never assumes one.
pub trait PolicyConfigSource {
    /// Looks up `key` for the given `core_id`, or `None` if absent.
    fn get_int(&self, key: &str, core_id: u8) -> Option<i64>;
}

fn require(
    source: &dyn PolicyConfigSource,
    cfgname: &str,
    suffix: &str,
    core_id: u8,
) -> Result<i64> {
    let key = format!("{cfgname}/srrip/{suffix}");
    source
        .get_int(&key, core_id)
        .ok_or(ReplacementError::ConfigMissing { key })
}

impl SrripConfig {
    /// Loads the `bits` and `case` keys required by DBPV.
    ///
    /// # Errors
    /// Returns [`ReplacementError::ConfigMissing`] if either key is absent.
    pub fn load_dbpv(source: &dyn PolicyConfigSource, cfgname: &str, core_id: u8) -> Result<Self> {
        Ok(Self {
            bits: require(source, cfgname, "bits", core_id)? as u8,
            max_value: 0,
            db_threshold: 0,
            case: require(source, cfgname, "case", core_id)? as u8,
        })
    }

    /// Loads the `bits`, `max_value`, and `db_threshold` keys required by
    /// DBPV_DYN.
    ///
    /// # Errors
    /// Returns [`ReplacementError::ConfigMissing`] if any key is absent.
    pub fn load_dbpv_dyn(
        source: &dyn PolicyConfigSource,
        cfgname: &str,
        core_id: u8,
    ) -> Result<Self> {
        Ok(Self {
            bits: require(source, cfgname, "bits", core_id)? as u8,
            max_value: require(source, cfgname, "max_value", core_id)? as u32,
            db_threshold: require(source, cfgname, "db_threshold", core_id)? as u32,
            case: 0,
        })
    }

    /// Loads the `bits` key required by DBASP (`max_value`/`db_threshold`
    /// are unused by DBASP).
    ///
    /// # Errors
    /// Returns [`ReplacementError::ConfigMissing`] if the key is absent.
    pub fn load_dbasp(source: &dyn PolicyConfigSource, cfgname: &str, core_id: u8) -> Result<Self> {
        Ok(Self {
            bits: require(source, cfgname, "bits", core_id)? as u8,
            max_value: 0,
            db_threshold: 0,
            case: 0,
        })
    }
}
