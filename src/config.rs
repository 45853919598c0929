use crate::BPIRError;
use std::{collections::HashMap, path::Path, str::FromStr};

const DEFAULT_ROUNDS: usize = 10;

/// Protocol-wide parameters, built once at startup and handed to setup and retrieval by reference.
///
/// Loaded from `key=value` lines, using these keys: `num_bytes`, `m`, `n`, `l`, `I`, `errorCount`, `a`, `b` and the optional `rounds`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Byte size of each raw record element.
    pub elem_byte_len: usize,
    /// Number of records `m`.
    pub num_records: usize,
    /// Number of servers `n`.
    pub num_servers: usize,
    /// Number of blocks per record `l`.
    pub record_len: usize,
    /// Record to retrieve, `I`.
    pub target_index: usize,
    /// Number of servers simulated as dishonest, taken from the lowest indices.
    pub dishonest_count: usize,
    /// Blinding scalar `a`. Reused by every query; vary it across retrievals when queries must be unlinkable.
    pub blinding_a: i64,
    /// Blinding scalar `b`. Same caveat as `blinding_a`.
    pub blinding_b: i64,
    /// How many times the retrieval is repeated by the driver.
    pub rounds: usize,
}

impl Config {
    /// Parses `key=value` lines. Surrounding whitespace is trimmed, lines starting with `#`, lines without `=` and lines with
    /// an empty key or value are skipped. Parsed configuration is validated before being returned.
    pub fn from_kv_str(text: &str) -> Result<Config, BPIRError> {
        let pairs = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .collect::<HashMap<&str, &str>>();

        let config = Config {
            elem_byte_len: parse_required(&pairs, "num_bytes")?,
            num_records: parse_required(&pairs, "m")?,
            num_servers: parse_required(&pairs, "n")?,
            record_len: parse_required(&pairs, "l")?,
            target_index: parse_required(&pairs, "I")?,
            dishonest_count: parse_required(&pairs, "errorCount")?,
            blinding_a: parse_required(&pairs, "a")?,
            blinding_b: parse_required(&pairs, "b")?,
            rounds: parse_optional(&pairs, "rounds")?.unwrap_or(DEFAULT_ROUNDS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, BPIRError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| BPIRError::FailedToReadConfig(format!("{}: {}", path.display(), e)))?;

        Config::from_kv_str(&text)
    }

    /// Checks every invariant setup and retrieval rely on: positive sizes, `l ≤ n`, `I < m`, at most `n` dishonest servers
    /// and non-zero blinding scalars.
    pub fn validate(&self) -> Result<(), BPIRError> {
        for (key, value) in [("num_bytes", self.elem_byte_len), ("m", self.num_records), ("n", self.num_servers), ("l", self.record_len)] {
            if value == 0 {
                return Err(BPIRError::InvalidConfigValue(key.to_string(), value.to_string()));
            }
        }

        if self.record_len > self.num_servers {
            return Err(BPIRError::RecordLengthExceedsServerCount(self.record_len, self.num_servers));
        }
        if self.target_index >= self.num_records {
            return Err(BPIRError::TargetIndexOutOfRange(self.target_index, self.num_records));
        }
        if self.dishonest_count > self.num_servers {
            return Err(BPIRError::TooManyDishonestServers(self.dishonest_count, self.num_servers));
        }
        if self.blinding_a == 0 || self.blinding_b == 0 {
            return Err(BPIRError::ZeroBlindingScalar);
        }

        Ok(())
    }
}

fn parse_optional<T: FromStr>(pairs: &HashMap<&str, &str>, key: &str) -> Result<Option<T>, BPIRError> {
    pairs
        .get(key)
        .map(|value| value.parse::<T>().map_err(|_| BPIRError::InvalidConfigValue(key.to_string(), value.to_string())))
        .transpose()
}

fn parse_required<T: FromStr>(pairs: &HashMap<&str, &str>, key: &str) -> Result<T, BPIRError> {
    parse_optional(pairs, key)?.ok_or_else(|| BPIRError::MissingConfigKey(key.to_string()))
}
