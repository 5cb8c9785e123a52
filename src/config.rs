use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::Value;

use crate::error::ConfigError;
use crate::timeq::Cycle;

/// Loads a config struct out of a named TOML section, falling back to the
/// defaults when the section is absent.
pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Self {
        match section {
            Some(value) => value.clone().try_into().expect("cannot deserialize config"),
            None => {
                warn!("config section not found");
                Self::default()
            }
        }
    }
}

/// Closed configuration record for a simulator instance.  Every knob is
/// enumerated here; construction validates the whole record and rejects
/// anything inconsistent.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    /// Tier-1 aggregate capacity in lines.
    pub t1_total_lines: u64,
    /// Parallel tier-1 access paths; must divide `t1_total_lines`.
    pub num_t1_banks: usize,
    /// Tier-2 aggregate capacity in lines.
    pub t2_total_lines: u64,
    /// Parallel tier-2 access paths; must divide `t2_total_lines`.
    pub num_t2_banks: usize,
    /// Cache line size in bytes; power of two.
    pub line_bytes: u64,
    /// Tier-1 service time in cycles.
    pub t1_latency: Cycle,
    /// Tier-2 fill latency in cycles.
    pub t2_latency: Cycle,
    /// Consecutive sequential reads that arm the stream prefetcher.
    pub prefetch_trigger: u32,
    /// Maximum prefetch distance ahead of the demand stream, in lines.
    pub prefetch_lookahead: u64,
    /// Maximum prefetches issued per observed read; zero disables prefetch.
    pub prefetch_issue_width: usize,
    /// Soft cap on the cycle counter, as a guard against pathological
    /// inputs.  None runs without a cap.
    pub max_cycles: Option<Cycle>,
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        // 32 MB tier-1 / 224 MB tier-2 at 128-byte lines.
        Self {
            t1_total_lines: 262_144,
            num_t1_banks: 4,
            t2_total_lines: 1_835_008,
            num_t2_banks: 14,
            line_bytes: 128,
            t1_latency: 1,
            t2_latency: 3,
            prefetch_trigger: 2,
            prefetch_lookahead: 16,
            prefetch_issue_width: 4,
            max_cycles: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.line_bytes.is_power_of_two() {
            return Err(ConfigError::LineBytesNotPowerOfTwo(self.line_bytes));
        }
        if self.t1_total_lines == 0 {
            return Err(ConfigError::ZeroCapacity { tier: "tier-1" });
        }
        if self.t2_total_lines == 0 {
            return Err(ConfigError::ZeroCapacity { tier: "tier-2" });
        }
        if self.num_t1_banks == 0 || self.t1_total_lines % self.num_t1_banks as u64 != 0 {
            return Err(ConfigError::BadBankCount {
                tier: "tier-1",
                banks: self.num_t1_banks,
                lines: self.t1_total_lines,
            });
        }
        if self.num_t2_banks == 0 || self.t2_total_lines % self.num_t2_banks as u64 != 0 {
            return Err(ConfigError::BadBankCount {
                tier: "tier-2",
                banks: self.num_t2_banks,
                lines: self.t2_total_lines,
            });
        }
        if self.t1_latency == 0 {
            return Err(ConfigError::ZeroParameter { field: "t1_latency" });
        }
        if self.t2_latency == 0 {
            return Err(ConfigError::ZeroParameter { field: "t2_latency" });
        }
        if self.prefetch_trigger == 0 {
            return Err(ConfigError::ZeroParameter {
                field: "prefetch_trigger",
            });
        }
        Ok(())
    }

    pub fn t1_lines_per_bank(&self) -> u64 {
        self.t1_total_lines / self.num_t1_banks as u64
    }

    pub fn t2_lines_per_bank(&self) -> u64 {
        self.t2_total_lines / self.num_t2_banks as u64
    }
}

#[cfg(test)]
mod tests {
    use super::SimConfig;
    use crate::error::ConfigError;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_line() {
        let cfg = SimConfig {
            line_bytes: 100,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::LineBytesNotPowerOfTwo(100))
        );
    }

    #[test]
    fn rejects_zero_line_bytes() {
        let cfg = SimConfig {
            line_bytes: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LineBytesNotPowerOfTwo(0))
        ));
    }

    #[test]
    fn rejects_non_dividing_bank_count() {
        let cfg = SimConfig {
            t1_total_lines: 4096,
            num_t1_banks: 3,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BadBankCount { tier: "tier-1", .. })
        ));
    }

    #[test]
    fn rejects_zero_capacity() {
        let cfg = SimConfig {
            t2_total_lines: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroCapacity { tier: "tier-2" })
        ));
    }

    #[test]
    fn rejects_zero_latency_and_trigger() {
        let cfg = SimConfig {
            t2_latency: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = SimConfig {
            prefetch_trigger: 0,
            ..SimConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn per_bank_capacity_splits_evenly() {
        let cfg = SimConfig::default();
        assert_eq!(
            cfg.t1_lines_per_bank() * cfg.num_t1_banks as u64,
            cfg.t1_total_lines
        );
        assert_eq!(
            cfg.t2_lines_per_bank() * cfg.num_t2_banks as u64,
            cfg.t2_total_lines
        );
    }
}
