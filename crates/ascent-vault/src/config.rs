use std::fmt;
use std::fs;
use std::path::Path;

use ascent_core::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

const SECONDS_PER_DAY: u64 = 86_400;

pub const DEFAULT_PERIOD_INTERVAL: u64 = SECONDS_PER_DAY;
pub const DEFAULT_REQUIRED_PERIODS: u64 = 3;
pub const DEFAULT_UNLOCK_COOLDOWN: u64 = 7 * SECONDS_PER_DAY;

pub const DEFAULT_RATIO_DENOMINATOR: u32 = 9_000;
pub const DEFAULT_TREASURY_RATIO: u32 = 5_000;
pub const DEFAULT_GROWTH_RATIO: u32 = 2_000;
pub const DEFAULT_LIQUIDITY_RATIO: u32 = 1_000;
pub const DEFAULT_TEAM_RATIO: u32 = 1_000;

/// Vault timing and distribution configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Minimum seconds between two counted good periods
    #[serde(default = "default_period_interval")]
    pub period_interval: u64,

    /// Good periods a milestone needs before it can unlock
    #[serde(default = "default_required_periods")]
    pub required_periods: u64,

    /// Minimum seconds between any two unlocks
    #[serde(default = "default_unlock_cooldown")]
    pub unlock_cooldown: u64,

    /// Recipients and their ratio numerators
    pub distribution: RecipientTable,
}

/// One distribution recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub account: AccountId,
    pub ratio: u32,
}

/// The four fixed recipients. Treasury also absorbs rounding dust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientTable {
    #[serde(default = "default_denominator")]
    pub denominator: u32,
    pub treasury: Recipient,
    pub growth: Recipient,
    pub liquidity: Recipient,
    pub team: Recipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientRole {
    Treasury,
    Growth,
    Liquidity,
    Team,
}

impl fmt::Display for RecipientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecipientRole::Treasury => "treasury",
            RecipientRole::Growth => "growth",
            RecipientRole::Liquidity => "liquidity",
            RecipientRole::Team => "team",
        };
        f.write_str(name)
    }
}

fn default_period_interval() -> u64 {
    DEFAULT_PERIOD_INTERVAL
}

fn default_required_periods() -> u64 {
    DEFAULT_REQUIRED_PERIODS
}

fn default_unlock_cooldown() -> u64 {
    DEFAULT_UNLOCK_COOLDOWN
}

fn default_denominator() -> u32 {
    DEFAULT_RATIO_DENOMINATOR
}

impl RecipientTable {
    /// Recipients with the default 5000/2000/1000/1000 over 9000 split
    pub fn with_default_ratios(
        treasury: AccountId,
        growth: AccountId,
        liquidity: AccountId,
        team: AccountId,
    ) -> Self {
        Self {
            denominator: DEFAULT_RATIO_DENOMINATOR,
            treasury: Recipient { account: treasury, ratio: DEFAULT_TREASURY_RATIO },
            growth: Recipient { account: growth, ratio: DEFAULT_GROWTH_RATIO },
            liquidity: Recipient { account: liquidity, ratio: DEFAULT_LIQUIDITY_RATIO },
            team: Recipient { account: team, ratio: DEFAULT_TEAM_RATIO },
        }
    }

    /// Recipients in payout order, treasury first
    pub fn entries(&self) -> [(RecipientRole, Recipient); 4] {
        [
            (RecipientRole::Treasury, self.treasury),
            (RecipientRole::Growth, self.growth),
            (RecipientRole::Liquidity, self.liquidity),
            (RecipientRole::Team, self.team),
        ]
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.denominator == 0 {
            return Err(VaultError::invalid_config("ratio denominator must be greater than 0"));
        }

        for (role, recipient) in self.entries() {
            if recipient.account.is_zero() {
                return Err(VaultError::invalid_config(&format!("{} recipient is the zero identity", role)));
            }
        }

        let sum: u64 = self.entries().iter().map(|(_, r)| u64::from(r.ratio)).sum();
        if sum != u64::from(self.denominator) {
            return Err(VaultError::invalid_config(&format!(
                "ratios sum to {}, expected denominator {}",
                sum, self.denominator
            )));
        }

        Ok(())
    }
}

impl VaultConfig {
    /// Default timing with the given recipients
    pub fn new(distribution: RecipientTable) -> Self {
        Self {
            period_interval: DEFAULT_PERIOD_INTERVAL,
            required_periods: DEFAULT_REQUIRED_PERIODS,
            unlock_cooldown: DEFAULT_UNLOCK_COOLDOWN,
            distribution,
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> VaultResult<Self> {
        let config: VaultConfig = toml::from_str(content)
            .map_err(|e| VaultError::invalid_config(&format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VaultError::invalid_config(&format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> VaultResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| VaultError::invalid_config(&format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            VaultError::invalid_config(&format!("Failed to write config file {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.period_interval == 0 {
            return Err(VaultError::invalid_config("period_interval must be greater than 0"));
        }
        if self.required_periods == 0 {
            return Err(VaultError::invalid_config("required_periods must be greater than 0"));
        }
        self.distribution.validate()
    }
}
