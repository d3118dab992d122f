//! Ledger initialization configuration.
//!
//! Loads the privileged account and fee rate from a TOML file with support
//! for environment variable expansion in string values. Variables use `$VAR`
//! or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! privileged = "$TINYPAY_PAYMASTER"
//! fee_rate_bps = 100
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `tinypay.toml`)
//! - `TINYPAY_PRIVILEGED` - Override the privileged account
//! - `TINYPAY_FEE_RATE` - Override the fee rate in basis points

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tinypay_proto::{Account, FeeRate};

/// Values `init_system` is called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Account exempt from merchant precommits and credited with fees.
    pub privileged: Account,
    /// Fee rate in basis points (default: `0`).
    #[serde(default, rename = "fee_rate_bps")]
    pub fee_rate: FeeRate,
}

/// On-disk shape before overrides are applied.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    privileged: Option<Account>,
    fee_rate_bps: Option<FeeRate>,
}

/// Errors raised while loading a [`LedgerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML or has invalid values.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value}")]
    InvalidOverride {
        /// Override variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
    /// No privileged account was configured.
    #[error("no privileged account configured")]
    MissingPrivileged,
}

impl LedgerConfig {
    /// Loads configuration from the path given by the `CONFIG` environment
    /// variable, falling back to `tinypay.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or no
    /// privileged account is configured.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "tinypay.toml".to_owned());
        Self::load_from(path)
    }

    /// Loads configuration from a specific file path, resolving variables
    /// from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or no
    /// privileged account is configured.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Loads configuration from `path`, resolving `$VAR` references and
    /// overrides through `lookup`.
    ///
    /// A missing file is treated as empty, so a configuration can come
    /// entirely from overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, an
    /// override is malformed, or no privileged account is configured.
    pub fn load_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };

        let expanded = expand_vars(&content, &lookup);
        let mut raw: RawConfig = toml::from_str(&expanded)?;

        if let Some(value) = lookup("TINYPAY_PRIVILEGED") {
            let account = value
                .trim()
                .parse::<Account>()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: "TINYPAY_PRIVILEGED",
                    value: value.clone(),
                })?;
            raw.privileged = Some(account);
        }
        if let Some(value) = lookup("TINYPAY_FEE_RATE") {
            let rate = value
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|bps| FeeRate::from_bps(bps).ok())
                .ok_or_else(|| ConfigError::InvalidOverride {
                    var: "TINYPAY_FEE_RATE",
                    value: value.clone(),
                })?;
            raw.fee_rate_bps = Some(rate);
        }

        Ok(Self {
            privileged: raw.privileged.ok_or(ConfigError::MissingPrivileged)?,
            fee_rate: raw.fee_rate_bps.unwrap_or_default(),
        })
    }
}

/// Expands `$VAR` and `${VAR}` patterns using `lookup`.
///
/// Unresolved variables are left as-is.
fn expand_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name) {
            Some(value) if !name.is_empty() => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
