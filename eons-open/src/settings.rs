// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Engine tunables loaded from YAML documents.
//!
//! Every field is optional in the document and falls back to the values the
//! content script ships with. Range checks run during deserialization so a
//! malformed document is rejected with the offending field in the message.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{self, Error},
    poll::PollConfig,
};

/// Prefix of injected button ids.
pub const DEFAULT_BUTTON_ID_PREFIX: &str = "eons-open-btn-";
/// Visible label of injected buttons.
pub const DEFAULT_BUTTON_LABEL: &str = "Open";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_BRANCH_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_BRANCH_POLL_TIMEOUT_MS: u64 = 3000;
const MAX_DEBOUNCE_MS: u64 = 10_000;
const MAX_BRANCH_POLL_TIMEOUT_MS: u64 = 60_000;

/// Tunables of the injection engine.
///
/// # Examples
///
/// ```
/// use eons_open::EngineSettings;
///
/// let settings: EngineSettings = serde_yaml::from_str("debounce_ms: 150",)?;
/// assert_eq!(settings.debounce_ms, 150);
/// assert_eq!(settings.button_label, "Open");
/// # Ok::<(), serde_yaml::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(deny_unknown_fields)]
pub struct EngineSettings
{
    /// Quiet period after the last DOM mutation before re-evaluating.
    #[serde(default = "default_debounce_ms", deserialize_with = "deserialize_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay between merge-request branch lookups.
    #[serde(default = "default_branch_poll_interval_ms", alias = "poll_interval_ms")]
    pub branch_poll_interval_ms: u64,

    /// Upper bound on the time spent waiting for a merge-request branch.
    #[serde(
        default = "default_branch_poll_timeout_ms",
        alias = "poll_timeout_ms",
        deserialize_with = "deserialize_branch_poll_timeout_ms"
    )]
    pub branch_poll_timeout_ms: u64,

    /// Prefix prepended to the contribution id to build the button id.
    #[serde(default = "default_button_id_prefix")]
    pub button_id_prefix: String,

    /// Visible label of the button.
    #[serde(default = "default_button_label")]
    pub button_label: String,
}

impl Default for EngineSettings
{
    fn default() -> Self
    {
        Self {
            debounce_ms:             DEFAULT_DEBOUNCE_MS,
            branch_poll_interval_ms: DEFAULT_BRANCH_POLL_INTERVAL_MS,
            branch_poll_timeout_ms:  DEFAULT_BRANCH_POLL_TIMEOUT_MS,
            button_id_prefix:        DEFAULT_BUTTON_ID_PREFIX.to_owned(),
            button_label:            DEFAULT_BUTTON_LABEL.to_owned(),
        }
    }
}

impl EngineSettings
{
    /// Debounce window applied to mutation signals.
    pub fn debounce(&self,) -> Duration
    {
        Duration::from_millis(self.debounce_ms,)
    }

    /// Polling parameters for merge-request branch detection.
    pub fn branch_poll(&self,) -> PollConfig
    {
        PollConfig {
            interval: Duration::from_millis(self.branch_poll_interval_ms,),
            timeout:  Duration::from_millis(self.branch_poll_timeout_ms,),
        }
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](Error::Validation) when the poll interval
    /// is zero or exceeds the timeout, or when the button prefix or label is
    /// unusable.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        if self.branch_poll_interval_ms == 0 {
            return Err(Error::validation("branch_poll_interval_ms must be greater than 0",),);
        }
        if self.branch_poll_interval_ms > self.branch_poll_timeout_ms {
            return Err(Error::validation(
                "branch_poll_interval_ms must not exceed branch_poll_timeout_ms",
            ),);
        }
        if self.button_id_prefix.is_empty() {
            return Err(Error::validation("button_id_prefix cannot be empty",),);
        }
        if self.button_id_prefix.chars().any(char::is_whitespace,) {
            return Err(Error::validation("button_id_prefix cannot contain whitespace",),);
        }
        if self.button_label.trim().is_empty() {
            return Err(Error::validation("button_label cannot be empty",),);
        }
        Ok((),)
    }
}

/// Loads settings from the YAML file at `path`.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the settings violate invariants.
pub fn load_settings(path: &Path,) -> Result<EngineSettings, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_settings(&contents,)
}

/// Parses settings from a YAML document string.
///
/// An empty document yields the defaults.
///
/// # Errors
///
/// Propagates [`Error::Parse`](Error::Parse) when the YAML cannot be decoded
/// and [`Error::Validation`](Error::Validation) when invariants fail.
pub fn parse_settings(contents: &str,) -> Result<EngineSettings, Error,>
{
    let settings = if contents.trim().is_empty() {
        EngineSettings::default()
    } else {
        serde_yaml::from_str::<EngineSettings,>(contents,)?
    };
    settings.validate()?;
    Ok(settings,)
}

fn default_debounce_ms() -> u64
{
    DEFAULT_DEBOUNCE_MS
}

fn default_branch_poll_interval_ms() -> u64
{
    DEFAULT_BRANCH_POLL_INTERVAL_MS
}

fn default_branch_poll_timeout_ms() -> u64
{
    DEFAULT_BRANCH_POLL_TIMEOUT_MS
}

fn default_button_id_prefix() -> String
{
    DEFAULT_BUTTON_ID_PREFIX.to_owned()
}

fn default_button_label() -> String
{
    DEFAULT_BUTTON_LABEL.to_owned()
}

fn deserialize_debounce_ms<'de, D,>(deserializer: D,) -> Result<u64, D::Error,>
where
    D: serde::Deserializer<'de,>,
{
    let value = u64::deserialize(deserializer,)?;
    if value == 0 || value > MAX_DEBOUNCE_MS {
        return Err(serde::de::Error::custom("debounce_ms must be between 1 and 10000",),);
    }
    Ok(value,)
}

fn deserialize_branch_poll_timeout_ms<'de, D,>(deserializer: D,) -> Result<u64, D::Error,>
where
    D: serde::Deserializer<'de,>,
{
    let value = u64::deserialize(deserializer,)?;
    if value > MAX_BRANCH_POLL_TIMEOUT_MS {
        return Err(serde::de::Error::custom("branch_poll_timeout_ms must not exceed 60000",),);
    }
    Ok(value,)
}

#[cfg(test)]
mod tests
{
    use std::{io::Write, time::Duration};

    use super::{EngineSettings, Error, load_settings, parse_settings};

    #[test]
    fn empty_document_yields_defaults()
    {
        let settings = parse_settings("   \n",).expect("expected defaults",);
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.debounce(), Duration::from_millis(300));
        assert_eq!(settings.branch_poll().interval, Duration::from_millis(100));
        assert_eq!(settings.branch_poll().timeout, Duration::from_millis(3000));
        assert_eq!(settings.button_id_prefix, "eons-open-btn-");
    }

    #[test]
    fn overrides_and_aliases_are_honoured()
    {
        let yaml = r"
            debounce_ms: 120
            poll_interval_ms: 50
            poll_timeout_ms: 500
            button_label: Launch
        ";

        let settings = parse_settings(yaml,).expect("expected overrides",);
        assert_eq!(settings.debounce_ms, 120);
        assert_eq!(settings.branch_poll_interval_ms, 50);
        assert_eq!(settings.branch_poll_timeout_ms, 500);
        assert_eq!(settings.button_label, "Launch");
        assert_eq!(settings.button_id_prefix, "eons-open-btn-");
    }

    #[test]
    fn rejects_out_of_range_debounce()
    {
        let error = parse_settings("debounce_ms: 0",).expect_err("expected range error",);
        match error {
            Error::Parse {
                ref source,
            } => {
                assert!(source.to_string().contains("debounce_ms must be between 1 and 10000"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_excessive_poll_timeout()
    {
        let error =
            parse_settings("branch_poll_timeout_ms: 120000",).expect_err("expected range error",);
        assert!(error.to_string().contains("must not exceed 60000"));
    }

    #[test]
    fn rejects_unknown_fields()
    {
        let result = parse_settings("debounce: 10",);
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn validate_reports_cross_field_violations()
    {
        let cases = [
            ("branch_poll_interval_ms: 0", "branch_poll_interval_ms must be greater than 0"),
            (
                "branch_poll_interval_ms: 500\nbranch_poll_timeout_ms: 100",
                "branch_poll_interval_ms must not exceed branch_poll_timeout_ms",
            ),
            ("button_id_prefix: ''", "button_id_prefix cannot be empty"),
            ("button_id_prefix: 'a b'", "button_id_prefix cannot contain whitespace"),
            ("button_label: '  '", "button_label cannot be empty"),
        ];

        for (yaml, expected,) in cases {
            let error = parse_settings(yaml,).expect_err("expected validation failure",);
            match error {
                Error::Validation {
                    message,
                } => assert_eq!(message, expected),
                other => panic!("expected validation error for {yaml:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_settings_reads_file()
    {
        let mut file = tempfile::NamedTempFile::new().expect("expected temp file",);
        write!(file, "debounce_ms: 75\n").expect("expected write to succeed",);

        let settings = load_settings(file.path(),).expect("expected load to succeed",);
        assert_eq!(settings.debounce_ms, 75);
    }

    #[test]
    fn load_settings_reports_io_errors()
    {
        let path = std::path::Path::new("/nonexistent/settings.yaml",);
        let error = load_settings(path,).expect_err("expected io error",);
        assert!(matches!(error, Error::Io { .. }));
    }
}
