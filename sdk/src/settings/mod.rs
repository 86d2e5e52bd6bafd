// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Configuration for signature policy verification.
//!
//! Settings are plain values owned by the caller. They are loaded by
//! overlaying JSON or TOML fragments on top of the defaults and are never
//! stored in global or thread-local state.

#[cfg(feature = "file_io")]
use std::path::Path;

use config::{Config, FileFormat};
use serde_derive::{Deserialize, Serialize};

use crate::{deadline::Deadline, Error, ErrorBehavior, Result};

const VERSION: u32 = 1;

// trait used to validate user input to make sure user supplied configurations are valid
pub(crate) trait SettingsValidate {
    // returns error if settings are invalid
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Settings to configure additional trust anchors.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Trust {
    /// Additional trust anchor certificates as a PEM bundle.
    ///
    /// These anchors are offered to time-stamp path building alongside the
    /// trust points declared by the policy itself.
    pub user_anchors: Option<String>,
}

impl Trust {
    /// Returns the DER encoding of every certificate in
    /// [`user_anchors`](Trust::user_anchors).
    pub fn user_anchor_ders(&self) -> Result<Vec<Vec<u8>>> {
        match &self.user_anchors {
            Some(pems) => load_trust_from_data(pems.as_bytes()),
            None => Ok(Vec::new()),
        }
    }
}

// load PEMs
fn load_trust_from_data(trust_data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut certs = Vec::new();

    // allow for JSON-encoded PEMs with \n
    let trust_data = String::from_utf8_lossy(trust_data)
        .replace("\\n", "\n")
        .into_bytes();
    for pem_result in x509_parser::pem::Pem::iter_from_buffer(&trust_data) {
        let pem =
            pem_result.map_err(|e| Error::Settings(format!("invalid trust anchor PEM: {e}")))?;
        certs.push(pem.contents);
    }
    Ok(certs)
}

impl SettingsValidate for Trust {
    fn validate(&self) -> Result<()> {
        if let Some(anchors) = &self.user_anchors {
            if load_trust_from_data(anchors.as_bytes())?.is_empty() {
                return Err(Error::Settings(
                    "user_anchors contains no certificates".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Settings to configure core features.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Core {
    /// Commitment type OID whose rules are applied when the signature does
    /// not declare a commitment type of its own.
    ///
    /// When `None`, only the policy's common rules and any commitment rule
    /// selecting the empty commitment apply.
    pub default_commitment: Option<String>,

    /// Tolerance in seconds applied when comparing signing times against the
    /// policy's signing period and certificate validity windows.
    ///
    /// The default value is 0.
    pub clock_skew_secs: i64,
}

impl SettingsValidate for Core {
    fn validate(&self) -> Result<()> {
        if self.clock_skew_secs < 0 {
            return Err(Error::Settings(
                "clock_skew_secs must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Settings to configure the verification process.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Verify {
    /// Whether to recompute and compare the policy's self-integrity digest.
    ///
    /// The default value is true.
    ///
    /// <div class="warning">
    /// Disabling the integrity check means a tampered policy is accepted. This option should
    /// only be used for development or testing.
    /// </div>
    pub check_policy_integrity: bool,

    /// Whether decoding fails for policies whose integrity cannot be checked,
    /// such as XML policies or DER policies without a declared digest.
    ///
    /// The default value is false.
    pub reject_unverified_policies: bool,

    /// Whether to check that time-stamp signer certificates chain to a
    /// time-stamp trust point of the policy.
    ///
    /// The default value is true.
    pub verify_timestamp_trust: bool,

    /// Whether verification stops at the first failure instead of recording
    /// it and continuing.
    ///
    /// The default value is false.
    pub stop_on_first_error: bool,

    /// Budget in milliseconds for all certificate, CRL and OCSP lookups made
    /// while verifying one signature.
    ///
    /// `None` (default) means lookups are not bounded.
    pub lookup_timeout_ms: Option<u64>,
}

impl Default for Verify {
    fn default() -> Self {
        Self {
            check_policy_integrity: true,
            reject_unverified_policies: false,
            verify_timestamp_trust: true,
            stop_on_first_error: false,
            lookup_timeout_ms: None,
        }
    }
}

impl Verify {
    /// Returns a [`Deadline`] starting now with the configured lookup budget.
    pub fn lookup_deadline(&self) -> Deadline {
        match self.lookup_timeout_ms {
            Some(ms) => Deadline::after(std::time::Duration::from_millis(ms)),
            None => Deadline::none(),
        }
    }

    /// How a [`StatusTracker`](crate::StatusTracker) should react to
    /// failures.
    pub fn error_behavior(&self) -> ErrorBehavior {
        if self.stop_on_first_error {
            ErrorBehavior::StopOnFirstError
        } else {
            ErrorBehavior::ContinueWhenPossible
        }
    }
}

impl SettingsValidate for Verify {
    fn validate(&self) -> Result<()> {
        if self.lookup_timeout_ms == Some(0) {
            return Err(Error::Settings(
                "lookup_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for configuring all aspects of signature policy verification.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Version of the configuration.
    pub version: u32,
    /// Settings for configuring additional trust anchors.
    pub trust: Trust,
    /// Settings for configuring core features.
    pub core: Core,
    /// Settings for configuring verification.
    pub verify: Verify,
}

impl Settings {
    /// Creates a new `Settings` instance with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sigpolicy::settings::Settings;
    /// let settings = Settings::new();
    /// assert!(settings.verify.check_policy_integrity);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from JSON string using the builder pattern.
    ///
    /// The JSON configuration is overlaid on top of this `Settings` instance.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sigpolicy::settings::Settings;
    /// # fn main() -> sigpolicy::Result<()> {
    /// let settings = Settings::new().with_json(r#"{"verify": {"stop_on_first_error": true}}"#)?;
    /// assert!(settings.verify.stop_on_first_error);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_json(self, json: &str) -> Result<Self> {
        self.with_string(json, "json")
    }

    /// Load settings from TOML string using the builder pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sigpolicy::settings::Settings;
    /// # fn main() -> sigpolicy::Result<()> {
    /// let settings = Settings::new().with_toml(
    ///     r#"
    ///         [core]
    ///         clock_skew_secs = 30
    ///     "#,
    /// )?;
    /// assert_eq!(settings.core.clock_skew_secs, 30);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_toml(self, toml: &str) -> Result<Self> {
        self.with_string(toml, "toml")
    }

    /// Load settings from a file using the builder pattern.
    ///
    /// The file format (JSON or TOML) is inferred from the file extension.
    #[cfg(feature = "file_io")]
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .ok_or(Error::BadParam(
                "settings file must have json or toml extension".into(),
            ))?
            .to_str()
            .ok_or(Error::BadParam("invalid settings file name".into()))?;
        let setting_buf = std::fs::read(path).map_err(Error::IoError)?;
        self.with_string(&String::from_utf8_lossy(&setting_buf), ext)
    }

    fn with_string(self, settings_str: &str, format: &str) -> Result<Self> {
        let f = match format.to_lowercase().as_str() {
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            _ => {
                return Err(Error::BadParam(format!(
                    "unsupported settings format: {format}"
                )))
            }
        };

        let current_config = Config::try_from(&self).map_err(|e| Error::Settings(e.to_string()))?;

        let updated_config = Config::builder()
            .add_source(current_config)
            .add_source(config::File::from_str(settings_str, f))
            .build()
            .map_err(|_e| Error::BadParam("could not parse configuration".into()))?;

        let settings = updated_config
            .try_deserialize::<Settings>()
            .map_err(|e| Error::BadParam(e.to_string()))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Sets a value at the specified dot-separated path using the builder
    /// pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sigpolicy::settings::Settings;
    /// # fn main() -> sigpolicy::Result<()> {
    /// let settings = Settings::default()
    ///     .with_value("verify.reject_unverified_policies", true)?
    ///     .with_value("core.default_commitment", "1.2.840.113549.1.9.16.6.1")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_value<T: Into<config::Value>>(self, path: &str, value: T) -> Result<Self> {
        let config = Config::try_from(&self).map_err(|e| Error::Settings(e.to_string()))?;

        let updated_config = Config::builder()
            .add_source(config)
            .set_override(path, value)
            .map_err(|e| Error::BadParam(format!("Invalid path '{path}': {e}")))?
            .build()
            .map_err(|e| Error::Settings(e.to_string()))?;

        let updated_settings = updated_config
            .try_deserialize::<Settings>()
            .map_err(|e| Error::BadParam(format!("Invalid value for '{path}': {e}")))?;

        updated_settings.validate()?;

        Ok(updated_settings)
    }

    /// Gets a value at the specified dot-separated path.
    pub fn get_value<'de, T: serde::de::Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let config = Config::try_from(self).map_err(|e| Error::Settings(e.to_string()))?;

        config
            .get::<T>(path)
            .map_err(|e| Error::BadParam(format!("Failed to get value at '{path}': {e}")))
    }

    /// Serializes these settings into a toml string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Settings(e.to_string()))
    }

    /// Serializes these settings into a pretty (formatted) toml string.
    pub fn to_pretty_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Settings(e.to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: VERSION,
            trust: Default::default(),
            core: Default::default(),
            verify: Default::default(),
        }
    }
}

impl SettingsValidate for Settings {
    fn validate(&self) -> Result<()> {
        if self.version > VERSION {
            return Err(Error::Settings("settings version too new".into()));
        }
        self.trust.validate()?;
        self.core.validate()?;
        self.verify.validate()
    }
}
