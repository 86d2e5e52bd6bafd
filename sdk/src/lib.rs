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

#![deny(warnings)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

//! This library checks that a CAdES, XAdES or PAdES signature conforms to a
//! published signature policy.
//!
//! A policy document (DER or XML) is decoded into an immutable
//! [`SignaturePolicy`](policy::SignaturePolicy). The signature's attributes
//! are then checked against the rules the policy mandates: attribute
//! presence and uniqueness, revocation references reconciled against the
//! revocation evidence, and time-stamp tokens with their imprints and
//! ordering.
//!
//! # Example: Configuring a verifier
//!
//! ```
//! # use sigpolicy::Result;
//! use sigpolicy::{settings::Settings, verifier::SignatureVerifier};
//!
//! # fn main() -> Result<()> {
//! let settings = Settings::new().with_toml(
//!     r#"
//!     [verify]
//!     reject_unverified_policies = true
//!     lookup_timeout_ms = 2000
//!     "#,
//! )?;
//!
//! assert!(settings.verify.reject_unverified_policies);
//! let _verifier = SignatureVerifier::new(settings);
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Decoding a policy
//!
//! ```no_run
//! # use sigpolicy::Result;
//! use sigpolicy::policy;
//!
//! # fn main() -> Result<()> {
//! let bytes = std::fs::read("PA_AD_RB_v2_3.der")?;
//! let policy = policy::decode(&bytes, None)?;
//! println!("{}", policy.info.policy_id);
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod crypto;
pub mod deadline;
mod error;
pub use error::{Error, Result};
pub mod pades;
pub mod policy;
pub mod revocation;
pub mod settings;
pub mod signature;
pub mod time_stamp;
pub mod verifier;
pub(crate) mod utils;

pub use sigpolicy_status_tracker::{
    log_item, validation_codes, ErrorBehavior, LogItem, LogKind, StatusTracker,
};
