// Copyright 2024 Adobe. All rights reserved.
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


//! Attribute validation.
//!
//! [`AttributeValidationEngine`] checks the attributes of a signature
//! against the rules of a decoded policy. Every attribute is dispatched
//! through the closed [`AttributeKind`] registry; revocation references and
//! time stamps are handed to the [`revocation`](crate::revocation) and
//! [`time_stamp`](crate::time_stamp) modules.

mod engine;
mod registry;
mod validators;

use serde::{Serialize, Serializer};
use thiserror::Error;

pub use self::{
    engine::{AttributeValidation, AttributeValidationEngine},
    registry::AttributeKind,
};
use crate::validation_codes::{
    ATTRIBUTE_DUPLICATED, ATTRIBUTE_INVALID, ATTRIBUTE_MISSING, ATTRIBUTE_UNKNOWN,
};

/// Describes why an attribute was rejected.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum AttributeError {
    #[error("mandated attribute {identifier} is missing")]
    Missing { identifier: String },

    #[error("attribute {identifier} occurs {count} times but may occur once")]
    Duplicated { identifier: String, count: usize },

    #[error("unknown attribute {identifier}")]
    Unknown { identifier: String },

    #[error("attribute {identifier} is invalid: {reason}")]
    Invalid { identifier: String, reason: String },

    /// A signed attribute failed validation. Ends the run.
    #[error("signed attribute {identifier} is invalid: {reason}")]
    Critical { identifier: String, reason: String },
}

impl AttributeError {
    /// Validation status code logged for this error.
    pub fn validation_status(&self) -> &'static str {
        match self {
            Self::Missing { .. } => ATTRIBUTE_MISSING,
            Self::Duplicated { .. } => ATTRIBUTE_DUPLICATED,
            Self::Unknown { .. } => ATTRIBUTE_UNKNOWN,
            Self::Invalid { .. } | Self::Critical { .. } => ATTRIBUTE_INVALID,
        }
    }
}

/// Result of checking one attribute occurrence, or one mandated attribute
/// that is absent.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AttributeOutcome {
    /// Dotted OID, or the name the policy mandated it under.
    pub identifier: String,
    pub kind: Option<AttributeKind>,

    /// Position among the attributes with the same identifier.
    pub occurrence: usize,

    #[serde(serialize_with = "serialize_error")]
    pub error: Option<AttributeError>,
    pub message: Option<String>,

    /// `true` for signed attributes.
    pub critical: bool,

    /// `true` if the policy mandates the attribute.
    pub mandated: bool,
}

impl AttributeOutcome {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns `true` if this outcome makes the signature invalid rather
    /// than valid with warnings.
    pub fn invalidates(&self) -> bool {
        self.is_error() && (self.critical || self.mandated)
    }
}

fn serialize_error<S: Serializer>(err: &Option<AttributeError>, s: S) -> Result<S::Ok, S::Error> {
    match err {
        Some(err) => s.collect_str(err),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests;
