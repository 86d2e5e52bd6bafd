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

use thiserror::Error;

use crate::{
    attributes::AttributeError, policy::PolicyError, revocation::CrossRefError,
    time_stamp::TimeStampError,
};

/// `Error` enumerates errors returned by most signature policy verification
/// operations.
///
/// Each variant names the component the failure originated in so callers can
/// tell policy, attribute, revocation and time-stamp failures apart.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The policy could not be decoded or failed its integrity check.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// A critical attribute failed validation.
    #[error(transparent)]
    Attribute(#[from] AttributeError),

    /// Revocation references could not be reconciled with the evidence.
    #[error(transparent)]
    Revocation(#[from] CrossRefError),

    /// A time-stamp token failed verification.
    #[error(transparent)]
    TimeStamp(#[from] TimeStampError),

    /// The caller-supplied deadline passed before verification finished.
    #[error("verification deadline exceeded")]
    DeadlineExceeded,

    #[error("settings error: {0}")]
    Settings(String),

    #[error("bad parameter: {0}")]
    BadParam(String),

    #[error("the signature structure could not be read: {0}")]
    SignatureStructure(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// A specialized `Result` type for signature policy operations.
pub type Result<T> = std::result::Result<T, Error>;
