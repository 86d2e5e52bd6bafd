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


//! Time-stamp token content (RFC 3161).

use rasn::prelude::*;
use rasn_pkix::{AlgorithmIdentifier, Extensions, GeneralName};

/// Content type of a time-stamp token's encapsulated `TSTInfo`.
pub(crate) const ID_CT_TSTINFO: &str = "1.2.840.113549.1.9.16.1.4";

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct MessageImprint {
    pub(crate) hash_algorithm: AlgorithmIdentifier,
    pub(crate) hashed_message: OctetString,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct Accuracy {
    pub(crate) seconds: Option<Integer>,
    #[rasn(tag(0))]
    pub(crate) millis: Option<Integer>,
    #[rasn(tag(1))]
    pub(crate) micros: Option<Integer>,
}

#[derive(AsnType, Clone, Debug, Decode, Encode, PartialEq, Eq)]
pub(crate) struct TstInfo {
    pub(crate) version: Integer,
    pub(crate) policy: ObjectIdentifier,
    pub(crate) message_imprint: MessageImprint,
    pub(crate) serial_number: Integer,
    pub(crate) gen_time: GeneralizedTime,
    pub(crate) accuracy: Option<Accuracy>,
    #[rasn(default)]
    pub(crate) ordering: bool,
    pub(crate) nonce: Option<Integer>,
    #[rasn(tag(explicit(0)))]
    pub(crate) tsa: Option<GeneralName>,
    #[rasn(tag(1))]
    pub(crate) extensions: Option<Extensions>,
}
