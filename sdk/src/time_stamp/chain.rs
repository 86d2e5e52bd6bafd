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

//! Ordering of nested time stamps.

use super::{TimeStampError, TimeStampRecord};

/// A time stamp with its position in a chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainEntry {
    pub record: TimeStampRecord,

    /// `true` for the innermost time stamp, the one every later time stamp
    /// covers.
    pub is_last: bool,
}

/// Sorts archive time stamps by generation time and marks the earliest one
/// as the last of the chain.
///
/// Two records sharing the earliest generation time make the chain
/// ambiguous.
pub fn order_and_mark_last(
    mut records: Vec<TimeStampRecord>,
) -> Result<Vec<ChainEntry>, TimeStampError> {
    records.sort_by_key(|r| r.gen_time);

    if let [first, second, ..] = records.as_slice() {
        if first.gen_time == second.gen_time {
            return Err(TimeStampError::AmbiguousChain(format!(
                "two time stamps generated at {}",
                first.gen_time
            )));
        }
    }

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(i, record)| ChainEntry {
            record,
            is_last: i == 0,
        })
        .collect())
}

/// Orders document time stamps from the outermost to the innermost.
///
/// A document time stamp covers every byte before it, so the one whose byte
/// range ends furthest into the file wraps all others.
pub fn order_by_byte_range(
    records: Vec<TimeStampRecord>,
) -> Result<Vec<TimeStampRecord>, TimeStampError> {
    let mut keyed = records
        .into_iter()
        .map(|r| match r.byte_range {
            Some(range) => Ok((range.end_offset(), r)),
            None => Err(TimeStampError::DecodeError(format!(
                "{} time stamp #{} has no byte range",
                r.kind, r.occurrence
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
    if let Some(pair) = keyed.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(TimeStampError::AmbiguousChain(format!(
            "two time stamps end at offset {}",
            pair[0].0
        )));
    }

    Ok(keyed.into_iter().map(|(_, r)| r).collect())
}
