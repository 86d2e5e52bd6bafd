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

//! Time budget for external lookups.
//!
//! A [`Deadline`] is created once per verification call and threaded through
//! every component that may reach a [`ValidationStore`]. Each store call is
//! preceded by [`Deadline::check`] and receives the deadline so the store can
//! bound its own work.
//!
//! [`ValidationStore`]: crate::revocation::ValidationStore

use std::time::Duration;

use web_time::Instant;

/// A point in time after which lookups must not be started.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

/// Returned by [`Deadline::check`] when the deadline has passed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeadlineExceeded;

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { expires_at: None }
    }

    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now().checked_add(budget),
        }
    }

    /// A deadline at a fixed instant.
    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: Some(instant),
        }
    }

    /// Returns `true` if this deadline can expire.
    pub fn is_bounded(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Returns `true` if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }

    /// Time left before the deadline, or `None` if it is unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }

    /// Fails with [`DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> Result<(), DeadlineExceeded> {
        if self.is_expired() {
            Err(DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_bounded());
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
        deadline.check().unwrap();
    }

    #[test]
    fn past_instant_is_expired() {
        let deadline = Deadline::at(Instant::now());
        std::thread::sleep(Duration::from_millis(2));

        assert!(deadline.is_expired());
        assert_eq!(deadline.check(), Err(DeadlineExceeded));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn generous_budget_is_open() {
        let deadline = Deadline::after(Duration::from_secs(3600));
        assert!(deadline.is_bounded());
        deadline.check().unwrap();
        assert!(deadline.remaining().unwrap() > Duration::from_secs(3000));
    }
}
