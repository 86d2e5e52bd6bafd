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

use std::fmt::Debug;

use log::{info, warn};

use crate::{LogItem, LogKind};

/// A `StatusTracker` is used in the verification logic of `sigpolicy` to
/// control error-handling behavior and aggregate log items as they are
/// generated.
#[derive(Debug, Default)]
pub struct StatusTracker {
    error_behavior: ErrorBehavior,
    logged_items: Vec<LogItem>,
    scopes: Vec<String>,
}

impl StatusTracker {
    /// Returns a [`StatusTracker`] with the specified [`ErrorBehavior`].
    pub fn with_error_behavior(error_behavior: ErrorBehavior) -> Self {
        Self {
            error_behavior,
            logged_items: vec![],
            scopes: vec![],
        }
    }

    /// Returns the configured [`ErrorBehavior`].
    pub fn error_behavior(&self) -> ErrorBehavior {
        self.error_behavior
    }

    /// Returns the current list of log items.
    pub fn logged_items(&self) -> &[LogItem] {
        &self.logged_items
    }

    /// Consumes the tracker and returns its log items.
    pub fn into_logged_items(self) -> Vec<LogItem> {
        self.logged_items
    }

    /// Appends the contents of another [`StatusTracker`] to this one.
    ///
    /// Items keep the kind and scope they were recorded with.
    pub fn append(&mut self, other: &StatusTracker) {
        self.logged_items
            .extend(other.logged_items().iter().cloned());
    }

    /// Adds a non-error [`LogItem`] to this status tracker.
    ///
    /// Primarily intended for use by [`LogItem::success()`]
    /// or [`LogItem::informational()`].
    pub fn add_non_error(&mut self, log_item: LogItem) {
        let log_item = self.apply_scope(log_item);
        if log_item.kind == LogKind::Failure {
            warn!("Validation failure (not thrown): {log_item:?}");
        } else {
            info!("Validation info: {log_item:?}");
        }
        self.logged_items.push(log_item);
    }

    /// Adds an error-case [`LogItem`] to this status tracker.
    ///
    /// Will return `Err(err)` if configured to stop immediately on errors or
    /// `Ok(err)` if configured to continue on errors. _(See [`ErrorBehavior`].)_
    ///
    /// Primarily intended for use by [`LogItem::failure()`].
    pub fn add_error<E>(&mut self, log_item: LogItem, err: E) -> Result<E, E> {
        let log_item = self.apply_scope(log_item);
        warn!("Validation failure: {log_item:?}");
        self.logged_items.push(log_item);

        match self.error_behavior {
            ErrorBehavior::StopOnFirstError => Err(err),
            ErrorBehavior::ContinueWhenPossible => Ok(err),
        }
    }

    /// Returns the [`LogItem`]s that have error conditions (`err_val` is
    /// populated).
    pub fn filter_errors(&self) -> impl Iterator<Item = &LogItem> {
        self.logged_items()
            .iter()
            .filter(|item| item.err_val.is_some())
    }

    /// Returns `true` if the log contains a specific validation status code.
    pub fn has_status(&self, val: &str) -> bool {
        self.logged_items().iter().any(|vi| {
            if let Some(vs) = &vi.validation_status {
                vs == val
            } else {
                false
            }
        })
    }

    /// Returns `true` if the log contains a specific error.
    pub fn has_error<E: Debug>(&self, err: E) -> bool {
        let err_type = format!("{:?}", &err);
        self.logged_items().iter().any(|vi| {
            if let Some(e) = &vi.err_val {
                e == &err_type
            } else {
                false
            }
        })
    }

    /// Returns `true` if the log contains any error.
    pub fn has_any_error(&self) -> bool {
        self.filter_errors().next().is_some()
    }

    /// Enters a verification scope, typically the signature or time stamp
    /// being verified.
    ///
    /// Items recorded while the scope is active are stamped with it.
    pub fn push_scope<S: Into<String>>(&mut self, scope: S) {
        self.scopes.push(scope.into());
    }

    /// Leaves the innermost verification scope.
    pub fn pop_scope(&mut self) -> Option<String> {
        self.scopes.pop()
    }

    /// Returns the innermost verification scope, if any.
    pub fn scope(&self) -> Option<&str> {
        self.scopes.last().map(|s| s.as_str())
    }

    fn apply_scope(&self, mut log_item: LogItem) -> LogItem {
        if log_item.scope.is_none() {
            if let Some(scope) = self.scopes.last() {
                log_item.scope = Some(scope.clone().into());
            }
        }
        log_item
    }
}

/// `ErrorBehavior` configures the behavior of [`StatusTracker`] when its
/// [`add_error`] function is called.
///
/// [`add_error`]: StatusTracker::add_error
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorBehavior {
    /// If an error is encountered, stop verification immediately.
    StopOnFirstError,

    /// If an error is encountered, log it and continue verification as much
    /// as possible.
    #[default]
    ContinueWhenPossible,
}
