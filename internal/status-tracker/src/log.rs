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

use std::{borrow::Cow, fmt::Debug};

use crate::StatusTracker;

/// Creates a [`LogItem`] struct that is annotated with the source file and line
/// number where the log condition was discovered.
///
/// Takes three parameters, each of which may be a `&'static str` or `String`:
///
/// * `label`: name of the object this `LogItem` refers to (typically an
///   attribute OID or a policy node path)
/// * `description`: human-readable reason for this `LogItem` to have been
///   generated
/// * `function`: name of the function generating this `LogItem`
///
/// ## Example
///
/// ```
/// # use std::borrow::Cow;
/// # use sigpolicy_status_tracker::{log_item, LogItem, LogKind};
/// let log = log_item!("1.2.840.113549.1.9.5", "signing time present", "verify");
///
/// assert_eq!(log.kind, LogKind::Informational);
/// assert_eq!(log.label, Cow::Borrowed("1.2.840.113549.1.9.5"));
/// assert_eq!(log.file, Cow::Borrowed(file!()));
/// assert!(log.line > 2);
/// ```
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::LogItem {
            kind: $crate::LogKind::Informational,
            label: $label.into(),
            crate_name: env!("CARGO_PKG_NAME").into(),
            crate_version: env!("CARGO_PKG_VERSION").into(),
            file: file!().into(),
            function: $function.into(),
            line: line!(),
            description: $description.into(),
            ..Default::default()
        }
    }};
}

/// Detailed information about an error or other noteworthy condition.
///
/// Use the [`log_item`](crate::log_item) macro to create a `LogItem`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogItem {
    /// Kind of log item.
    pub kind: LogKind,

    /// Attribute identifier, policy node path or other descriptive label.
    pub label: Cow<'static, str>,

    /// Description of the condition.
    pub description: Cow<'static, str>,

    /// Crate where the condition was detected.
    pub crate_name: Cow<'static, str>,

    /// Version of that crate.
    pub crate_version: Cow<'static, str>,

    /// Source file where the condition was detected.
    pub file: Cow<'static, str>,

    /// Function where the condition was detected.
    pub function: Cow<'static, str>,

    /// Source line number where the condition was detected.
    pub line: u32,

    /// Error value as string.
    pub err_val: Option<Cow<'static, str>>,

    /// Validation status code (see [`validation_codes`](crate::validation_codes)).
    pub validation_status: Option<Cow<'static, str>>,

    /// Verification scope (signature or time stamp) active when the item was
    /// recorded.
    pub scope: Option<Cow<'static, str>>,
}

impl Default for LogItem {
    fn default() -> Self {
        LogItem {
            kind: LogKind::Success,
            label: Cow::Borrowed(""),
            description: Cow::Borrowed(""),
            crate_name: env!("CARGO_PKG_NAME").into(),
            crate_version: env!("CARGO_PKG_VERSION").into(),
            file: Cow::Borrowed(""),
            function: Cow::Borrowed(""),
            line: 0,
            err_val: None,
            validation_status: None,
            scope: None,
        }
    }
}

impl LogItem {
    /// Add a validation status code.
    #[must_use]
    pub fn validation_status(self, status: &'static str) -> Self {
        LogItem {
            validation_status: Some(status.into()),
            ..self
        }
    }

    /// Set the verification scope explicitly.
    ///
    /// A scope set here is kept even if the [`StatusTracker`] has a scope of
    /// its own.
    #[must_use]
    pub fn set_scope<S: Into<String>>(self, scope: S) -> Self {
        LogItem {
            scope: Some(scope.into().into()),
            ..self
        }
    }

    /// Set the log item kind to [`LogKind::Success`] and add it to the
    /// [`StatusTracker`].
    pub fn success(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Success;
        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Informational`] and add it to the
    /// [`StatusTracker`].
    pub fn informational(mut self, tracker: &mut StatusTracker) {
        self.kind = LogKind::Informational;
        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Failure`] and add it to the
    /// [`StatusTracker`].
    ///
    /// Returns `Err(err)` if the tracker is configured to stop on the first
    /// error, or `Ok(err)` otherwise. The error value is available regardless
    /// of [`ErrorBehavior`](crate::ErrorBehavior).
    pub fn failure<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) -> Result<E, E> {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());
        tracker.add_error(self, err)
    }

    /// Set the log item kind to [`LogKind::Failure`] and add it to the
    /// [`StatusTracker`].
    ///
    /// Ignores the tracker's error-handling configuration.
    pub fn failure_no_throw<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());

        tracker.add_non_error(self);
    }

    /// Set the log item kind to [`LogKind::Failure`] and add it to the
    /// [`StatusTracker`].
    ///
    /// Always returns the passed error value so it can be propagated from
    /// closures with `map_err`.
    pub fn failure_as_err<E: Debug>(mut self, tracker: &mut StatusTracker, err: E) -> E {
        self.kind = LogKind::Failure;
        self.err_val = Some(format!("{err:?}").into());
        match tracker.add_error(self, err) {
            Ok(e) => e,
            Err(e) => e,
        }
    }
}

/// Descriptive nature of this [`LogItem`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogKind {
    /// This [`LogItem`] describes a success condition.
    Success,

    /// This [`LogItem`] describes an informational condition.
    Informational,

    /// This [`LogItem`] describes a failure or error condition.
    Failure,
}
