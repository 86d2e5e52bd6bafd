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

use std::fmt::{self, Display, Formatter};

use crate::{log_item, validation_codes, ErrorBehavior, StatusTracker};

#[test]
fn aggregates_errors() {
    let mut tracker = StatusTracker::default();

    // Add an item without an error.
    log_item!("test1", "test item 1", "test func").success(&mut tracker);

    // Add another item with an error. Should not stop.
    log_item!("test2", "test item 1", "test func")
        .failure(&mut tracker, SampleError {})
        .unwrap();

    assert_eq!(tracker.logged_items().len(), 2);
    assert_eq!(tracker.filter_errors().count(), 1);
    assert!(tracker.has_any_error());
}

#[test]
fn stops_on_first_error() {
    let mut tracker = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

    let result = log_item!("test", "failed", "test func").failure(&mut tracker, SampleError {});

    assert!(result.is_err());
    assert_eq!(tracker.logged_items().len(), 1);
}

#[test]
fn failure_no_throw_ignores_behavior() {
    let mut tracker = StatusTracker::with_error_behavior(ErrorBehavior::StopOnFirstError);

    log_item!("test", "failed", "test func").failure_no_throw(&mut tracker, SampleError {});

    assert!(tracker.has_error(SampleError {}));
}

#[test]
fn has_status() {
    let mut tracker = StatusTracker::default();

    log_item!("crl", "reference missing", "match_references")
        .validation_status(validation_codes::REVOCATION_REFERENCE_MISSING)
        .failure_no_throw(&mut tracker, SampleError {});

    assert!(tracker.has_status(validation_codes::REVOCATION_REFERENCE_MISSING));
    assert!(!tracker.has_status(validation_codes::REVOCATION_REFERENCE_EXCESS));
}

#[test]
fn scopes_are_stamped() {
    let mut tracker = StatusTracker::default();

    log_item!("a", "outside", "test").informational(&mut tracker);

    tracker.push_scope("signature");
    tracker.push_scope("signature time stamp");
    log_item!("b", "inner", "test").informational(&mut tracker);
    assert_eq!(tracker.pop_scope().as_deref(), Some("signature time stamp"));
    log_item!("c", "outer", "test").informational(&mut tracker);
    tracker.pop_scope();

    let scopes: Vec<Option<&str>> = tracker
        .logged_items()
        .iter()
        .map(|i| i.scope.as_deref())
        .collect();

    assert_eq!(
        scopes,
        vec![None, Some("signature time stamp"), Some("signature")]
    );
    assert_eq!(tracker.scope(), None);
}

#[test]
fn append_keeps_items() {
    let mut outer = StatusTracker::default();
    let mut inner = StatusTracker::default();
    inner.push_scope("time stamp");

    log_item!("x", "inner failure", "test").failure_no_throw(&mut inner, SampleError {});
    outer.append(&inner);

    assert_eq!(outer.logged_items().len(), 1);
    assert_eq!(outer.logged_items()[0].scope.as_deref(), Some("time stamp"));
    assert_eq!(inner.into_logged_items().len(), 1);
}

#[derive(Debug)]
struct SampleError {}

impl Display for SampleError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "SampleError")
    }
}
