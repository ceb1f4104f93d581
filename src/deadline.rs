// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Caller-supplied deadlines and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Error;

/// Bounds how long a store operation may run.
///
/// A `Deadline` combines an optional expiry instant with an optional
/// cancellation flag controlled through a [`Canceller`]. Store
/// operations check it before they start and while their statements
/// run, and fail with [`Error::Cancelled`] once it has passed.
#[derive(Clone, Debug, Default)]
pub struct Deadline {
    expires: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

/// A handle that cancels the [`Deadline`] it was created with (and all
/// clones of it).
#[derive(Clone, Debug)]
pub struct Canceller {
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self::default()
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// A deadline at `instant`.
    pub fn at(instant: Instant) -> Self {
        Self {
            expires: Some(instant),
            cancelled: None,
        }
    }

    /// Returns this deadline extended with a cancellation flag, along
    /// with the [`Canceller`] that sets it.
    pub fn with_canceller(self) -> (Self, Canceller) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let canceller = Canceller {
            cancelled: cancelled.clone(),
        };
        let deadline = Self {
            cancelled: Some(cancelled),
            ..self
        };
        (deadline, canceller)
    }

    /// Returns the time left before expiry, or `None` if there is no
    /// expiry instant. An expired deadline has zero time left.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }

    /// Returns whether the deadline has expired or been cancelled.
    pub fn is_expired(&self) -> bool {
        self.cancelled
            .as_ref()
            .map_or(false, |cancelled| cancelled.load(Ordering::Relaxed))
            || self.expires.map_or(false, |expires| Instant::now() >= expires)
    }

    /// Fails with [`Error::Cancelled`] if the deadline has expired or
    /// been cancelled.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_expired() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Canceller {
    /// Cancels the associated [`Deadline`].
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert!(deadline.check().is_ok());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn past_instants_are_expired() {
        let deadline = Deadline::at(Instant::now());
        assert!(deadline.is_expired());
        assert!(matches!(deadline.check(), Err(Error::Cancelled)));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn future_instants_are_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(3600));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().unwrap() > Duration::from_secs(3500));
    }

    #[test]
    fn cancellation_applies_to_clones() {
        let (deadline, canceller) = Deadline::none().with_canceller();
        let clone = deadline.clone();
        assert!(!clone.is_expired());
        canceller.cancel();
        assert!(deadline.is_expired());
        assert!(clone.is_expired());
    }
}
