//! Testing utilities for the reconcile replay engine.
//!
//! Two pieces:
//!
//! - **builders**: one-line constructors for the saga's event envelopes,
//!   including double-wrapped variants for exercising payload normalization
//! - **[`ReplayTest`]**: a fluent Given-Then harness for replay runs
//!
//! # Example
//!
//! ```
//! use reconcile_testing::{builders, ReplayTest};
//!
//! ReplayTest::new()
//!     .given_events(vec![
//!         builders::hold_created("E1", "K", "H1", 3, 5),
//!         builders::hold_confirmed("E2", "K", "H1", 3),
//!     ])
//!     .then_state(|state| {
//!         assert_eq!(state.ledgers()["K"].confirmed_total(), 3);
//!     })
//!     .then_verdict(|verdict| {
//!         assert!(verdict.ok);
//!     })
//!     .run();
//! ```

pub mod builders;

use reconcile_core::{replay, ReplayState, UnmatchedHoldPolicy, Verdict, VecSource};
use reconcile_core::envelope::EventEnvelope;

/// Type alias for state assertion functions
type StateAssertion = Box<dyn FnOnce(&ReplayState)>;

/// Type alias for verdict assertion functions
type VerdictAssertion = Box<dyn FnOnce(&Verdict)>;

/// Fluent harness for replay tests with Given-Then syntax.
///
/// Folds the given envelopes through a fresh [`ReplayState`], evaluates the
/// verdict, and runs the registered assertions in order.
#[derive(Default)]
pub struct ReplayTest {
    policy: UnmatchedHoldPolicy,
    events: Vec<EventEnvelope>,
    state_assertions: Vec<StateAssertion>,
    verdict_assertions: Vec<VerdictAssertion>,
}

impl ReplayTest {
    /// Creates a harness with the default unmatched-hold policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the unmatched-hold policy for the run (Given).
    #[must_use]
    pub fn given_policy(mut self, policy: UnmatchedHoldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the event stream to fold (Given).
    #[must_use]
    pub fn given_events(mut self, events: Vec<EventEnvelope>) -> Self {
        self.events = events;
        self
    }

    /// Adds an assertion over the final replay state (Then).
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&ReplayState) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Adds an assertion over the evaluated verdict (Then).
    #[must_use]
    pub fn then_verdict<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Verdict) + 'static,
    {
        self.verdict_assertions.push(Box::new(assertion));
        self
    }

    /// Runs the replay and executes all assertions.
    ///
    /// # Panics
    ///
    /// Panics if the fold fails (a `VecSource` never does) or if any
    /// assertion fails.
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let source = VecSource::new(self.events);
        let state = replay(source, ReplayState::with_policy(self.policy))
            .expect("in-memory replay should not fail");
        let verdict = Verdict::evaluate(&state);

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.verdict_assertions {
            assertion(&verdict);
        }
    }
}
