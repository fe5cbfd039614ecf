//! Runtime invariant checks with contract coverage.
//!
//! Production code asserts invariants with [`check_invariant!`]; every
//! check is recorded per thread so tests can demand that a scenario
//! actually exercised the invariants it claims to cover.
//!
//! ```rust,ignore
//! check_invariant!(outstanding.is_none(), ONE_OUTSTANDING_COMMAND, "orchestrator");
//!
//! #[test]
//! fn contract_camera_commands() {
//!     run_scenario();
//!     assert_contract("camera commands", &[ONE_OUTSTANDING_COMMAND]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeSet;

/// No tracked camera command is issued while another is in flight.
pub const ONE_OUTSTANDING_COMMAND: &str = "at most one outstanding camera command";
/// Timers and completions act only under the generation that created them.
pub const CURRENT_GENERATION_ONLY: &str = "deferred events act only on their own generation";
/// Every return to idle leaves exposure unlocked and zoom at 1.0.
pub const CAMERA_RESTORED_ON_IDLE: &str = "camera state restored on return to idle";

thread_local! {
    static CHECKED: RefCell<BTreeSet<&'static str>> = const { RefCell::new(BTreeSet::new()) };
}

/// Assert an invariant and record that it was checked.
///
/// Panics with the invariant name and context when the condition is false.
#[macro_export]
macro_rules! check_invariant {
    ($condition:expr, $name:expr) => {
        $crate::invariants::record($condition, $name, "unknown")
    };
    ($condition:expr, $name:expr, $context:expr) => {
        $crate::invariants::record($condition, $name, $context)
    };
}

#[doc(hidden)]
pub fn record(condition: bool, name: &'static str, context: &str) {
    CHECKED.with(|c| {
        c.borrow_mut().insert(name);
    });
    if !condition {
        panic!("invariant violated in {}: {}", context, name);
    }
}

/// Invariants checked on this thread so far.
pub fn checked() -> Vec<&'static str> {
    CHECKED.with(|c| c.borrow().iter().copied().collect())
}

/// Forget everything recorded on this thread.
pub fn reset() {
    CHECKED.with(|c| c.borrow_mut().clear());
}

/// Panic unless every invariant in `required` was checked on this thread.
pub fn assert_contract(scenario: &str, required: &[&str]) {
    let seen = checked();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|r| !seen.contains(r))
        .collect();
    if !missing.is_empty() {
        panic!(
            "contract '{}' not exercised; missing invariants: {:?}",
            scenario, missing
        );
    }
}
