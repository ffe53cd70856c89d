//! Integration test driver for `tests/integration/` submodules.
//!
//! Every test builds a full `Scheduler` over mock hardware, a manual
//! clock and the in-memory broker, then drives it tick by tick. All tests
//! run on the host with no real hardware required.

mod access_tests;
mod indicator_tests;
mod mock_hw;
mod scheduler_tests;
mod task_tests;
