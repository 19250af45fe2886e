//! simbook services - The phonebook access layer.
//!
//! This crate turns asynchronous card completions into a synchronous
//! record API:
//! - Synchronous bridge (shared lock + condition variable, broadcast wake,
//!   per-call completion tokens, dispatch-context guard)
//! - Card application tracker (selection survives refresh when possible,
//!   card generation classification)
//! - Record-cache facade (issue paths, auth-code rule, synchronous counts)
//! - Phonebook manager (capability-gated public operations)
//! - Simulated modem (in-memory card with a real dispatch thread, used by
//!   the CLI and tests)

pub mod bridge;
pub mod cache;
pub mod card;
pub mod phonebook;
pub mod sim;
pub mod store;

// Re-export key types
pub use bridge::{Bridge, Completion, Pending};
pub use card::{select_application, CardTracker, Selection, UiccCard, UiccCardApplication};
pub use phonebook::{AllowAll, Permission, PermissionChecker, PhonebookManager};
pub use sim::{SimCardProfile, SimModem};
pub use store::{CardStore, CountKind, SlotCounts};
