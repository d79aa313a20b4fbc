//! Transaction management with snapshot isolation.
//!
//! StubDB transactions provide:
//! - **Snapshot reads**: a transaction reads a private deep copy of the
//!   store taken at begin; it sees neither later direct writes, nor other
//!   transactions' staged writes, nor its own staged writes
//! - **Staged writes**: puts and deletes are recorded and only applied to
//!   the live store at commit
//! - **Optimistic commit**: commit fails if *any* direct write happened
//!   since begin (whole-store generation check)
//!
//! Commits are not atomic across precondition failures: mutations applied
//! before a failing one stay applied.

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::Transaction;
