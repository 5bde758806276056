//! A thread sized for evaluation.
//!
//! The interpreter, parser and structural comparisons recurse on the native
//! stack. Their nesting bounds ([`MAX_CALL_DEPTH`](crate::MAX_CALL_DEPTH) and
//! friends) are only reachable without overflowing when the thread has
//! [`EVAL_STACK_SIZE`] bytes of stack, which unoptimised builds need in full.

use std::{io, panic, thread};

/// Native stack reserved for the evaluation thread.
pub const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Run `work` to completion on a scoped thread with [`EVAL_STACK_SIZE`] of
/// stack. A panic in `work` resumes on the caller.
pub fn on_eval_stack<T, F>(work: F) -> io::Result<T>
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("tessera-eval".to_string())
            .stack_size(EVAL_STACK_SIZE)
            .spawn_scoped(scope, work)?;
        match handle.join() {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    })
}
