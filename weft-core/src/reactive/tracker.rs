//! Dependency Tracker
//!
//! The tracker is what makes computed properties work without declared
//! dependencies. While a getter runs inside [`DependencyTracker::detect`],
//! every property read on a record flows through
//! [`DependencyTracker::note_read`], and the tracker records the property
//! name in the innermost active frame. When the getter returns, the frame
//! holds exactly the set of properties the getter actually read on this
//! evaluation.
//!
//! # Nesting
//!
//! Frames form a stack, so a computed getter that reads another computed
//! property works: the inner evaluation pushes its own frame, and the reads
//! it performs are attributed to that inner frame only. The outer frame sees
//! the inner *property* being read, not the inner getter's own reads.
//!
//! # Confinement
//!
//! The frame stack is interior-mutable state owned by one tracker instance,
//! shared down a record tree via `Rc`. `Rc` keeps the whole tree `!Send`,
//! which confines the stack to a single execution context by construction.
//!
//! # Panic Safety
//!
//! `detect` pops its frame through a drop guard, so a getter that panics
//! cannot leave a stale frame behind and corrupt tracking for the rest of
//! the process.

use std::cell::RefCell;

use indexmap::IndexSet;

/// One recording frame: the property names read while it was the top of the
/// stack, in read order.
#[derive(Default)]
struct Frame {
    reads: IndexSet<String>,
}

/// Records which properties are read during the evaluation of a function.
#[derive(Default)]
pub struct DependencyTracker {
    frames: RefCell<Vec<Frame>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a recording frame is currently active.
    pub fn is_active(&self) -> bool {
        !self.frames.borrow().is_empty()
    }

    /// Mark `property` as read in the innermost active frame.
    ///
    /// No-op when no frame is active; reads outside of detection are simply
    /// not recorded, never an error.
    pub fn note_read(&self, property: &str) {
        if let Some(frame) = self.frames.borrow_mut().last_mut() {
            frame.reads.insert(property.to_owned());
        }
    }

    /// Run `f` inside a fresh recording frame and return its result together
    /// with the property names read while the frame was topmost, in read
    /// order.
    pub fn detect<R>(&self, f: impl FnOnce() -> R) -> (R, Vec<String>) {
        self.frames.borrow_mut().push(Frame::default());
        let guard = FrameGuard {
            frames: &self.frames,
        };

        let value = f();

        let deps = {
            let frames = guard.frames.borrow();
            let frame = frames.last().expect("frame pushed above is still live");
            frame.reads.iter().cloned().collect()
        };
        drop(guard);
        (value, deps)
    }
}

/// Pops the frame pushed by `detect` when dropped.
///
/// This is what keeps the stack balanced when the detected function panics.
struct FrameGuard<'a> {
    frames: &'a RefCell<Vec<Frame>>,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.frames.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn reads_outside_a_frame_are_ignored() {
        let tracker = DependencyTracker::new();
        assert!(!tracker.is_active());
        tracker.note_read("price");
        assert!(!tracker.is_active());
    }

    #[test]
    fn detect_collects_reads_in_order() {
        let tracker = DependencyTracker::new();

        let (value, deps) = tracker.detect(|| {
            tracker.note_read("price");
            tracker.note_read("count");
            tracker.note_read("price");
            42
        });

        assert_eq!(value, 42);
        assert_eq!(deps, vec!["price".to_owned(), "count".to_owned()]);
        assert!(!tracker.is_active());
    }

    #[test]
    fn nested_frames_record_independently() {
        let tracker = DependencyTracker::new();

        let (_, outer_deps) = tracker.detect(|| {
            tracker.note_read("outer");
            let (_, inner_deps) = tracker.detect(|| {
                tracker.note_read("inner");
            });
            assert_eq!(inner_deps, vec!["inner".to_owned()]);
        });

        // Reads made while the inner frame was topmost are not re-recorded
        // in the outer frame.
        assert_eq!(outer_deps, vec!["outer".to_owned()]);
    }

    #[test]
    fn frame_is_popped_when_the_function_panics() {
        let tracker = DependencyTracker::new();

        let result = catch_unwind(AssertUnwindSafe(|| {
            tracker.detect(|| -> i32 {
                tracker.note_read("doomed");
                panic!("getter failed");
            })
        }));

        assert!(result.is_err());
        assert!(!tracker.is_active());

        // Tracking still works after the failed evaluation.
        let (_, deps) = tracker.detect(|| tracker.note_read("next"));
        assert_eq!(deps, vec!["next".to_owned()]);
    }
}
