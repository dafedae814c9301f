use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Previously visited directories, most recent last, capped at `capacity`.
#[derive(Debug)]
pub struct NavigationStack {
    paths: VecDeque<PathBuf>,
    capacity: usize,
}

impl NavigationStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            paths: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Push `from`, then run `load`. If `load` fails the stack is restored
    /// exactly, including an entry the push may have evicted.
    pub fn transition<T, E>(
        &mut self,
        from: &Path,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let evicted = self.push(from.to_path_buf());
        match load() {
            Ok(value) => Ok(value),
            Err(e) => {
                self.paths.pop_back();
                if let Some(oldest) = evicted {
                    self.paths.push_front(oldest);
                }
                debug!(from = %from.display(), "navigation rolled back");
                Err(e)
            }
        }
    }

    /// Pop the most recent directory; `None` when there is no history.
    pub fn pop(&mut self) -> Option<PathBuf> {
        self.paths.pop_back()
    }

    /// Push `path`, returning the oldest entry if the cap pushed it out.
    fn push(&mut self, path: PathBuf) -> Option<PathBuf> {
        let evicted = if self.paths.len() >= self.capacity {
            self.paths.pop_front()
        } else {
            None
        };
        self.paths.push_back(path);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(stack: &mut NavigationStack, from: &str) {
        stack
            .transition(Path::new(from), || Ok::<(), ()>(()))
            .unwrap();
    }

    #[test]
    fn back_after_n_enters_returns_to_origin() {
        let mut stack = NavigationStack::new(64);
        ok(&mut stack, "/a");
        ok(&mut stack, "/a/b");
        ok(&mut stack, "/a/b/c");
        assert_eq!(stack.pop(), Some(PathBuf::from("/a/b/c")));
        assert_eq!(stack.pop(), Some(PathBuf::from("/a/b")));
        assert_eq!(stack.pop(), Some(PathBuf::from("/a")));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn failed_transition_leaves_stack_unchanged() {
        let mut stack = NavigationStack::new(64);
        ok(&mut stack, "/a");
        let result = stack.transition(Path::new("/a/b"), || Err::<(), _>("denied"));
        assert_eq!(result, Err("denied"));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.pop(), Some(PathBuf::from("/a")));
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut stack = NavigationStack::new(2);
        ok(&mut stack, "/1");
        ok(&mut stack, "/2");
        ok(&mut stack, "/3");
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), Some(PathBuf::from("/3")));
        assert_eq!(stack.pop(), Some(PathBuf::from("/2")));
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn failed_transition_at_capacity_restores_evicted_entry() {
        let mut stack = NavigationStack::new(2);
        ok(&mut stack, "/1");
        ok(&mut stack, "/2");
        let _ = stack.transition(Path::new("/3"), || Err::<(), _>(()));
        assert_eq!(stack.pop(), Some(PathBuf::from("/2")));
        assert_eq!(stack.pop(), Some(PathBuf::from("/1")));
    }
}
