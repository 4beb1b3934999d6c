//! Queue state guarded by the queue's single mutex.

use std::collections::VecDeque;

use crate::domain::Task;

/// Processing loop state.
///
/// State transitions:
/// - Idle -> Draining: hydrated and a non-empty queue is available
/// - Draining -> Idle: the loop found the queue empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Idle,
    Draining,
}

/// The task list and the draining flag live under one lock.
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub tasks: VecDeque<Task>,
    pub loop_state: LoopState,
    /// Set once the persisted slot has been loaded. Until then nothing is
    /// written back and no loop is started.
    pub hydrated: bool,
    /// Set when the slot could not be read at hydration. The previous
    /// process's tasks may still be in it, so it is never overwritten.
    pub persistence_disabled: bool,
}

impl QueueState {
    /// Flip Idle -> Draining if a loop should start now.
    pub fn try_begin_drain(&mut self) -> bool {
        if self.hydrated && self.loop_state == LoopState::Idle && !self.tasks.is_empty() {
            self.loop_state = LoopState::Draining;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::UserUpdateTask;

    fn task() -> Task {
        UserUpdateTask {
            time: Utc::now(),
            id: "u".into(),
            app_id: "a".into(),
            device: "d".into(),
            os: "o".into(),
            bundle_id: "b".into(),
            debug_flags: 0,
            version: "1".into(),
            language: "en".into(),
        }
        .into()
    }

    #[test]
    fn no_drain_before_hydration() {
        let mut state = QueueState::default();
        state.tasks.push_back(task());
        assert!(!state.try_begin_drain());
        assert_eq!(state.loop_state, LoopState::Idle);
    }

    #[test]
    fn no_drain_on_empty_queue() {
        let mut state = QueueState {
            hydrated: true,
            ..Default::default()
        };
        assert!(!state.try_begin_drain());
    }

    #[test]
    fn only_one_drain_at_a_time() {
        let mut state = QueueState {
            hydrated: true,
            ..Default::default()
        };
        state.tasks.push_back(task());
        assert!(state.try_begin_drain());
        assert!(!state.try_begin_drain());
        assert_eq!(state.loop_state, LoopState::Draining);
    }
}
