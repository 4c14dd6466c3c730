use strum::Display;
use tokio::sync::watch;

/// Where a chat session is in its request cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum ChatPhase {
    /// Ready to accept a submission
    #[default]
    Idle,
    /// Request sent, waiting for the backend to accept it
    Submitting,
    /// Reply is arriving
    Streaming,
    /// The turn failed; the failure notice is being recorded
    Failed,
}

impl ChatPhase {
    pub fn is_busy(self) -> bool {
        self != ChatPhase::Idle
    }
}

/// Exclusive hold on a session's busy state.
///
/// Only obtainable while the session is idle, and the only way to move the phase
/// forward. Dropping it returns the session to [`ChatPhase::Idle`], whichever way the
/// turn ended.
#[derive(Debug)]
pub(crate) struct BusyGuard<'a> {
    phase: &'a watch::Sender<ChatPhase>,
}

impl<'a> BusyGuard<'a> {
    /// Move from `Idle` to `Submitting`, or return `None` if a turn is already running
    pub(crate) fn acquire(phase: &'a watch::Sender<ChatPhase>) -> Option<Self> {
        let acquired = phase.send_if_modified(|current| {
            if current.is_busy() {
                false
            } else {
                *current = ChatPhase::Submitting;
                true
            }
        });

        acquired.then(|| {
            log::debug!("chat phase: Idle -> Submitting");
            Self { phase }
        })
    }

    pub(crate) fn streaming(&mut self) {
        self.transition(ChatPhase::Streaming);
    }

    pub(crate) fn fail(&mut self) {
        self.transition(ChatPhase::Failed);
    }

    fn transition(&mut self, next: ChatPhase) {
        let previous = self.phase.send_replace(next);
        log::debug!("chat phase: {previous} -> {next}");
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let previous = self.phase.send_replace(ChatPhase::Idle);
        log::debug!("chat phase: {previous} -> Idle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_and_released_on_drop() {
        let (phase, _rx) = watch::channel(ChatPhase::Idle);

        let mut guard = BusyGuard::acquire(&phase).unwrap();
        assert_eq!(*phase.borrow(), ChatPhase::Submitting);
        assert!(BusyGuard::acquire(&phase).is_none());

        guard.streaming();
        assert_eq!(*phase.borrow(), ChatPhase::Streaming);
        assert!(BusyGuard::acquire(&phase).is_none());

        drop(guard);
        assert_eq!(*phase.borrow(), ChatPhase::Idle);
        assert!(BusyGuard::acquire(&phase).is_some());
    }

    #[test]
    fn test_failed_phase_is_busy_until_released() {
        let (phase, _rx) = watch::channel(ChatPhase::Idle);
        {
            let mut guard = BusyGuard::acquire(&phase).unwrap();
            guard.fail();
            assert!(phase.borrow().is_busy());
        }
        assert!(!phase.borrow().is_busy());
    }
}
