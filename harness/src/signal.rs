//! Stop signal shared by the driver and sampler loops

use std::sync::atomic::{AtomicBool, Ordering};

/// Write-once flag ending a collection session.
///
/// Transitions at most once from unset to set and never resets.
#[derive(Debug, Default)]
pub struct StopSignal {
    raised: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` only for the call that set it.
    pub fn raise(&self) -> bool {
        !self.raised.swap(true, Ordering::AcqRel)
    }

    /// Whether the flag has been set
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_raise_once() {
        let signal = StopSignal::new();
        assert!(!signal.is_raised());
        assert!(signal.raise());
        assert!(signal.is_raised());
        assert!(!signal.raise());
        assert!(signal.is_raised());
    }

    #[test]
    fn test_only_one_raiser_wins() {
        let signal = Arc::new(StopSignal::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let signal = signal.clone();
                std::thread::spawn(move || signal.raise())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
    }
}
