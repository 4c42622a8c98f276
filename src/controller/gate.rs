use std::sync::atomic::{AtomicU64, Ordering};

/// Generation of a request issued through a [`RequestGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Monotonic generation counter for one logical operation. Issuing a new
/// ticket makes every earlier ticket stale, so a late response can be
/// recognised and dropped.
#[derive(Debug, Default)]
pub struct RequestGate {
    generation: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Makes every outstanding ticket stale without issuing a new one.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.0
    }
}

#[test]
fn only_latest_ticket_is_current() {
    let gate = RequestGate::new();
    let first = gate.issue();
    let second = gate.issue();
    assert!(first < second);
    // second resolves before first
    assert!(gate.is_current(second));
    assert!(!gate.is_current(first));
    gate.invalidate();
    assert!(!gate.is_current(second));
}
