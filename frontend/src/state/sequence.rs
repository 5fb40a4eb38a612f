use std::cell::Cell;

/// Actions whose responses may arrive after a newer call has already
/// changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    Login,
    Refresh,
    Profile,
}

impl Flight {
    fn slot(self) -> usize {
        match self {
            Flight::Login => 0,
            Flight::Refresh => 1,
            Flight::Profile => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    flight: Flight,
    seq: u64,
    epoch: u64,
}

/// Session generation captured before an await. Goes stale on login and on
/// teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// Monotonic counters per flight plus a global epoch. A ticket is current
/// while no newer ticket of its flight was issued and the epoch has not
/// moved since it was taken.
#[derive(Debug, Default)]
pub struct RequestSequence {
    counters: [Cell<u64>; 3],
    epoch: Cell<u64>,
}

impl RequestSequence {
    pub fn begin(&self, flight: Flight) -> Ticket {
        let counter = &self.counters[flight.slot()];
        let seq = counter.get() + 1;
        counter.set(seq);
        Ticket {
            flight,
            seq,
            epoch: self.epoch.get(),
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.epoch == self.epoch.get() && ticket.seq == self.counters[ticket.flight.slot()].get()
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.epoch.get())
    }

    pub fn is_same_epoch(&self, epoch: Epoch) -> bool {
        epoch.0 == self.epoch.get()
    }

    /// Called when a session starts or is torn down; every outstanding
    /// ticket goes stale.
    pub fn invalidate_all(&self) {
        self.epoch.set(self.epoch.get() + 1);
    }
}
