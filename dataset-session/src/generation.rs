//! Request generations for last-request-wins reconciliation.
//!
//! Each request line (sign-in, history selection, upload, history refresh)
//! hands out a monotonically increasing generation. A response may only be applied if its
//! ticket is still the newest on its line and was issued in the current
//! sign-in epoch.

/// Counter for one request line
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLine {
    current: u64,
}

impl RequestLine {
    /// Start a new request, superseding any in flight
    pub fn issue(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current == generation
    }

    /// Supersede in-flight requests without starting a new one
    pub fn cancel(&mut self) {
        self.current += 1;
    }
}

/// Identifies one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub epoch: u64,
    pub generation: u64,
}

/// Whether a response was written into the session or dropped as stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Stale,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}
