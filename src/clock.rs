//! Time source for the workflow.
//!
//! The workflow never reads the system time directly: it is handed a [Clock]
//! so that date-based tags and the safety window can be tested deterministically.

use chrono::{Local, NaiveDateTime};

/// Supplies the current local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;

    /// Today's date in `YYYYMMDD` form, as embedded in dated tags.
    fn today(&self) -> String {
        self.now().format("%Y%m%d").to_string()
    }
}

/// Reads the local time of the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
