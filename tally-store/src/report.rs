use core::fmt::{self, Display, Formatter};

use tally_common::{Message, Status};

/// Status-bucketed summary of everything a store has received.
///
/// Percentages use integer division throughout. `delivered` is the count
/// divided by ten, i.e. the share of a 1000-message burst that has arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub count: usize,
    pub failed: usize,
    pub complete: usize,
    pub in_progress: usize,
}

impl Report {
    /// Count `messages` by status.
    pub fn tally<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Self {
        messages
            .into_iter()
            .fold(Self::default(), |mut report, message| {
                report.count += 1;
                match message.status {
                    Status::Failed => report.failed += 1,
                    Status::Complete => report.complete += 1,
                    Status::InProgress => report.in_progress += 1,
                }
                report
            })
    }

    #[must_use]
    pub const fn bucket(&self, status: Status) -> usize {
        match status {
            Status::Failed => self.failed,
            Status::Complete => self.complete,
            Status::InProgress => self.in_progress,
        }
    }

    #[must_use]
    pub const fn delivered_percent(&self) -> usize {
        self.count / 10
    }

    /// Share of `status` in the total, floored. Zero for an empty report.
    #[must_use]
    pub const fn percent(&self, status: Status) -> usize {
        if self.count == 0 {
            0
        } else {
            self.bucket(status) * 100 / self.count
        }
    }

    /// Every counted message sits in exactly one bucket.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.count == self.failed + self.complete + self.in_progress
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delivered {}%, complete {}%, failed {}%, in progress {}%",
            self.delivered_percent(),
            self.percent(Status::Complete),
            self.percent(Status::Failed),
            self.percent(Status::InProgress),
        )
    }
}
