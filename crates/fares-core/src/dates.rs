//! Calendar date ranges to query.

use crate::error::{FaresError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;

/// Whether the end boundary of a [`DateRange`] is itself queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inclusivity {
    /// `start..=end`
    #[default]
    Inclusive,
    /// `start..end`
    Exclusive,
}

/// A finite, restartable sequence of consecutive calendar days.
///
/// Each call to [`DateRange::iter`] starts again from the first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
    inclusivity: Inclusivity,
}

impl DateRange {
    /// Create a range from `start` to `end`.
    ///
    /// # Errors
    /// Returns [`FaresError::InvalidRange`] when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate, inclusivity: Inclusivity) -> Result<Self> {
        if start > end {
            return Err(FaresError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            inclusivity,
        })
    }

    /// Shorthand for an inclusive range.
    pub fn inclusive(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        Self::new(start, end, Inclusivity::Inclusive)
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn inclusivity(&self) -> Inclusivity {
        self.inclusivity
    }

    /// Number of days the range yields.
    #[must_use]
    pub fn len(&self) -> usize {
        let span = usize::try_from((self.end - self.start).num_days()).unwrap_or(0);
        match self.inclusivity {
            Inclusivity::Inclusive => span + 1,
            Inclusivity::Exclusive => span,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily iterate the days in increasing order.
    #[must_use]
    pub fn iter(&self) -> DateIter {
        DateIter {
            next: Some(self.start),
            remaining: self.len(),
        }
    }
}

impl IntoIterator for DateRange {
    type Item = NaiveDate;
    type IntoIter = DateIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &DateRange {
    type Item = NaiveDate;
    type IntoIter = DateIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the days of a [`DateRange`].
#[derive(Debug, Clone)]
pub struct DateIter {
    next: Option<NaiveDate>,
    remaining: usize,
}

impl Iterator for DateIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = current.succ_opt();
        if self.next.is_none() {
            self.remaining = 0;
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for DateIter {}

impl FusedIterator for DateIter {}
