use crate::error::Error;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

pub const HOURS_PER_DAY: u8 = 24;

/// Which days to search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSelector {
    /// Inclusive on both ends.
    Range { start: NaiveDate, end: NaiveDate },
    List(Vec<NaiveDate>),
}

/// One `YYYY/MM/DD/HH` directory to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeSlot {
    pub date: NaiveDate,
    pub hour: u8,
}

impl ProbeSlot {
    pub fn relative_path(&self) -> PathBuf {
        [
            format!("{:04}", self.date.year()),
            format!("{:02}", self.date.month()),
            format!("{:02}", self.date.day()),
            format!("{:02}", self.hour),
        ]
        .iter()
        .collect()
    }
}

impl fmt::Display for ProbeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.date.format("%Y/%m/%d"), self.hour)
    }
}

impl DateSelector {
    /// Selected days, ascending and without repeats.
    pub fn dates(&self) -> Result<Vec<NaiveDate>, Error> {
        match self {
            DateSelector::Range { start, end } => {
                if end < start {
                    return Err(Error::InvalidDateRange {
                        start: *start,
                        end: *end,
                    });
                }
                Ok(start.iter_days().take_while(|d| d <= end).collect())
            }
            DateSelector::List(dates) => Ok(dates
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()),
        }
    }

    /// Every selected day paired with every hour 00-23, dates then hours ascending.
    pub fn expand(&self) -> Result<Vec<ProbeSlot>, Error> {
        Ok(self
            .dates()?
            .into_iter()
            .flat_map(|date| (0..HOURS_PER_DAY).map(move |hour| ProbeSlot { date, hour }))
            .collect())
    }
}

/// Parse `YYYY-MM-DD`, `YYYY/MM/DD` (month and day may be unpadded) or `YYYYMMDD`.
pub fn parse_date(input: &str) -> Result<NaiveDate, Error> {
    let s = input.trim();

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(s, "%Y%m%d")
            .map_err(|e| Error::invalid_date(input, e.to_string()));
    }

    let normalized = s.replace('/', "-");
    let parts: Vec<&str> = normalized.split('-').collect();
    let &[year, month, day] = parts.as_slice() else {
        return Err(Error::invalid_date(input, "date must be YYYY-MM-DD (or YYYY/MM/DD)"));
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_date(input, "year must be 4 digits"));
    }
    let numeric = |v: &str| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit());
    if !numeric(month) || !numeric(day) {
        return Err(Error::invalid_date(input, "month and day must be numeric"));
    }

    let year: i32 = year.parse().map_err(|_| Error::invalid_date(input, "bad year"))?;
    let month: u32 = month.parse().map_err(|_| Error::invalid_date(input, "bad month"))?;
    let day: u32 = day.parse().map_err(|_| Error::invalid_date(input, "bad day"))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::invalid_date(input, "no such calendar day"))
}

/// One date per line; blank lines and `#` comments are ignored.
pub fn parse_date_lines(text: &str) -> Result<Vec<NaiveDate>, Error> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_date)
        .collect()
}
