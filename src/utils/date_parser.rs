//! Robust date parsing for historical station records
//!
//! Station archives mix ISO dates, day-first and month-first numeric dates and
//! spelled-out month names. [`DateParser`] tries a fixed list of formats in a
//! preference order and remembers which format matched each input string.

use chrono::{Days, NaiveDate};
use rustc_hash::FxHashMap;

/// Formats tried by the parser, in declaration order
pub const FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Maximum number of samples inspected by [`DateParser::detect_format`]
pub const DETECTION_SAMPLE_LIMIT: usize = 100;

/// Parser for the date formats found in historical data
#[derive(Debug, Clone, Default)]
pub struct DateParser {
    preferred_format: Option<String>,
    format_cache: FxHashMap<String, String>,
}

fn leads_with(format: &str, field: char) -> bool {
    format.chars().take(3).any(|c| c == field)
}

impl DateParser {
    /// Create a parser that tries `preferred_format` before the built-in list
    #[must_use]
    pub fn new(preferred_format: Option<&str>) -> Self {
        Self {
            preferred_format: preferred_format.map(str::to_string),
            format_cache: FxHashMap::default(),
        }
    }

    /// Parse a date string, trying day-first formats first when `day_first`
    ///
    /// Returns `None` (and logs a warning) when no format matches.
    pub fn parse(&mut self, date_str: &str, day_first: bool) -> Option<NaiveDate> {
        let date_str = date_str.trim();

        if let Some(format) = self.format_cache.get(date_str) {
            if let Ok(date) = NaiveDate::parse_from_str(date_str, format) {
                return Some(date);
            }
        }

        let preferred = self.preferred_format.clone();
        let candidates = preferred
            .iter()
            .map(String::as_str)
            .chain(Self::ordered_formats(day_first));

        for format in candidates {
            if let Ok(date) = NaiveDate::parse_from_str(date_str, format) {
                self.format_cache
                    .insert(date_str.to_string(), format.to_string());
                return Some(date);
            }
        }

        log::warn!("Could not parse date: {date_str}");
        None
    }

    /// Built-in formats ordered by day-first or month-first preference
    #[must_use]
    pub fn ordered_formats(day_first: bool) -> Vec<&'static str> {
        let field = if day_first { 'd' } else { 'm' };
        let (leading, rest): (Vec<&str>, Vec<&str>) =
            FORMATS.iter().copied().partition(|f| leads_with(f, field));
        leading.into_iter().chain(rest).collect()
    }

    /// Date for a year and 1-based day of year; days past year end roll over
    #[must_use]
    pub fn parse_julian(year: i32, day_of_year: u32) -> Option<NaiveDate> {
        let offset = day_of_year.checked_sub(1)?;
        NaiveDate::from_ymd_opt(year, 1, 1)?.checked_add_days(Days::new(u64::from(offset)))
    }

    /// Whether a date falls in the plausible range 1800-01-01..=2100-12-31
    #[must_use]
    pub fn validate(date: NaiveDate) -> bool {
        let (Some(min), Some(max)) = (
            NaiveDate::from_ymd_opt(1800, 1, 1),
            NaiveDate::from_ymd_opt(2100, 12, 31),
        ) else {
            return false;
        };
        (min..=max).contains(&date)
    }

    /// Most frequently matching format over the first samples
    #[must_use]
    pub fn detect_format<S: AsRef<str>>(samples: &[S]) -> Option<&'static str> {
        let mut counts = [0usize; FORMATS.len()];
        for sample in samples.iter().take(DETECTION_SAMPLE_LIMIT) {
            let sample = sample.as_ref().trim();
            for (count, format) in counts.iter_mut().zip(FORMATS) {
                if NaiveDate::parse_from_str(sample, format).is_ok() {
                    *count += 1;
                }
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for (idx, &count) in counts.iter().enumerate() {
            if count > 0 && best.is_none_or(|(_, c)| count > c) {
                best = Some((idx, count));
            }
        }
        best.map(|(idx, _)| FORMATS[idx])
    }
}
