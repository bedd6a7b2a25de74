//! Relative date values for data files.
//!
//! The loader evaluates `eval` attributes as Python expressions at import time, which lets a
//! fixture say "one day ago" without knowing when it will be imported. [`DateMode::Eval`]
//! keeps that behaviour. [`DateMode::Absolute`] resolves the same offsets against a fixed
//! instant at generation time and writes plain timestamps instead, for loaders that should
//! not execute embedded expressions.

use crate::document::FieldValue;
use chrono::{Duration, NaiveDateTime};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MIDNIGHT_FORMAT: &str = "%Y-%m-%d 00:00:00";

/// An instant expressed relative to "now".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateExpr {
    days: i64,
    minutes: Option<i64>,
    midnight: bool,
}

impl DateExpr {
    /// `now + days` (negative values are in the past).
    pub fn days(days: i64) -> Self {
        Self {
            days,
            minutes: None,
            midnight: false,
        }
    }

    /// Adds a whole-minute offset on top of the day offset.
    pub fn plus_minutes(mut self, minutes: i64) -> Self {
        self.minutes = Some(minutes);
        self
    }

    /// Truncates the rendered timestamp to the start of the day.
    pub fn at_midnight(mut self) -> Self {
        self.midnight = true;
        self
    }

    pub fn day_offset(&self) -> i64 {
        self.days
    }

    pub fn minute_offset(&self) -> i64 {
        self.minutes.unwrap_or(0)
    }

    fn format(&self) -> &'static str {
        if self.midnight {
            MIDNIGHT_FORMAT
        } else {
            DATETIME_FORMAT
        }
    }

    /// Renders the loader expression, e.g.
    /// `(datetime.now() + timedelta(-1)).strftime('%Y-%m-%d %H:%M:%S')`.
    pub fn to_eval(&self) -> String {
        match self.minutes {
            Some(minutes) => format!(
                "(datetime.now() + timedelta({}) + timedelta(minutes={})).strftime('{}')",
                self.days,
                minutes,
                self.format()
            ),
            None => format!(
                "(datetime.now() + timedelta({})).strftime('{}')",
                self.days,
                self.format()
            ),
        }
    }

    /// Resolves against `now` and formats the result the way the expression would.
    ///
    /// Callers bound the offsets first; an instant outside chrono's calendar range panics.
    pub fn resolve(&self, now: NaiveDateTime) -> String {
        let instant = now + Duration::days(self.days) + Duration::minutes(self.minute_offset());
        instant.format(self.format()).to_string()
    }
}

/// How date fields are written into a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DateMode {
    /// Emit `eval` expressions evaluated by the loader at import time.
    #[default]
    Eval,
    /// Emit literal timestamps computed from the given instant.
    Absolute(NaiveDateTime),
}

impl DateMode {
    pub fn field_value(&self, expr: DateExpr) -> FieldValue {
        match self {
            DateMode::Eval => FieldValue::Eval(expr.to_eval()),
            DateMode::Absolute(now) => FieldValue::Text(expr.resolve(*now)),
        }
    }
}
