use std::cell::Cell;
use std::rc::{Rc, Weak};

use chrono::{Datelike, NaiveDate};
use reform_core::{FormError, Path, PathStore, Signal, SubKey, signal};
use serde_json::Value;

pub(crate) const ISO_DATE: &str = "%Y-%m-%d";

/// Transient decomposition of the stored date, edited one part at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DateParts {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

/// Day count of a month, computed as "day zero" of the following month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Part {
    Year,
    Month,
    Day,
}

/// Keeps the `{year, month, day}` cell and the stored date value mutually
/// consistent while sub-inputs edit them independently.
pub(crate) struct DateSync {
    store: PathStore,
    prop: Path,
    pub parts: Signal<DateParts>,
    pub max_day: Signal<u32>,
    min_year: i32,
    max_year: i32,
    // set while this synchronizer writes the store, so its own notification
    // does not clobber the transient parts
    syncing: Cell<bool>,
    sub: Cell<Option<SubKey>>,
}

impl DateSync {
    /// Resolve the initial date (stored value if present, else `fallback`,
    /// seeded silently) and start following external writes at `prop`.
    pub fn bind(
        store: PathStore,
        prop: Path,
        fallback: NaiveDate,
        min_year: i32,
        max_year: i32,
    ) -> Result<Rc<Self>, FormError> {
        let date = match store.get_path(&prop) {
            Some(Value::String(s)) => NaiveDate::parse_from_str(&s, ISO_DATE).map_err(|_| {
                FormError::config(format!(
                    "value at `{prop}` is not a `YYYY-MM-DD` date: `{s}`"
                ))
            })?,
            Some(Value::Null) | None => {
                store.set_path(
                    &prop,
                    Value::String(fallback.format(ISO_DATE).to_string()),
                    true,
                );
                fallback
            }
            Some(other) => {
                return Err(FormError::config(format!(
                    "date field at `{prop}` expects a string value, found `{other}`"
                )));
            }
        };

        let sync = Rc::new(Self {
            store: store.clone(),
            prop: prop.clone(),
            parts: signal(DateParts::of(date)),
            max_day: signal(days_in_month(date.year(), date.month())),
            min_year,
            max_year,
            syncing: Cell::new(false),
            sub: Cell::new(None),
        });

        let weak: Weak<Self> = Rc::downgrade(&sync);
        let key = store.subscribe(prop, move |value| {
            if let Some(sync) = weak.upgrade() {
                sync.refresh_from(value);
            }
        });
        sync.sub.set(Some(key));
        Ok(sync)
    }

    // External writes (wholesale loads, commits) re-derive the parts.
    fn refresh_from(&self, value: Option<&Value>) {
        if self.syncing.get() {
            return;
        }
        if let Some(Value::String(s)) = value
            && let Ok(date) = NaiveDate::parse_from_str(s, ISO_DATE)
        {
            self.parts.set(DateParts::of(date));
            self.max_day.set(days_in_month(date.year(), date.month()));
        }
    }

    /// One sub-part edit: clamp to that part's bounds, write the date back
    /// through the store (marking the form dirty), update the transient cell
    /// for that part only, and recompute the day bound.
    ///
    /// When the day bound shrinks below the current day, the transient day
    /// is left as the user set it; only the *stored* date is clamped so it
    /// stays representable. The user sees the new bound and edits day
    /// themselves.
    pub fn set_part(&self, part: Part, raw: i64) {
        let mut parts = self.parts.get();
        match part {
            Part::Year => {
                parts.year = raw.clamp(self.min_year as i64, self.max_year as i64) as i32;
            }
            Part::Month => {
                parts.month = raw.clamp(1, 12) as u32;
            }
            Part::Day => {
                let max = days_in_month(parts.year, parts.month) as i64;
                parts.day = raw.clamp(1, max) as u32;
            }
        }

        let stored_day = parts.day.min(days_in_month(parts.year, parts.month));
        let Some(date) = NaiveDate::from_ymd_opt(parts.year, parts.month, stored_day) else {
            return;
        };

        self.syncing.set(true);
        self.store.set_path(
            &self.prop,
            Value::String(date.format(ISO_DATE).to_string()),
            false,
        );
        self.syncing.set(false);

        self.parts.set(parts);
        self.max_day.set(days_in_month(parts.year, parts.month));
    }
}

impl Drop for DateSync {
    fn drop(&mut self) {
        if let Some(key) = self.sub.take() {
            self.store.unsubscribe(key);
        }
    }
}
