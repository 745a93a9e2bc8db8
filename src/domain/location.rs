//! Location entities: stores and distribution centers.
//!
//! Backends hand over a [`RawLocation`] with every attribute optional. The
//! conversion into [`Location`] applies all defaults in one place, so readers
//! never branch on missing fields.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use slug::slugify;
use time::macros::format_description;
use time::{Date, Time, Weekday};

pub type LocationId = i64;

/// Entity type tag carried by location rows in the content repository.
pub const LOCATION_ENTITY_TYPE: &str = "location";

/// Preparation time applied when a location does not specify one.
pub const DEFAULT_PREP_TIME_MINUTES: u32 = 60;

const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Store,
    DistributionCenter,
}

impl LocationType {
    /// Resolve a stored type tag. Both the current and the legacy encodings
    /// are accepted; anything unrecognised is a store.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("distribution_center" | "dc") => LocationType::DistributionCenter,
            _ => LocationType::Store,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::Store => "store",
            LocationType::DistributionCenter => "distribution_center",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            LocationType::Store => "Physical Store",
            LocationType::DistributionCenter => "Distribution Center",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility state of a location in the content repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Published,
    Scheduled,
    Draft,
    Pending,
    Private,
    Trashed,
    Unknown,
}

impl PublishStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "publish" | "published" => PublishStatus::Published,
            "future" | "scheduled" => PublishStatus::Scheduled,
            "draft" | "auto-draft" => PublishStatus::Draft,
            "pending" => PublishStatus::Pending,
            "private" => PublishStatus::Private,
            "trash" | "trashed" => PublishStatus::Trashed,
            _ => PublishStatus::Unknown,
        }
    }

    pub fn is_published(self) -> bool {
        matches!(self, PublishStatus::Published)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: Option<Time>,
    pub close: Option<Time>,
    pub closed: bool,
}

impl DayHours {
    /// Whether `at` falls inside the opening window.
    pub fn is_open_at(&self, at: Time) -> bool {
        if self.closed {
            return false;
        }
        match (self.open, self.close) {
            (Some(open), Some(close)) => open <= at && at < close,
            _ => false,
        }
    }
}

/// Opening hours for Monday through Sunday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours([DayHours; DAYS_PER_WEEK]);

impl WeeklyHours {
    pub fn new(days: [DayHours; DAYS_PER_WEEK]) -> Self {
        Self(days)
    }

    pub fn day(&self, weekday: Weekday) -> &DayHours {
        &self.0[usize::from(weekday.number_days_from_monday())]
    }

    pub fn days(&self) -> &[DayHours; DAYS_PER_WEEK] {
        &self.0
    }
}

/// A dated override of the weekly hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDate {
    pub date: Date,
    pub open: Option<Time>,
    pub close: Option<Time>,
    pub description: String,
    /// Repeats on the same month and day every year.
    pub annual: bool,
}

impl SpecialDate {
    pub fn applies_to(&self, date: Date) -> bool {
        if self.annual {
            self.date.month() == date.month() && self.date.day() == date.day()
        } else {
            self.date == date
        }
    }

    fn hours(&self) -> DayHours {
        DayHours {
            open: self.open,
            close: self.close,
            closed: self.open.is_none() || self.close.is_none(),
        }
    }
}

/// A published store or distribution center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub title: String,
    pub slug: String,
    pub location_type: LocationType,
    pub contact: Contact,
    pub hours: WeeklyHours,
    pub special_dates: Vec<SpecialDate>,
    pub prep_time_minutes: u32,
    pub shipping_instances: BTreeSet<u64>,
}

impl Location {
    pub fn is_distribution_center(&self) -> bool {
        self.location_type == LocationType::DistributionCenter
    }

    pub fn is_linked_to(&self, instance_id: u64) -> bool {
        self.shipping_instances.contains(&instance_id)
    }

    /// Effective hours on `date`: a matching special date wins over the
    /// weekly schedule. Exact dates win over annual ones.
    pub fn hours_on(&self, date: Date) -> DayHours {
        let exact = self
            .special_dates
            .iter()
            .find(|special| !special.annual && special.applies_to(date));
        let annual = || {
            self.special_dates
                .iter()
                .find(|special| special.annual && special.applies_to(date))
        };

        match exact.or_else(annual) {
            Some(special) => special.hours(),
            None => *self.hours.day(date.weekday()),
        }
    }
}

/// Location entity as returned by an authoritative backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLocation {
    pub id: LocationId,
    pub entity_type: String,
    pub status: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub location_type: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub hours: Option<Vec<RawDayHours>>,
    pub special_dates: Option<Vec<RawSpecialDate>>,
    pub prep_time: Option<i64>,
    /// Expected to be a list of integers; anything else links nothing.
    pub shipping_instances: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDayHours {
    pub open: Option<String>,
    pub close: Option<String>,
    pub closed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSpecialDate {
    pub date: String,
    pub open: Option<String>,
    pub close: Option<String>,
    pub description: Option<String>,
    pub annual: Option<bool>,
}

impl RawLocation {
    /// True when the entity is a location in the published state.
    pub fn is_visible(&self) -> bool {
        self.entity_type == LOCATION_ENTITY_TYPE && PublishStatus::parse(&self.status).is_published()
    }
}

impl From<RawLocation> for Location {
    fn from(raw: RawLocation) -> Self {
        let title = raw.title.unwrap_or_default();
        let slug = match raw.slug.filter(|slug| !slug.trim().is_empty()) {
            Some(slug) => slug,
            None => slugify(&title),
        };

        Self {
            id: raw.id,
            location_type: LocationType::parse(raw.location_type.as_deref()),
            contact: Contact {
                email: raw.email.unwrap_or_default(),
                phone: raw.phone.unwrap_or_default(),
                address: raw.address.unwrap_or_default(),
                city: raw.city.unwrap_or_default(),
                state: raw.state.unwrap_or_default(),
                postcode: raw.postcode.unwrap_or_default(),
            },
            hours: weekly_hours(raw.hours.unwrap_or_default()),
            special_dates: raw
                .special_dates
                .unwrap_or_default()
                .into_iter()
                .filter_map(special_date)
                .collect(),
            prep_time_minutes: prep_time(raw.prep_time),
            shipping_instances: shipping_instances(raw.shipping_instances.as_ref()),
            title,
            slug,
        }
    }
}

fn weekly_hours(raw: Vec<RawDayHours>) -> WeeklyHours {
    let mut days = [DayHours::default(); DAYS_PER_WEEK];
    for (slot, day) in days.iter_mut().zip(raw) {
        *slot = DayHours {
            open: day.open.as_deref().and_then(parse_time),
            close: day.close.as_deref().and_then(parse_time),
            closed: day.closed.unwrap_or(false),
        };
    }
    WeeklyHours::new(days)
}

fn special_date(raw: RawSpecialDate) -> Option<SpecialDate> {
    let date = Date::parse(raw.date.trim(), format_description!("[year]-[month]-[day]")).ok()?;
    Some(SpecialDate {
        date,
        open: raw.open.as_deref().and_then(parse_time),
        close: raw.close.as_deref().and_then(parse_time),
        description: raw.description.unwrap_or_default(),
        annual: raw.annual.unwrap_or(false),
    })
}

fn prep_time(raw: Option<i64>) -> u32 {
    match raw {
        None => DEFAULT_PREP_TIME_MINUTES,
        Some(minutes) => u32::try_from(minutes.max(0)).unwrap_or(u32::MAX),
    }
}

/// Accepts integers and numeric strings; drops negatives and junk.
fn shipping_instances(raw: Option<&serde_json::Value>) -> BTreeSet<u64> {
    let Some(serde_json::Value::Array(items)) = raw else {
        return BTreeSet::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::Number(number) => number.as_u64(),
            serde_json::Value::String(text) => text.trim().parse::<u64>().ok(),
            _ => None,
        })
        .collect()
}

fn parse_time(raw: &str) -> Option<Time> {
    let raw = raw.trim();
    Time::parse(raw, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]:[second]")))
        .ok()
}
