use std::fmt;

use chrono::DateTime;
use chrono::Local;
use chrono::Utc;

pub use cws_protocol::timestamp::parse_timestamp;

const ABSOLUTE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How long ago something happened, coarse enough for a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeTime {
    JustNow,
    MinutesAgo(i64),
    HoursMinutesAgo { hours: i64, minutes: i64 },
    /// A day or more ago.
    At(DateTime<Utc>),
}

pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> RelativeTime {
    let elapsed = now.signed_duration_since(then).num_seconds();
    // Negative values come from clock skew between the backend and us.
    if elapsed < 60 {
        return RelativeTime::JustNow;
    }
    if elapsed >= 24 * 60 * 60 {
        return RelativeTime::At(then);
    }
    let minutes = elapsed / 60;
    let hours = minutes / 60;
    if hours > 0 {
        RelativeTime::HoursMinutesAgo {
            hours,
            minutes: minutes % 60,
        }
    } else {
        RelativeTime::MinutesAgo(minutes)
    }
}

impl fmt::Display for RelativeTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelativeTime::JustNow => write!(f, "just now"),
            RelativeTime::MinutesAgo(minutes) => write!(f, "{minutes} min ago"),
            RelativeTime::HoursMinutesAgo { hours, minutes } => {
                write!(f, "{hours} h {minutes} min ago")
            }
            RelativeTime::At(at) => write!(f, "{}", format_absolute(*at)),
        }
    }
}

/// Local wall-clock rendering of a backend timestamp.
pub fn format_absolute(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(ABSOLUTE_FORMAT).to_string()
}
