use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Numeric task identity. Server-assigned ids are positive; ids handed out
/// for optimistic inserts are negative until the server confirms them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// True for ids allocated locally before server confirmation
    pub fn is_temporary(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(TaskId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

/// Completion state of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Incomplete,
    Completed,
}

impl TaskStatus {
    pub fn toggled(self) -> TaskStatus {
        match self {
            TaskStatus::Incomplete => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Incomplete,
        }
    }

    /// The character shown inside the checkbox `[ ]`
    pub fn checkbox_char(self) -> char {
        match self {
            TaskStatus::Incomplete => ' ',
            TaskStatus::Completed => 'x',
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "incomplete" | "todo" => Ok(TaskStatus::Incomplete),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!("invalid status: {} (expected incomplete or completed)", other)),
        }
    }
}

/// Largest day count accepted in `D-<n>` input, a century either way
pub const MAX_DAY_COUNT: i64 = 36_500;

static DDAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^d([+-])(\d+|day)$").expect("valid d-day pattern"));

/// A task deadline: either a calendar date or a day count relative to today
/// (the server reports the latter as `dDay`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Deadline {
    Date(NaiveDate),
    Days(i64),
}

impl Deadline {
    /// Days remaining until the deadline; negative once it has passed.
    pub fn days_left(self, today: NaiveDate) -> i64 {
        match self {
            Deadline::Date(date) => (date - today).num_days(),
            Deadline::Days(days) => days,
        }
    }

    /// Resolve to a calendar date relative to `today`. None when the day
    /// count lands outside the calendar.
    pub fn to_date(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Deadline::Date(date) => Some(date),
            Deadline::Days(days) if days >= 0 => today.checked_add_days(Days::new(days.unsigned_abs())),
            Deadline::Days(days) => today.checked_sub_days(Days::new(days.unsigned_abs())),
        }
    }

    /// Render as `D-3`, `D-day` or `D+2` relative to `today`.
    pub fn d_day_label(self, today: NaiveDate) -> String {
        match self.days_left(today) {
            0 => "D-day".to_string(),
            n if n > 0 => format!("D-{}", n),
            n => format!("D+{}", n.unsigned_abs()),
        }
    }
}

impl FromStr for Deadline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(caps) = DDAY_RE.captures(s) {
            if caps[2].eq_ignore_ascii_case("day") {
                return Ok(Deadline::Days(0));
            }
            let n: i64 = caps[2]
                .parse()
                .ok()
                .filter(|n| *n <= MAX_DAY_COUNT)
                .ok_or_else(|| format!("invalid day count: {} (at most {})", s, MAX_DAY_COUNT))?;
            // `D-3` means three days left, `D+2` means two days overdue
            return Ok(Deadline::Days(if &caps[1] == "-" { n } else { -n }));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Deadline::Date)
            .map_err(|_| format!("invalid deadline: {} (expected YYYY-MM-DD or D-<n>)", s))
    }
}

/// A single entry in a backlog or today list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    #[serde(rename = "todoId")]
    pub id: TaskId,
    pub content: String,
    #[serde(default, rename = "todoStatus")]
    pub status: TaskStatus,
    #[serde(default, rename = "isBookmark")]
    pub bookmark: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Deadline>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "categoryId")]
    pub category: Option<CategoryId>,
}

impl TaskItem {
    /// Create an incomplete, unbookmarked item with no deadline
    pub fn new(id: TaskId, content: impl Into<String>) -> Self {
        TaskItem {
            id,
            content: content.into(),
            status: TaskStatus::Incomplete,
            bookmark: false,
            deadline: None,
            category: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn temporary_ids_are_negative() {
        assert!(TaskId(-1).is_temporary());
        assert!(!TaskId(0).is_temporary());
        assert!(!TaskId(42).is_temporary());
    }

    #[test]
    fn task_id_parses_with_hash_prefix() {
        assert_eq!("#17".parse::<TaskId>().unwrap(), TaskId(17));
        assert_eq!(" 5 ".parse::<TaskId>().unwrap(), TaskId(5));
        assert!("abc".parse::<TaskId>().is_err());
    }

    #[test]
    fn status_toggles() {
        assert_eq!(TaskStatus::Incomplete.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Incomplete);
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert!("maybe".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn deadline_parse_forms() {
        assert_eq!(
            "2026-10-20".parse::<Deadline>().unwrap(),
            Deadline::Date(date("2026-10-20"))
        );
        assert_eq!("D-3".parse::<Deadline>().unwrap(), Deadline::Days(3));
        assert_eq!("d+2".parse::<Deadline>().unwrap(), Deadline::Days(-2));
        assert_eq!("D-day".parse::<Deadline>().unwrap(), Deadline::Days(0));
        assert!("tomorrow".parse::<Deadline>().is_err());
    }

    #[test]
    fn deadline_days_left_and_label() {
        let today = date("2026-10-18");
        let due = Deadline::Date(date("2026-10-21"));
        assert_eq!(due.days_left(today), 3);
        assert_eq!(due.d_day_label(today), "D-3");
        assert_eq!(Deadline::Days(0).d_day_label(today), "D-day");
        assert_eq!(Deadline::Date(date("2026-10-16")).d_day_label(today), "D+2");
        assert_eq!(Deadline::Days(2).to_date(today), Some(date("2026-10-20")));
        assert_eq!(Deadline::Days(-3).to_date(today), Some(date("2026-10-15")));
    }

    #[test]
    fn day_count_outside_calendar_has_no_date() {
        let today = date("2026-10-18");
        assert_eq!(Deadline::Days(100_000_000_000).to_date(today), None);
        assert_eq!(Deadline::Days(i64::MIN).to_date(today), None);
        assert_eq!(Deadline::Days(i64::MIN).d_day_label(today), "D+9223372036854775808");
    }

    #[test]
    fn oversized_day_count_rejected_on_parse() {
        assert_eq!(
            format!("D-{}", MAX_DAY_COUNT).parse::<Deadline>().unwrap(),
            Deadline::Days(MAX_DAY_COUNT)
        );
        let err = "D-100000000000".parse::<Deadline>().unwrap_err();
        assert!(err.contains("invalid day count"));
        assert!("D+99999999999999999999".parse::<Deadline>().is_err());
    }

    #[test]
    fn item_json_uses_server_field_names() {
        let json = r#"{"todoId": 7, "content": "buy milk", "todoStatus": "COMPLETED", "isBookmark": true}"#;
        let item: TaskItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, TaskId(7));
        assert!(item.is_completed());
        assert!(item.bookmark);
        assert_eq!(item.deadline, None);
    }
}
