use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// One recurring weekly window, e.g. `{"day":"mon","start":"09:00","end":"17:00","active":true}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub day: String,
    pub start: String,
    pub end: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A single date-specific exclusion layered on top of the weekly schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub time: String,
}

fn default_true() -> bool {
    true
}

/// A provider's working pattern: the weekly schedule plus blocked slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    #[serde(default)]
    pub blocked_slots: Vec<BlockedSlot>,
}

impl Availability {
    pub fn new(schedule: Vec<ScheduleEntry>, blocked_slots: Vec<BlockedSlot>) -> Self {
        Self {
            schedule,
            blocked_slots,
        }
    }

    /// Providers without any schedule entries accept any time.
    pub fn has_schedule(&self) -> bool {
        !self.schedule.is_empty()
    }

    pub fn entry_for(&self, date: NaiveDate) -> Option<&ScheduleEntry> {
        let weekday = date.weekday();
        self.schedule
            .iter()
            .find(|entry| entry.day.parse::<Weekday>().ok() == Some(weekday))
    }

    /// Slot start times generated from the weekly entry for `date`, every
    /// `interval` from `start`, each strictly before `end`. Blocked slots are
    /// still included here.
    pub fn candidate_slots(
        &self,
        date: NaiveDate,
        interval: Duration,
    ) -> impl Iterator<Item = NaiveTime> + '_ {
        let step = interval.max(Duration::minutes(1));
        let window = self
            .entry_for(date)
            .filter(|entry| entry.active)
            .and_then(|entry| Some((parse_time(&entry.start).ok()?, parse_time(&entry.end).ok()?)));

        window.into_iter().flat_map(move |(start, end)| {
            std::iter::successors(Some(start), move |t| {
                let (next, wrapped) = t.overflowing_add_signed(step);
                (wrapped == 0).then_some(next)
            })
            .take_while(move |t| *t < end)
        })
    }

    pub fn is_blocked(&self, date: &str, time: &str) -> bool {
        self.blocked_slots
            .iter()
            .any(|slot| slot.date == date && slot.time == time)
    }

    /// Candidate slots minus blocked ones, formatted `HH:MM`.
    pub fn open_slots(&self, date: NaiveDate, interval: Duration) -> Vec<String> {
        let date_str = date.format(DATE_FORMAT).to_string();
        self.candidate_slots(date, interval)
            .map(|t| t.format(TIME_FORMAT).to_string())
            .filter(|t| !self.is_blocked(&date_str, t))
            .collect()
    }

    pub fn to_human_readable(&self) -> String {
        let mut active: Vec<(u32, &ScheduleEntry)> = self
            .schedule
            .iter()
            .filter(|e| e.active)
            .filter_map(|e| {
                let day = e.day.parse::<Weekday>().ok()?;
                Some((day.num_days_from_monday(), e))
            })
            .collect();
        active.sort_by_key(|(idx, _)| *idx);

        active
            .iter()
            .map(|(_, e)| format!("{}: {}-{}", capitalize(&e.day[..3.min(e.day.len())]), e.start, e.end))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn validate_schedule(entries: &[ScheduleEntry]) -> anyhow::Result<()> {
    for entry in entries {
        entry
            .day
            .parse::<Weekday>()
            .map_err(|_| anyhow::anyhow!("invalid weekday: {}", entry.day))?;
        let start = parse_time(&entry.start)?;
        let end = parse_time(&entry.end)?;
        if start >= end {
            return Err(anyhow::anyhow!(
                "schedule for {} ends before it starts ({}-{})",
                entry.day,
                entry.start,
                entry.end
            ));
        }
    }
    Ok(())
}

pub fn validate_blocked_slots(slots: &[BlockedSlot]) -> anyhow::Result<()> {
    for slot in slots {
        parse_date(&slot.date)?;
        parse_time(&slot.time)?;
    }
    Ok(())
}

pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| anyhow::anyhow!("invalid date (expected YYYY-MM-DD): {s}"))
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
        .map_err(|_| anyhow::anyhow!("invalid time (expected HH:MM): {s}"))
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn entry(day: &str, start: &str, end: &str, active: bool) -> ScheduleEntry {
        ScheduleEntry {
            day: day.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            active,
        }
    }

    fn blocked(date: &str, time: &str) -> BlockedSlot {
        BlockedSlot {
            id: None,
            date: date.to_string(),
            time: time.to_string(),
        }
    }

    #[test]
    fn test_parse_schedule_json_defaults_active() {
        let json = r#"[{"day":"Monday","start":"09:00","end":"11:00"}]"#;
        let schedule: Vec<ScheduleEntry> = serde_json::from_str(json).unwrap();
        assert!(schedule[0].active);
        assert!(validate_schedule(&schedule).is_ok());
    }

    #[test]
    fn test_invalid_weekday_rejected() {
        assert!(validate_schedule(&[entry("someday", "09:00", "17:00", true)]).is_err());
    }

    #[test]
    fn test_invalid_time_rejected() {
        assert!(validate_schedule(&[entry("mon", "25:00", "17:00", true)]).is_err());
        assert!(validate_schedule(&[entry("mon", "17:00", "09:00", true)]).is_err());
    }

    #[test]
    fn test_hourly_slots_stop_before_end() {
        let avail = Availability::new(vec![entry("mon", "09:00", "11:00", true)], vec![]);
        // 2025-06-16 is a Monday
        let slots = avail.open_slots(date("2025-06-16"), Duration::minutes(60));
        assert_eq!(slots, vec!["09:00", "10:00"]);
    }

    #[test]
    fn test_partial_last_hour_still_offered() {
        let avail = Availability::new(vec![entry("mon", "09:00", "10:30", true)], vec![]);
        let slots = avail.open_slots(date("2025-06-16"), Duration::minutes(60));
        assert_eq!(slots, vec!["09:00", "10:00"]);
    }

    #[test]
    fn test_inactive_day_has_no_slots() {
        let avail = Availability::new(vec![entry("mon", "09:00", "17:00", false)], vec![]);
        assert!(avail.open_slots(date("2025-06-16"), Duration::minutes(60)).is_empty());
    }

    #[test]
    fn test_unscheduled_day_has_no_slots() {
        let avail = Availability::new(vec![entry("mon", "09:00", "17:00", true)], vec![]);
        // 2025-06-17 is a Tuesday
        assert!(avail.open_slots(date("2025-06-17"), Duration::minutes(60)).is_empty());
    }

    #[test]
    fn test_blocked_slot_excluded_only_on_its_date() {
        let avail = Availability::new(
            vec![entry("mon", "09:00", "12:00", true)],
            vec![blocked("2025-06-16", "10:00")],
        );
        assert_eq!(
            avail.open_slots(date("2025-06-16"), Duration::minutes(60)),
            vec!["09:00", "11:00"]
        );
        assert_eq!(
            avail.open_slots(date("2025-06-23"), Duration::minutes(60)),
            vec!["09:00", "10:00", "11:00"]
        );
    }

    #[test]
    fn test_slots_near_midnight_do_not_wrap() {
        let avail = Availability::new(vec![entry("sun", "22:00", "23:59", true)], vec![]);
        // 2025-06-15 is a Sunday
        let slots = avail.open_slots(date("2025-06-15"), Duration::minutes(60));
        assert_eq!(slots, vec!["22:00", "23:00"]);
    }

    #[test]
    fn test_candidate_slots_are_restartable() {
        let avail = Availability::new(vec![entry("mon", "09:00", "11:00", true)], vec![]);
        let first: Vec<_> = avail.candidate_slots(date("2025-06-16"), Duration::minutes(60)).collect();
        let second: Vec<_> = avail.candidate_slots(date("2025-06-16"), Duration::minutes(60)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_to_human_readable() {
        let avail = Availability::new(
            vec![
                entry("friday", "10:00", "16:00", true),
                entry("mon", "09:00", "17:00", true),
                entry("tue", "09:00", "17:00", false),
            ],
            vec![],
        );
        assert_eq!(avail.to_human_readable(), "Mon: 09:00-17:00, Fri: 10:00-16:00");
    }
}
