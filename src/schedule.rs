//! Per-hour classification of a charging plan
//!
//! Past/current/future is measured as modular distance from the hour the
//! session started, so a plan spanning midnight keeps its elapsed-time order.

use crate::hour::{ChargingPlan, HOURS_PER_DAY, Hour};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Classification of one hour relative to now and the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HourStatus {
    /// Planned hour already elapsed in this session
    Past,
    /// Planned hour the clock is in right now
    Current,
    /// Planned hour still ahead
    Future,
    /// Not a planned hour
    #[default]
    None,
}

impl HourStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Past => "past",
            Self::Current => "current",
            Self::Future => "future",
            Self::None => "none",
        }
    }
}

/// Status of every hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HourSchedule {
    slots: [HourStatus; HOURS_PER_DAY as usize],
}

impl HourSchedule {
    /// Schedule with every hour `none` (no session / no plan)
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn get(&self, hour: Hour) -> HourStatus {
        self.slots[usize::from(hour.value())]
    }

    /// `(hour, status)` pairs in clock order
    pub fn iter(&self) -> impl Iterator<Item = (Hour, HourStatus)> + '_ {
        Hour::all().map(move |h| (h, self.get(h)))
    }

    /// Hours currently marked `current` (at most one)
    pub fn current_hour(&self) -> Option<Hour> {
        self.iter()
            .find(|(_, s)| *s == HourStatus::Current)
            .map(|(h, _)| h)
    }
}

impl Serialize for HourSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (hour, status) in self.iter() {
            map.serialize_entry(&hour.value(), &status)?;
        }
        map.end()
    }
}

/// Classify all 24 hours against `plan`, the current hour and the session start hour
pub fn classify(plan: &ChargingPlan, current_hour: Hour, session_start_hour: Hour) -> HourSchedule {
    let mut schedule = HourSchedule::inert();
    let elapsed = current_hour.distance_from(session_start_hour);

    for hour in Hour::all() {
        if !plan.contains(hour) {
            continue;
        }
        let offset = hour.distance_from(session_start_hour);
        schedule.slots[usize::from(hour.value())] = match offset.cmp(&elapsed) {
            std::cmp::Ordering::Less => HourStatus::Past,
            std::cmp::Ordering::Equal => HourStatus::Current,
            std::cmp::Ordering::Greater => HourStatus::Future,
        };
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(v: u8) -> Hour {
        Hour::new(v).unwrap()
    }

    fn plan(hours: &[u8]) -> ChargingPlan {
        hours.iter().map(|v| h(*v)).collect()
    }

    #[test]
    fn test_classify_basic_plan() {
        let s = classify(&plan(&[2, 3, 4]), h(3), h(2));
        assert_eq!(s.get(h(2)), HourStatus::Past);
        assert_eq!(s.get(h(3)), HourStatus::Current);
        assert_eq!(s.get(h(4)), HourStatus::Future);
        for hour in Hour::all().filter(|x| ![2, 3, 4].contains(&x.value())) {
            assert_eq!(s.get(hour), HourStatus::None);
        }
    }

    #[test]
    fn test_non_plan_hours_always_none() {
        let p = plan(&[1, 5, 23]);
        for start in Hour::all() {
            for current in Hour::all() {
                let s = classify(&p, current, start);
                for hour in Hour::all().filter(|x| !p.contains(*x)) {
                    assert_eq!(s.get(hour), HourStatus::None);
                }
            }
        }
    }

    #[test]
    fn test_wraps_across_midnight() {
        // Session started at 22:00, now 01:00: 23 is behind us, 2 ahead
        let s = classify(&plan(&[23, 1, 2]), h(1), h(22));
        assert_eq!(s.get(h(23)), HourStatus::Past);
        assert_eq!(s.get(h(1)), HourStatus::Current);
        assert_eq!(s.get(h(2)), HourStatus::Future);
    }

    #[test]
    fn test_single_hour_walks_past_current_future_once_per_day() {
        let p = plan(&[5]);
        let start = h(20);
        let mut sequence = Vec::new();
        // Walk the current hour one full day starting at the session start
        let mut current = start;
        for _ in 0..HOURS_PER_DAY {
            let status = classify(&p, current, start).get(h(5));
            if sequence.last() != Some(&status) {
                sequence.push(status);
            }
            current = current.next();
        }
        assert_eq!(
            sequence,
            vec![HourStatus::Future, HourStatus::Current, HourStatus::Past]
        );
    }

    #[test]
    fn test_at_most_one_current() {
        let p = plan(&[0, 3, 7, 12, 18, 22]);
        for start in Hour::all() {
            for current in Hour::all() {
                let s = classify(&p, current, start);
                let n = s.iter().filter(|(_, st)| *st == HourStatus::Current).count();
                assert_eq!(n, usize::from(p.contains(current)));
            }
        }
    }

    #[test]
    fn test_serializes_as_hour_keyed_map() {
        let s = classify(&plan(&[2]), h(2), h(2));
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["2"], "current");
        assert_eq!(json["3"], "none");
        assert_eq!(json.as_object().unwrap().len(), 24);
    }
}
