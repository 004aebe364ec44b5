//! Business-day arithmetic for promised dates.
//!
//! Everything here works on local wall-clock time ([`NaiveDateTime`]): the shop
//! promises "Wednesday at 11:00", not an instant in UTC. The current time comes
//! from a [`Clock`] so the rules can be pinned to any instant in tests.

use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, Weekday};

/// Format used when an ETA is sent to the backend.
pub const ETA_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Cut-off hour for same-day parts orders.
const PARTS_ORDER_CUTOFF_HOUR: u32 = 13;

/// Business days a customer has to approve a quote.
const APPROVAL_BUSINESS_DAYS: u32 = 2;

/// Provides the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

fn is_business_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Moves `date` forward one day at a time until `days` weekdays have been added.
///
/// Time of day is preserved. `days == 0` returns `date` unchanged, even on a weekend.
pub fn add_business_days(date: NaiveDateTime, days: u32) -> NaiveDateTime {
    let mut result = date;
    let mut added = 0;
    while added < days {
        result += Duration::days(1);
        if is_business_day(result.weekday()) {
            added += 1;
        }
    }
    result
}

/// Deadline for a customer's approval: two business days from `now`.
pub fn approval_eta_at(now: NaiveDateTime) -> NaiveDateTime {
    add_business_days(now, APPROVAL_BUSINESS_DAYS)
}

/// Expected arrival of a part ordered at `now`, always at 11:00 on the arrival day.
///
/// Orders placed Monday to Wednesday before 13:00 arrive in 2 business days,
/// afterwards in 3. Thursday before 13:00 takes 1, afterwards 2. Orders from
/// Friday through Sunday take 2.
pub fn replacement_part_eta_at(now: NaiveDateTime) -> NaiveDateTime {
    let before_cutoff = now.time() < cutoff();
    let days = match now.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed => {
            if before_cutoff {
                2
            } else {
                3
            }
        }
        Weekday::Thu => {
            if before_cutoff {
                1
            } else {
                2
            }
        }
        Weekday::Fri | Weekday::Sat | Weekday::Sun => 2,
    };
    add_business_days(now, days).date().and_time(part_arrival_time())
}

fn cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(PARTS_ORDER_CUTOFF_HOUR, 0, 0).expect("cut-off hour is a valid time")
}

fn part_arrival_time() -> NaiveTime {
    NaiveTime::from_hms_opt(11, 0, 0).expect("11:00:00 is a valid time")
}

/// ETA rules bound to a clock.
#[derive(Debug, Clone, Default)]
pub struct EtaCalculator<C = SystemClock> {
    clock: C,
}

impl<C: Clock> EtaCalculator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn approval_eta(&self) -> NaiveDateTime {
        approval_eta_at(self.clock.now())
    }

    pub fn replacement_part_eta(&self) -> NaiveDateTime {
        replacement_part_eta_at(self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2026-10-12 is a Monday.
    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn eleven(day: u32) -> NaiveDateTime {
        at(day, 11, 0)
    }

    #[test]
    fn business_days_skip_weekends() {
        for start_day in 12..26 {
            let start = at(start_day, 9, 30);
            for n in 1..=10 {
                let result = add_business_days(start, n);
                assert!(is_business_day(result.weekday()), "{result} is a weekend");
                assert_eq!(result.time(), start.time());

                let traversed = (1..=(result - start).num_days())
                    .map(|offset| start + Duration::days(offset))
                    .filter(|day| is_business_day(day.weekday()))
                    .count();
                assert_eq!(traversed, n as usize, "start {start}, n {n}");
            }
        }
    }

    #[test]
    fn zero_business_days_is_identity() {
        let saturday = at(17, 8, 0);
        assert_eq!(add_business_days(saturday, 0), saturday);
    }

    #[test]
    fn friday_plus_one_is_monday() {
        assert_eq!(add_business_days(at(16, 16, 45), 1), at(19, 16, 45));
    }

    #[test]
    fn approval_takes_two_business_days() {
        let calc = EtaCalculator::new(FixedClock(at(16, 15, 30)));
        assert_eq!(calc.approval_eta(), at(20, 15, 30));
    }

    #[test]
    fn parts_monday_morning_and_afternoon() {
        assert_eq!(replacement_part_eta_at(at(12, 10, 0)), eleven(14));
        assert_eq!(replacement_part_eta_at(at(12, 14, 0)), eleven(15));
    }

    #[test]
    fn parts_cutoff_is_exclusive_at_one_pm() {
        assert_eq!(replacement_part_eta_at(at(14, 12, 59)), eleven(16));
        assert_eq!(replacement_part_eta_at(at(14, 13, 0)), eleven(19));
    }

    #[test]
    fn parts_thursday() {
        assert_eq!(replacement_part_eta_at(at(15, 9, 0)), eleven(16));
        assert_eq!(replacement_part_eta_at(at(15, 15, 0)), eleven(19));
    }

    #[test]
    fn parts_friday_and_weekend_take_two_days() {
        for start in [at(16, 7, 0), at(16, 18, 0), at(17, 10, 0), at(18, 22, 0)] {
            assert_eq!(replacement_part_eta_at(start), eleven(20), "from {start}");
        }
    }

    #[test]
    fn parts_eta_is_normalized_to_eleven_sharp() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_hms_milli_opt(10, 17, 42, 512)
            .unwrap();
        let calc = EtaCalculator::new(FixedClock(start));
        let eta = calc.replacement_part_eta();
        assert_eq!(eta, eleven(14));
        assert_eq!(eta.and_utc().timestamp_subsec_millis(), 0);
    }
}
