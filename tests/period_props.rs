use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use habitust::analytics::{current_streak, longest_streak};
use habitust::models::HistoryEntry;
use habitust::{Period, PeriodType};
use proptest::prelude::*;

fn period_type() -> impl Strategy<Value = PeriodType> {
    prop::sample::select(PeriodType::ALL.to_vec())
}

/// Any instant between 1970 and roughly 2100, to the second.
fn instant() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..47_000, 0i64..86_400).prop_map(|(days, secs)| {
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
            + Duration::days(days)
            + Duration::seconds(secs)
    })
}

fn is_aligned(period_type: PeriodType, start: NaiveDateTime) -> bool {
    let midnight = start.time() == chrono::NaiveTime::MIN;
    midnight
        && match period_type {
            PeriodType::Daily => true,
            PeriodType::Weekly => start.weekday() == Weekday::Mon,
            PeriodType::Monthly => start.day() == 1,
            PeriodType::Quarterly => start.day() == 1 && [1, 4, 7, 10].contains(&start.month()),
            PeriodType::Annually => start.day() == 1 && start.month() == 1,
        }
}

proptest! {
    #[test]
    fn bounds_contain_the_instant(pt in period_type(), t in instant()) {
        let p = pt.bounds(t).unwrap();
        prop_assert!(p.start <= t && t < p.end);
        prop_assert!(p.contains(t));
        prop_assert!(is_aligned(pt, p.start));
        prop_assert!(is_aligned(pt, p.end));
    }

    #[test]
    fn bounds_are_stable_inside_a_period(pt in period_type(), t in instant()) {
        let p = pt.bounds(t).unwrap();
        prop_assert_eq!(pt.bounds(p.start).unwrap(), p);
        prop_assert_eq!(pt.bounds(p.end - Duration::seconds(1)).unwrap(), p);
        prop_assert_eq!(pt.advance(p.end).unwrap(), pt.bounds(p.end).unwrap());
    }

    #[test]
    fn periods_since_tile_the_range(pt in period_type(), a in instant(), b in instant()) {
        let (start, now) = if a <= b { (a, b) } else { (b, a) };
        let periods = pt.periods_since(start, now).unwrap();

        prop_assert!(!periods.is_empty());
        if let Some(first) = periods.first() {
            prop_assert!(first.contains(start));
        }
        if let Some(last) = periods.last() {
            prop_assert!(last.start <= now && now <= last.end);
        }
        for pair in periods.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn streaks_stay_within_history(done in prop::collection::vec(any::<bool>(), 0..60)) {
        let origin = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let history: Vec<HistoryEntry> = done
            .iter()
            .enumerate()
            .map(|(i, &completed)| HistoryEntry {
                period: Period {
                    start: origin + Duration::days(i as i64),
                    end: origin + Duration::days(i as i64 + 1),
                },
                completed,
            })
            .collect();

        let longest = longest_streak(&history);
        let current = current_streak(&history);
        prop_assert!(longest as usize <= history.len());
        prop_assert!(current <= longest);
        prop_assert_eq!(longest == 0, done.iter().all(|d| !d));
    }
}
