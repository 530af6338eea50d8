// src/services/streak.rs

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Streak statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakStats {
    /// Consecutive days ending on the last completed day, if that day is today or yesterday.
    pub current_streak: u32,
    /// Longest run of consecutive days ever.
    pub longest_streak: u32,
}

/// Calculate streaks from the dates of completed attempts.
///
/// Duplicate dates count once.
pub fn calculate_streaks(dates: &[NaiveDate], today: NaiveDate) -> StreakStats {
    let days: Vec<NaiveDate> = dates.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

    let Some(&last_day) = days.last() else {
        return StreakStats::default();
    };

    let mut longest_streak = 1u32;
    let mut run = 1u32;
    for pair in days.windows(2) {
        if consecutive(pair) {
            run += 1;
            longest_streak = longest_streak.max(run);
        } else {
            run = 1;
        }
    }

    let days_since_last = (today - last_day).num_days();
    let current_streak = if days_since_last == 0 || days_since_last == 1 {
        1 + days
            .windows(2)
            .rev()
            .take_while(|pair| consecutive(pair))
            .count() as u32
    } else {
        0
    };

    StreakStats {
        current_streak,
        longest_streak,
    }
}

fn consecutive(pair: &[NaiveDate]) -> bool {
    (pair[1] - pair[0]).num_days() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        // 2025-01-06 is a Monday
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(calculate_streaks(&[], d(9)), StreakStats::default());
    }

    #[test]
    fn test_mon_tue_wed_seen_on_thursday() {
        let stats = calculate_streaks(&[d(6), d(7), d(8)], d(9));
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn test_mon_wed_seen_on_thursday() {
        // Wednesday is yesterday so the streak is alive, but Monday is not adjacent.
        let stats = calculate_streaks(&[d(6), d(8)], d(9));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 1);
    }

    #[test]
    fn test_streak_including_today() {
        let stats = calculate_streaks(&[d(7), d(8), d(9)], d(9));
        assert_eq!(stats.current_streak, 3);
    }

    #[test]
    fn test_broken_streak() {
        let stats = calculate_streaks(&[d(1), d(2), d(3), d(4)], d(9));
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 4);
    }

    #[test]
    fn test_duplicates_and_order_do_not_matter() {
        let stats = calculate_streaks(&[d(8), d(7), d(8), d(7), d(6)], d(8));
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn test_longest_run_in_the_past() {
        let dates = [d(1), d(2), d(3), d(4), d(6), d(8), d(9)];
        let stats = calculate_streaks(&dates, d(10));
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 4);
    }

    #[test]
    fn test_across_month_boundary() {
        let jan_31 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let feb_1 = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let stats = calculate_streaks(&[jan_31, feb_1], feb_1);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
    }
}
