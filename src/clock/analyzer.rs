//! Synchronization statistics
//!
//! Pure aggregation over per-clock [`ClockDetails`]: status counts, extrema,
//! mean/median of absolute differences, signed drift and the derived
//! insight and recommendation messages.
//!
//! Thresholds are fixed constants, not configuration.

use serde::Serialize;

use super::record::{ClockDetails, ClockStatus};

/// Rate at or above which synchronization is considered good
pub const GOOD_SYNC_RATE: u32 = 75;
/// Rate at or above which synchronization is considered moderate
pub const MODERATE_SYNC_RATE: u32 = 50;
/// Absolute total drift above which a system-wide warning is emitted
pub const DRIFT_WARNING_MINUTES: i64 = 30;
/// Worst-performer difference above which that clock is called out
pub const ATTENTION_MINUTES: u32 = 15;
/// Spread between max and min difference above which variation is reported
pub const WIDE_RANGE_MINUTES: u32 = 20;
/// Absolute total drift above which automatic sync is suggested
pub const AUTO_SYNC_DRIFT_MINUTES: i64 = 20;
/// Max difference above which hardware should be checked
pub const HARDWARE_MINUTES: u32 = 30;
/// Average difference above which checks should be more frequent
pub const CHECK_FREQUENCY_MINUTES: f64 = 10.0;

/// Aggregate statistics over a set of clocks
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_clocks: usize,
    pub synchronized: usize,
    pub ahead: usize,
    pub behind: usize,
    pub max_difference: u32,
    pub min_difference: u32,
    /// Mean absolute difference, rounded to one decimal
    pub average_difference: f64,
    pub median_difference: f64,
    /// Signed sum of differences
    pub total_drift: i64,
    /// Percentage of synchronized clocks, rounded
    pub synchronization_rate: u32,
    pub worst_performer: Option<ClockDetails>,
    pub best_performer: Option<ClockDetails>,
}

impl Summary {
    /// Spread between the largest and smallest absolute difference
    pub fn range(&self) -> u32 {
        self.max_difference - self.min_difference
    }
}

/// Summarize per-clock details
///
/// Statuses are taken as already classified against the active tolerance.
/// An empty slice yields an all-zero summary with no performers.
pub fn summarize(details: &[ClockDetails]) -> Summary {
    let absolute: Vec<u32> = details.iter().map(|d| d.absolute_difference).collect();

    Summary {
        total_clocks: details.len(),
        synchronized: count_by_status(details, ClockStatus::Synchronized),
        ahead: count_by_status(details, ClockStatus::Ahead),
        behind: count_by_status(details, ClockStatus::Behind),
        max_difference: absolute.iter().copied().max().unwrap_or(0),
        min_difference: absolute.iter().copied().min().unwrap_or(0),
        average_difference: average(&absolute),
        median_difference: median(&absolute),
        total_drift: total_drift(details),
        synchronization_rate: synchronization_rate(details),
        worst_performer: worst_performer(details).cloned(),
        best_performer: best_performer(details).cloned(),
    }
}

/// Number of clocks with the given status
pub fn count_by_status(details: &[ClockDetails], status: ClockStatus) -> usize {
    details.iter().filter(|d| d.status == status).count()
}

/// Mean rounded to one decimal place, 0 for no values
pub fn average(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    (sum / values.len() as f64 * 10.0).round() / 10.0
}

/// Median (mean of the middle pair for even counts), 0 for no values
pub fn median(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let middle = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (f64::from(sorted[middle - 1]) + f64::from(sorted[middle])) / 2.0
    } else {
        f64::from(sorted[middle])
    }
}

/// Signed sum of all differences
pub fn total_drift(details: &[ClockDetails]) -> i64 {
    details.iter().map(|d| i64::from(d.difference)).sum()
}

/// Rounded percentage of synchronized clocks, 0 when there are none
pub fn synchronization_rate(details: &[ClockDetails]) -> u32 {
    if details.is_empty() {
        return 0;
    }
    let synchronized = count_by_status(details, ClockStatus::Synchronized);
    (synchronized as f64 * 100.0 / details.len() as f64).round() as u32
}

/// Clock with the largest absolute difference; the first one wins ties
pub fn worst_performer(details: &[ClockDetails]) -> Option<&ClockDetails> {
    details.iter().fold(None, |worst, current| match worst {
        Some(w) if current.absolute_difference <= w.absolute_difference => Some(w),
        _ => Some(current),
    })
}

/// Clock with the smallest non-zero absolute difference; the first one wins ties
pub fn best_performer(details: &[ClockDetails]) -> Option<&ClockDetails> {
    details
        .iter()
        .filter(|d| d.absolute_difference > 0)
        .fold(None, |best, current| match best {
            Some(b) if current.absolute_difference >= b.absolute_difference => Some(b),
            _ => Some(current),
        })
}

/// Qualitative observations about a summary
pub fn insights(summary: &Summary) -> Vec<String> {
    let mut insights = Vec::new();

    let rate = summary.synchronization_rate;
    insights.push(
        if rate == 100 {
            "🎯 Perfect synchronization achieved across all clocks!"
        } else if rate >= GOOD_SYNC_RATE {
            "👍 Good synchronization rate - most clocks are aligned"
        } else if rate >= MODERATE_SYNC_RATE {
            "⚠️ Moderate synchronization - some clocks need attention"
        } else {
            "🚨 Poor synchronization - immediate action required"
        }
        .to_string(),
    );

    if summary.total_drift.abs() > DRIFT_WARNING_MINUTES {
        let direction = if summary.total_drift > 0 { "fast" } else { "slow" };
        insights.push(format!(
            "⏰ Significant system-wide drift detected - clocks running {}",
            direction
        ));
    }

    if let Some(worst) = &summary.worst_performer {
        if worst.absolute_difference > ATTENTION_MINUTES {
            insights.push(format!(
                "🔧 \"{}\" requires immediate attention ({} min off)",
                worst.name, worst.absolute_difference
            ));
        }
    }

    if summary.range() > WIDE_RANGE_MINUTES {
        insights.push("📊 Wide variation in clock accuracy detected".to_string());
    }

    insights
}

/// System-level maintenance recommendations; none when there are no clocks
pub fn recommendations(summary: &Summary) -> Vec<String> {
    let mut recommendations = Vec::new();
    if summary.total_clocks == 0 {
        return recommendations;
    }

    if summary.synchronization_rate < MODERATE_SYNC_RATE {
        recommendations.push(
            "🚨 Priority: Schedule immediate maintenance for all unsynchronized clocks".to_string(),
        );
    }

    if summary.total_drift.abs() > AUTO_SYNC_DRIFT_MINUTES {
        recommendations.push("⚡ Consider implementing automatic synchronization system".to_string());
    }

    if summary.max_difference > HARDWARE_MINUTES {
        recommendations.push(
            "🔍 Investigate potential hardware issues in severely misaligned clocks".to_string(),
        );
    }

    if summary.average_difference > CHECK_FREQUENCY_MINUTES {
        recommendations.push("📅 Increase frequency of synchronization checks".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::record::ClockRecord;
    use crate::clock::time::TimeOfDay;

    fn details(times: &[&str], reference: &str, tolerance: u32) -> Vec<ClockDetails> {
        let reference = TimeOfDay::parse(reference).unwrap();
        times
            .iter()
            .enumerate()
            .map(|(i, time)| {
                ClockRecord::new(i as i64 + 1, time, &format!("Clock {}", i + 1))
                    .unwrap()
                    .detailed_info(reference, tolerance)
            })
            .collect()
    }

    fn town() -> Vec<ClockDetails> {
        details(&["14:45", "15:05", "15:00", "14:40"], "15:00", 0)
    }

    #[test]
    fn test_summarize_town_clocks() {
        let summary = summarize(&town());

        assert_eq!(summary.total_clocks, 4);
        assert_eq!(summary.synchronized, 1);
        assert_eq!(summary.ahead, 1);
        assert_eq!(summary.behind, 2);
        assert_eq!(summary.max_difference, 20);
        assert_eq!(summary.min_difference, 0);
        assert_eq!(summary.average_difference, 10.0);
        assert_eq!(summary.median_difference, 10.0);
        assert_eq!(summary.total_drift, -30);
        assert_eq!(summary.synchronization_rate, 25);
        assert_eq!(summary.worst_performer.as_ref().unwrap().id, 4);
        assert_eq!(summary.best_performer.as_ref().unwrap().id, 2);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);

        assert_eq!(summary, Summary::default());
        assert_eq!(summary.total_clocks, 0);
        assert_eq!(summary.max_difference, 0);
        assert_eq!(summary.average_difference, 0.0);
        assert!(summary.worst_performer.is_none());
        assert!(summary.best_performer.is_none());
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        assert_eq!(average(&[1, 2, 2]), 1.7);
        assert_eq!(average(&[1, 2]), 1.5);
        assert_eq!(average(&[0, 0, 1]), 0.3);
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[20, 0, 5, 15]), 10.0);
        assert_eq!(median(&[7, 1, 3]), 3.0);
        assert_eq!(median(&[1, 2]), 1.5);
        assert_eq!(median(&[4]), 4.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_rate_rounding() {
        let d = details(&["15:00", "15:01", "15:02"], "15:00", 0);
        assert_eq!(synchronization_rate(&d), 33);

        let d = details(&["15:00", "15:00", "15:02"], "15:00", 0);
        assert_eq!(synchronization_rate(&d), 67);
    }

    #[test]
    fn test_tolerance_changes_counts() {
        let d = details(&["15:02", "14:58", "15:04", "14:56"], "15:00", 3);
        let summary = summarize(&d);

        assert_eq!(summary.synchronized, 2);
        assert_eq!(summary.ahead, 1);
        assert_eq!(summary.behind, 1);
        assert_eq!(summary.synchronization_rate, 50);
    }

    #[test]
    fn test_performer_ties_first_wins() {
        let d = details(&["15:10", "14:50", "15:03", "14:57", "15:00"], "15:00", 0);

        assert_eq!(worst_performer(&d).unwrap().id, 1);
        assert_eq!(best_performer(&d).unwrap().id, 3);
    }

    #[test]
    fn test_best_performer_none_when_all_synchronized() {
        let d = details(&["15:00", "15:00"], "15:00", 0);
        assert!(best_performer(&d).is_none());
        assert_eq!(worst_performer(&d).unwrap().id, 1);
    }

    #[test]
    fn test_insights_town_clocks() {
        let insights = insights(&summarize(&town()));

        assert_eq!(insights.len(), 2);
        assert!(insights[0].contains("Poor synchronization"));
        assert!(insights[1].contains("\"Clock 4\" requires immediate attention (20 min off)"));
    }

    #[test]
    fn test_insight_tiers() {
        let rate = |rate| Summary {
            synchronization_rate: rate,
            total_clocks: 4,
            ..Default::default()
        };

        assert!(insights(&rate(100))[0].contains("Perfect"));
        assert!(insights(&rate(75))[0].contains("Good"));
        assert!(insights(&rate(74))[0].contains("Moderate"));
        assert!(insights(&rate(50))[0].contains("Moderate"));
        assert!(insights(&rate(49))[0].contains("Poor"));
    }

    #[test]
    fn test_drift_insight_direction() {
        let fast = Summary {
            total_drift: 31,
            ..Default::default()
        };
        assert!(insights(&fast).iter().any(|i| i.contains("running fast")));

        let slow = Summary {
            total_drift: -45,
            ..Default::default()
        };
        assert!(insights(&slow).iter().any(|i| i.contains("running slow")));

        let boundary = Summary {
            total_drift: -30,
            ..Default::default()
        };
        assert!(!insights(&boundary).iter().any(|i| i.contains("drift")));
    }

    #[test]
    fn test_wide_variation_insight() {
        let d = details(&["15:00", "15:21"], "15:00", 0);
        let insights = insights(&summarize(&d));
        assert!(insights.iter().any(|i| i.contains("Wide variation")));
    }

    #[test]
    fn test_recommendations() {
        let summary = summarize(&town());
        let recs = recommendations(&summary);

        // rate 25, |drift| 30, max 20, average 10.0
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("Schedule immediate maintenance"));
        assert!(recs[1].contains("automatic synchronization"));

        let severe = Summary {
            total_clocks: 2,
            synchronization_rate: 100,
            max_difference: 45,
            average_difference: 10.5,
            ..Default::default()
        };
        let recs = recommendations(&severe);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("hardware"));
        assert!(recs[1].contains("frequency"));
    }

    #[test]
    fn test_recommendations_empty_registry() {
        assert!(recommendations(&summarize(&[])).is_empty());
    }
}
