//! Poll analytics over the full response set.

use std::collections::{BTreeMap, HashSet};

use chrono::{Timelike, Utc};
use eventpoll_db::entities::{poll_option, poll_response};
use serde::Serialize;

/// Per-option analytics line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionAnalytics {
    pub option: poll_option::Model,
    pub count: u64,
    pub percentage: f64,
    /// Distinct identified users who picked this option.
    pub voters: u64,
}

/// Responses received during one hour of the day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub count: u64,
}

/// Aggregate analytics for one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollAnalytics {
    pub total_responses: u64,
    /// Distinct non-anonymous user ids.
    pub unique_voters: u64,
    pub average_responses_per_voter: f64,
    pub option_stats: Vec<OptionAnalytics>,
    pub responses_per_hour: Vec<HourBucket>,
    pub peak_hour: u32,
    pub total_comments: u64,
    pub comment_rate: f64,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl PollAnalytics {
    /// Compute analytics for `options` from `responses`.
    #[must_use]
    pub fn compute(
        options: &[poll_option::Model],
        responses: &[poll_response::Model],
    ) -> Self {
        let total_responses = responses.len() as u64;
        let unique_voters = responses
            .iter()
            .filter_map(|r| r.user_id.as_deref())
            .collect::<HashSet<_>>()
            .len() as u64;

        let mut option_stats: Vec<OptionAnalytics> = options
            .iter()
            .map(|option| {
                let picked: Vec<_> = responses
                    .iter()
                    .filter(|r| r.poll_option_id == option.id)
                    .collect();
                let voters = picked
                    .iter()
                    .filter_map(|r| r.user_id.as_deref())
                    .collect::<HashSet<_>>()
                    .len() as u64;
                let count = picked.len() as u64;

                OptionAnalytics {
                    option: option.clone(),
                    count,
                    percentage: percent(count, total_responses),
                    voters,
                }
            })
            .collect();
        option_stats.sort_by(|a, b| b.count.cmp(&a.count));

        let mut by_hour: BTreeMap<u32, u64> = BTreeMap::new();
        for response in responses {
            let hour = response.created_at.with_timezone(&Utc).hour();
            *by_hour.entry(hour).or_insert(0) += 1;
        }
        let responses_per_hour: Vec<HourBucket> = by_hour
            .into_iter()
            .map(|(hour, count)| HourBucket { hour, count })
            .collect();

        // First hour with the strictly highest count
        let peak_hour = responses_per_hour
            .iter()
            .fold(HourBucket { hour: 0, count: 0 }, |best, bucket| {
                if bucket.count > best.count {
                    *bucket
                } else {
                    best
                }
            })
            .hour;

        let total_comments = responses
            .iter()
            .filter(|r| r.comment.as_deref().is_some_and(|c| !c.trim().is_empty()))
            .count() as u64;

        Self {
            total_responses,
            unique_voters,
            average_responses_per_voter: if unique_voters == 0 {
                0.0
            } else {
                total_responses as f64 / unique_voters as f64
            },
            option_stats,
            responses_per_hour,
            peak_hour,
            total_comments,
            comment_rate: percent(total_comments, total_responses),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{option_fixture, response_fixture};
    use chrono::TimeZone;

    #[test]
    fn test_empty_poll() {
        let options = vec![option_fixture(1, 1, "A", 0)];

        let analytics = PollAnalytics::compute(&options, &[]);

        assert_eq!(analytics.total_responses, 0);
        assert_eq!(analytics.unique_voters, 0);
        assert_eq!(analytics.average_responses_per_voter, 0.0);
        assert_eq!(analytics.peak_hour, 0);
        assert!(analytics.responses_per_hour.is_empty());
        assert_eq!(analytics.option_stats[0].percentage, 0.0);
        assert_eq!(analytics.comment_rate, 0.0);
    }

    #[test]
    fn test_voters_hours_and_comments() {
        let options = vec![option_fixture(1, 1, "A", 0), option_fixture(2, 1, "B", 1)];
        let at = |h| Utc.with_ymd_and_hms(2025, 4, 2, h, 15, 0).unwrap();

        let mut responses = vec![
            response_fixture(1, 1, 1, Some("alice"), at(9)),
            response_fixture(2, 1, 2, Some("alice"), at(9)),
            response_fixture(3, 1, 2, Some("bob"), at(14)),
            response_fixture(4, 1, 2, None, at(14)),
            response_fixture(5, 1, 2, Some("carol"), at(20)),
        ];
        responses[0].comment = Some("great".to_string());
        responses[1].comment = Some("   ".to_string());

        let analytics = PollAnalytics::compute(&options, &responses);

        assert_eq!(analytics.total_responses, 5);
        assert_eq!(analytics.unique_voters, 3);
        assert!((analytics.average_responses_per_voter - 5.0 / 3.0).abs() < 1e-9);

        assert_eq!(analytics.option_stats[0].option.id, 2);
        assert_eq!(analytics.option_stats[0].count, 4);
        assert_eq!(analytics.option_stats[0].voters, 3);
        assert!((analytics.option_stats[0].percentage - 80.0).abs() < 1e-9);

        let hours: Vec<(u32, u64)> = analytics
            .responses_per_hour
            .iter()
            .map(|b| (b.hour, b.count))
            .collect();
        assert_eq!(hours, vec![(9, 2), (14, 2), (20, 1)]);
        assert_eq!(analytics.peak_hour, 9);

        assert_eq!(analytics.total_comments, 1);
        assert!((analytics.comment_rate - 20.0).abs() < 1e-9);
    }
}
