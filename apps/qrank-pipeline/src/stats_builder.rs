//! C8 — two passes over the final ranked CSV to produce a compact
//! JSON summary: the median row and a logarithmically down-sampled
//! set of `(entity, rank, views)` points cheap enough for a front end
//! to plot without shipping the entire ranking.

use qrank_domain_models::records::RankRecord;
use serde::Serialize;

/// Default number of top-ranked rows always kept as samples.
pub const DEFAULT_TOP_N: usize = 100;
/// Default number of samples the down-sampling curve targets; the
/// actual count can exceed this since the median and final rows are
/// always kept regardless of distance.
pub const DEFAULT_SAMPLE_COUNT: usize = 100;

const MIN_KEPT_DISTANCE_SQUARED: f64 = 16.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stats {
    #[serde(rename = "Median")]
    pub median: usize,
    #[serde(rename = "Samples")]
    pub samples: Vec<(String, u64, u64)>,
}

/// Summarises `ranks` (already in rank order: views descending, ties
/// broken by entity id ascending) into a median index plus a
/// down-sampled set of `(entity, rank, views)` points.
///
/// `top_n` rows are always kept, as is the median row and the final
/// (minimum-value) row; everything else is kept only once its
/// `(x, y)` position — rank scaled to `[0, sample_count]` on one axis,
/// `log10(views)` scaled the same way on the other — has moved far
/// enough from the last kept point.
pub fn build_stats(ranks: &[RankRecord], top_n: usize, sample_count: usize) -> Stats {
    let num_ranks = ranks.len();
    if num_ranks == 0 {
        return Stats { median: 0, samples: Vec::new() };
    }

    let median_rank = num_ranks / 2 + 1;
    let max_views = ranks[0].views as f64;
    let log_max_views = max_views.log10();
    let n = sample_count as f64;

    let mut samples = Vec::new();
    let mut median_index = 0;
    let mut last_kept: Option<(f64, f64)> = None;

    for (idx, record) in ranks.iter().enumerate() {
        let rank = idx + 1;
        let x = (rank as f64 / num_ranks as f64) * n;
        let y = if log_max_views == 0.0 { 0.0 } else { (record.views as f64).log10() / log_max_views * n };

        let is_last = rank == num_ranks;
        let is_median = rank == median_rank;
        let far_enough = last_kept.map(|(lx, ly)| (x - lx).powi(2) + (y - ly).powi(2) >= MIN_KEPT_DISTANCE_SQUARED).unwrap_or(true);

        if rank <= top_n || is_median || is_last || far_enough {
            if is_median {
                median_index = samples.len();
            }
            samples.push((record.entity.to_string(), rank as u64, record.views));
            last_kept = Some((x, y));
        }
    }

    Stats { median: median_index, samples }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrank_domain_models::entity::EntityId;

    fn rank(q: u64, views: u64) -> RankRecord {
        RankRecord { entity: EntityId::new(q).unwrap(), views }
    }

    #[test]
    fn summarises_an_empty_run() {
        let stats = build_stats(&[], DEFAULT_TOP_N, DEFAULT_SAMPLE_COUNT);
        assert_eq!(stats.median, 0);
        assert!(stats.samples.is_empty());
    }

    #[test]
    fn keeps_every_row_when_top_n_covers_the_whole_input() {
        let ranks = vec![rank(1, 30), rank(2, 10)];
        let stats = build_stats(&ranks, 10, 10);
        assert_eq!(stats.samples.len(), 2);
        assert_eq!(stats.samples[0], ("Q1".to_string(), 1, 30));
        assert_eq!(stats.samples[1], ("Q2".to_string(), 2, 10));
    }

    #[test]
    fn down_samples_and_locates_the_median_by_array_index() {
        let ranks = vec![
            rank(1, 4_721_864_130),
            rank(2, 107_330_319),
            rank(3, 69_160_330),
            rank(4, 5_111_172),
            rank(5, 51_123),
            rank(6, 156),
            rank(7, 1),
            rank(8, 1),
            rank(9, 1),
        ];
        let stats = build_stats(&ranks, 2, 5);

        assert_eq!(stats.median, 2);
        assert_eq!(
            stats.samples,
            vec![
                ("Q1".to_string(), 1, 4_721_864_130),
                ("Q2".to_string(), 2, 107_330_319),
                ("Q5".to_string(), 5, 51_123),
                ("Q9".to_string(), 9, 1),
            ]
        );
    }

    #[test]
    fn serialises_to_the_median_samples_schema() {
        let stats = build_stats(&[rank(1, 5)], DEFAULT_TOP_N, DEFAULT_SAMPLE_COUNT);
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"Median\":0"));
        assert!(json.contains("\"Samples\":[[\"Q1\",1,5]]"));
    }
}
