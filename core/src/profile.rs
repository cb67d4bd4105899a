//! Segment profile engine: per-segment means and the normalized radar vector.
//!
//! Groups come from the filtered customer view only, so the profile
//! always reflects the active filter. Normalization is relative to the
//! groups present in this result, not to the whole population.

use crate::{filter::FilteredView, snapshot::CustomerFeatures, types::SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Radar coordinates, each in [0, 1]. Recency is inverted: more recent
/// activity (fewer days) scores higher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProfile {
    pub monetary: f64,
    pub frequency: f64,
    pub recency: f64,
    pub value_score: f64,
}

impl NormalizedProfile {
    pub fn coordinates(&self) -> [f64; 4] {
        [self.monetary, self.frequency, self.recency, self.value_score]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment: SegmentId,
    pub customer_count: usize,
    pub monetary_mean: f64,
    pub frequency_mean: f64,
    pub recency_mean: f64,
    pub value_score_mean: f64,
    pub normalized: NormalizedProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentShare {
    pub segment: SegmentId,
    pub count: usize,
    /// Percent of the filtered customer view.
    pub percentage: f64,
}

fn group_by_segment<'a>(
    view: &FilteredView<'a>,
) -> BTreeMap<SegmentId, Vec<&'a CustomerFeatures>> {
    let mut groups: BTreeMap<SegmentId, Vec<&CustomerFeatures>> = BTreeMap::new();
    for &c in &view.customers {
        groups.entry(c.cluster).or_default().push(c);
    }
    groups
}

fn mean_of(members: &[&CustomerFeatures], f: impl Fn(&CustomerFeatures) -> f64) -> f64 {
    // Groups are never empty: they only exist once a member is pushed.
    members.iter().map(|c| f(*c)).sum::<f64>() / members.len() as f64
}

/// `value / max`, clamped into [0, 1]. With a non-positive max the group
/// at the max is its own reference and scores 1.0.
fn scaled(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else if value >= max {
        1.0
    } else {
        0.0
    }
}

pub fn compute_segment_profile(view: &FilteredView<'_>) -> Vec<SegmentProfile> {
    let groups = group_by_segment(view);

    let means: Vec<(SegmentId, usize, [f64; 4])> = groups
        .iter()
        .map(|(&segment, members)| {
            (
                segment,
                members.len(),
                [
                    mean_of(members, |c| c.monetary),
                    mean_of(members, |c| c.frequency),
                    mean_of(members, |c| c.recency),
                    mean_of(members, |c| c.customer_value_score),
                ],
            )
        })
        .collect();

    let mut max = [f64::NEG_INFINITY; 4];
    for (_, _, m) in &means {
        for (hi, v) in max.iter_mut().zip(m) {
            *hi = hi.max(*v);
        }
    }

    means
        .into_iter()
        .map(|(segment, customer_count, [monetary, frequency, recency, value_score])| {
            SegmentProfile {
                segment,
                customer_count,
                monetary_mean: monetary,
                frequency_mean: frequency,
                recency_mean: recency,
                value_score_mean: value_score,
                normalized: NormalizedProfile {
                    monetary: scaled(monetary, max[0]),
                    frequency: scaled(frequency, max[1]),
                    recency: 1.0 - scaled(recency, max[2]),
                    value_score: scaled(value_score, max[3]),
                },
            }
        })
        .collect()
}

/// Customer count per segment and its share of the filtered view.
pub fn compute_segment_distribution(view: &FilteredView<'_>) -> Vec<SegmentShare> {
    let total = view.customers.len();
    group_by_segment(view)
        .into_iter()
        .map(|(segment, members)| SegmentShare {
            segment,
            count: members.len(),
            percentage: members.len() as f64 / total as f64 * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_handles_degenerate_maxima() {
        assert_eq!(scaled(5.0, 10.0), 0.5);
        assert_eq!(scaled(10.0, 10.0), 1.0);
        assert_eq!(scaled(0.0, 0.0), 1.0);
        assert_eq!(scaled(-3.0, 0.0), 0.0);
        assert_eq!(scaled(-2.0, 4.0), 0.0);
    }
}
