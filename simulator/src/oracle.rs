use std::collections::HashMap;

use crate::workload::Observations;

pub(crate) struct Oracle;

impl Oracle {
    pub(crate) fn check(obs: &Observations) -> Result<(), String> {
        if let Some(err) = obs.producer_errors.first() {
            return Err(format!("producer failed: {err}"));
        }
        if obs.overlaps > 0 {
            return Err(format!("{} tasks started while another was running", obs.overlaps));
        }

        for (i, pair) in obs.samples.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(format!(
                    "sample {} went backwards: {} -> {}",
                    i + 1,
                    pair[0],
                    pair[1]
                ));
            }
        }
        if let Some(max) = obs.samples.iter().copied().max() {
            if max > obs.expected {
                return Err(format!("sampled {max} rows but only {} were inserted", obs.expected));
            }
        }
        if obs.final_count != obs.expected {
            return Err(format!(
                "final count {} does not match {} inserts",
                obs.final_count, obs.expected
            ));
        }

        // Each producer awaits its inserts one by one, so its rows land in seq order.
        let mut next_seq: HashMap<i64, i64> = HashMap::new();
        for &(producer, seq) in &obs.rows {
            let expected = next_seq.entry(producer).or_insert(0);
            if seq != *expected {
                return Err(format!(
                    "producer {producer} stored seq {seq} where {expected} was due"
                ));
            }
            *expected += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> Observations {
        Observations {
            expected: 3,
            samples: vec![0, 1, 1, 3],
            final_count: 3,
            rows: vec![(0, 0), (1, 0), (0, 1)],
            executed: 9,
            ..Observations::default()
        }
    }

    #[test]
    fn healthy_run_passes() {
        assert_eq!(Oracle::check(&healthy()), Ok(()));
    }

    #[test]
    fn decreasing_samples_fail() {
        let obs = Observations {
            samples: vec![0, 2, 1],
            ..healthy()
        };
        assert!(Oracle::check(&obs).is_err_and(|e| e.contains("backwards")));
    }

    #[test]
    fn overshoot_and_short_final_fail() {
        let over = Observations {
            samples: vec![0, 4],
            ..healthy()
        };
        assert!(Oracle::check(&over).is_err());
        let short = Observations {
            final_count: 2,
            ..healthy()
        };
        assert!(Oracle::check(&short).is_err_and(|e| e.contains("final count")));
    }

    #[test]
    fn overlap_and_reordering_fail() {
        let overlap = Observations {
            overlaps: 1,
            ..healthy()
        };
        assert!(Oracle::check(&overlap).is_err());
        let reordered = Observations {
            rows: vec![(0, 1), (0, 0), (1, 0)],
            ..healthy()
        };
        assert!(Oracle::check(&reordered).is_err_and(|e| e.contains("producer 0")));
    }
}
