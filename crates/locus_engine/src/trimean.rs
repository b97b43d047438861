use crate::error::LocusError;

/// Percentile with linear interpolation between the floor and ceil ranks of a
/// sorted slice, `rank = p * (n - 1)`.
fn weighted_percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Tukey's trimean, `(Q1 + 2 * median + Q3) / 4`.
pub fn trimean(values: &[f64]) -> Result<f64, LocusError> {
    if values.is_empty() {
        return Err(LocusError::InvalidInput(
            "trimean of an empty set".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = weighted_percentile(&sorted, 0.25);
    let median = weighted_percentile(&sorted, 0.5);
    let q3 = weighted_percentile(&sorted, 0.75);

    Ok((q1 + 2.0 * median + q3) / 4.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimean_symmetric() {
        assert_eq!(trimean(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap(), 3.0);
    }

    #[test]
    fn test_trimean_resists_outlier() {
        let values = [1.0, 2.0, 3.0, 4.0, 100.0];
        let mean = values.iter().sum::<f64>() / values.len() as f64;

        let result = trimean(&values).unwrap();

        assert_eq!(mean, 22.0);
        assert_eq!(result, 3.0);
        assert!(result < mean);
    }

    #[test]
    fn test_trimean_interpolates() {
        // Q1 = 1.75, median = 2.5, Q3 = 3.25
        assert_eq!(trimean(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);

        // Q1 = 1.25, median = 1.5, Q3 = 1.75
        assert_eq!(trimean(&[1.0, 2.0]).unwrap(), 1.5);
    }

    #[test]
    fn test_trimean_single_value() {
        assert_eq!(trimean(&[42.0]).unwrap(), 42.0);
    }

    #[test]
    fn test_trimean_unsorted_input() {
        assert_eq!(
            trimean(&[5.0, 1.0, 4.0, 2.0, 3.0]).unwrap(),
            trimean(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap()
        );
    }

    #[test]
    fn test_trimean_empty() {
        assert!(matches!(trimean(&[]), Err(LocusError::InvalidInput(_))));
    }
}
