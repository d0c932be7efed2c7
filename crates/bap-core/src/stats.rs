//! Per-pixel statistics over small value stacks.

/// Median via `select_nth_unstable`, without a full sort. Empty input gives 0.
pub fn median(values: &mut [f32]) -> f32 {
    let n = values.len();
    match n {
        0 => 0.0,
        1 => values[0],
        _ if n % 2 == 1 => *values.select_nth_unstable_by(n / 2, |a, b| a.total_cmp(b)).1,
        _ => {
            let mid = n / 2;
            values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
            values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
            (values[mid - 1] + values[mid]) / 2.0
        }
    }
}

/// Population mean and standard deviation.
pub fn mean_stddev(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean as f32, var.sqrt() as f32)
}

/// Percentile `p` (0..=100) with linear interpolation between closest
/// ranks. `sorted` must be ascending; empty input gives 0.
pub fn percentile(sorted: &[f32], p: f64) -> f32 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = (rank - lo as f64) as f32;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Most frequent value; ties go to the smallest. `sorted` must be ascending.
pub fn mode(sorted: &[f32]) -> f32 {
    let mut best = (0.0f32, 0usize);
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best.1 {
            best = (sorted[i], j - i);
        }
        i = j;
    }
    best.0
}

/// Mean of the values between two percentiles, both inclusive.
pub fn interval_mean(sorted: &[f32], lower: f64, upper: f64) -> f32 {
    let lo = percentile(sorted, lower);
    let hi = percentile(sorted, upper);
    let inside: Vec<f32> = sorted.iter().copied().filter(|&v| v >= lo && v <= hi).collect();
    if inside.is_empty() {
        return (lo + hi) / 2.0;
    }
    inside.iter().sum::<f32>() / inside.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [100.0, 102.0, 9999.0];
        assert_eq!(percentile(&sorted, 0.0), 100.0);
        assert_eq!(percentile(&sorted, 50.0), 102.0);
        assert_eq!(percentile(&sorted, 25.0), 101.0);
        assert_eq!(percentile(&sorted, 100.0), 9999.0);
    }

    #[test]
    fn test_mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[1.0, 2.0, 2.0, 3.0, 3.0]), 2.0);
        assert_eq!(mode(&[5.0]), 5.0);
    }

    #[test]
    fn test_interval_mean() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        // 50th = 3, 90th = 4.6: values 3 and 4.
        assert!((interval_mean(&sorted, 50.0, 90.0) - 3.5).abs() < 1e-6);
    }
}
