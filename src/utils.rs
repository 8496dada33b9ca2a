//! Summary statistics on sample draws and csv output.
use crate::errors;
use serde::Serialize;
use std::path::Path;

/// Calculate the mean of a slice of f64 values.
///  - `numbers` is a reference to a slice of f64 values.
///  - Returns the mean of `numbers`.
///
/// # Examples
///
/// ```rust
/// let numbers = vec![1.0, 1.5, 2.0, 2.5, 3.0];
/// let mn = pmodel_calib::utils::mean(&numbers);
/// assert_eq!(2.0, mn);
/// ```
pub fn mean(numbers: &[f64]) -> f64 {
    let sum: f64 = numbers.iter().sum();

    sum / numbers.len() as f64
}

/// Calculate the median of a sorted slice of f64 values.
///  - `numbers` is a reference to a slice of f64 values in ascending order.
///  - Returns the median of `numbers`, or NaN if `numbers` is empty.
///
/// # Examples
///
/// ```rust
/// let numbers = vec![1.0, 3.0, 7.0, 10.0];
/// let med = pmodel_calib::utils::median(&numbers);
/// assert_eq!(5.0, med);
/// ```
pub fn median(numbers: &[f64]) -> f64 {
    let len = numbers.len();
    let mid = len / 2;
    if len == 0 {
        f64::NAN
    } else if len % 2 == 0 {
        mean(&numbers[(mid - 1)..(mid + 1)])
    } else {
        numbers[mid]
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(numbers: &[f64]) -> f64 {
    let mn = mean(numbers);
    let ss: f64 = numbers.iter().map(|x| (x - mn).powi(2)).sum();
    (ss / (numbers.len() as f64 - 1.0)).sqrt()
}

/// Quantile of sorted observations, interpolating linearly between order statistics
/// (the `(n - 1) p` rule, type 7 in Hyndman and Fan).
///  - `obs` is a reference to a slice of observations in ascending order.
///  - `thresh` is the probability, clamped to [0, 1].
///  - Returns NaN if `obs` is empty.
///
/// # Examples
///
/// ```rust
/// let obs: Vec<f64> = (1..=10).map(|x| x as f64).collect();
/// assert_eq!(3.25, pmodel_calib::utils::quantile(&obs, 0.25));
/// assert!((pmodel_calib::utils::quantile(&obs, 0.01) - 1.09).abs() < 1e-12);
/// ```
pub fn quantile(obs: &[f64], thresh: f64) -> f64 {
    if obs.is_empty() {
        return f64::NAN;
    }
    let h = (obs.len() - 1) as f64 * thresh.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    obs[lo] + (h - lo as f64) * (obs[hi] - obs[lo])
}

/// Write records to csv file.
pub fn record<T: Serialize, P: AsRef<Path>>(rec: &[T], path: P) -> Result<(), errors::CalibError> {
    if let Some(dir) = path.as_ref().parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for i in rec {
        wtr.serialize(i)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spread() {
        assert_relative_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138089935, epsilon = 1e-8);
        let obs: Vec<f64> = (1..=4).map(|x| x as f64).collect();
        assert_eq!(quantile(&obs, 1.0), 4.0);
        assert_eq!(quantile(&obs, 0.5), 2.5);
        assert_eq!(quantile(&obs, 0.0), 1.0);
        assert_relative_eq!(quantile(&obs, 0.025), 1.075, epsilon = 1e-12);
    }

    #[test]
    fn empty_draws_give_nan() {
        assert!(quantile(&[], 0.5).is_nan());
        assert!(median(&[]).is_nan());
        assert_eq!(quantile(&[3.0], 0.975), 3.0);
        assert_eq!(median(&[3.0]), 3.0);
    }

    #[test]
    fn record_writes_header_and_rows() {
        #[derive(Serialize)]
        struct Row {
            parameter: &'static str,
            value: f64,
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/rows.csv");
        record(
            &[
                Row { parameter: "kphio", value: 0.05 },
                Row { parameter: "err_gpp", value: 0.8 },
            ],
            &path,
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "parameter,value\nkphio,0.05\nerr_gpp,0.8\n");
    }
}
