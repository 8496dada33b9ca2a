//! Prior and posterior samples in long format, and their kernel density estimates.
use crate::calibrate::CalibOutput;
use crate::errors::{CalibError, Result};
use crate::settings::CalibSettings;
use crate::utils;
use indexmap::IndexMap;
use log::debug;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::path::Path;

/// Number of prior draws compared against the posterior.
pub const PRIOR_DRAWS: usize = 10_000;

/// Grid points of a density estimate.
pub const GRID: usize = 512;

/// Distribution a sample was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Distrib {
    /// Draws from the calibrated posterior.
    Posterior,
    /// Draws from the uniform prior.
    Prior,
}

impl fmt::Display for Distrib {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Distrib::Posterior => write!(f, "posterior"),
            Distrib::Prior => write!(f, "prior"),
        }
    }
}

/// One sampled value of one parameter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DensityRow {
    /// Parameter name.
    pub parameter: String,
    /// Sampled value.
    pub value: f64,
    /// Distribution the value was drawn from.
    pub distrib: Distrib,
}

/// Density curve of a parameter under one distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Kde {
    /// Parameter name.
    pub parameter: String,
    /// Distribution the curve estimates.
    pub distrib: Distrib,
    /// Kernel standard deviation.
    pub bandwidth: f64,
    /// (value, density) pairs on an even grid.
    pub points: Vec<(f64, f64)>,
}

fn draws_per_param(samples: &IndexMap<String, Vec<f64>>, label: Distrib) -> Result<usize> {
    let n = samples.values().next().map(|x| x.len()).unwrap_or(0);
    match samples.iter().find(|(_, v)| v.len() != n) {
        Some((name, v)) => Err(CalibError::Samples(format!(
            "{} draws of {} number {}, expected {}",
            label,
            name,
            v.len(),
            n
        ))),
        None => Ok(n),
    }
}

/// Stack posterior and prior draws into long rows keyed by parameter.
/// Both maps must hold the same parameters, each with the same number of draws.
pub fn tidy(
    posterior: &IndexMap<String, Vec<f64>>,
    prior: &IndexMap<String, Vec<f64>>,
) -> Result<Vec<DensityRow>> {
    if posterior.len() != prior.len() || posterior.keys().any(|k| !prior.contains_key(k)) {
        return Err(CalibError::Samples(format!(
            "posterior parameters {:?} do not match prior parameters {:?}",
            posterior.keys().collect::<Vec<_>>(),
            prior.keys().collect::<Vec<_>>()
        )));
    }
    let n_post = draws_per_param(posterior, Distrib::Posterior)?;
    let n_prior = draws_per_param(prior, Distrib::Prior)?;
    let mut rows = Vec::with_capacity((n_post + n_prior) * posterior.len());
    for (label, samples) in [(Distrib::Posterior, posterior), (Distrib::Prior, prior)] {
        for name in posterior.keys() {
            rows.extend(samples[name].iter().map(|x| DensityRow {
                parameter: name.clone(),
                value: *x,
                distrib: label,
            }));
        }
    }
    debug!(
        "Reshaped {} posterior and {} prior draws of {} parameters.",
        n_post,
        n_prior,
        posterior.len()
    );
    Ok(rows)
}

/// Draw `n_prior` samples from the priors in `settings` and stack them with the posterior of `out`.
pub fn prior_posterior<R: Rng + ?Sized>(
    out: &CalibOutput,
    settings: &CalibSettings,
    n_prior: usize,
    rng: &mut R,
) -> Result<Vec<DensityRow>> {
    let prior = settings.sample_prior(n_prior, rng)?;
    let posterior = out.posterior()?;
    tidy(&posterior, &prior)
}

/// Normal reference bandwidth, `0.9 min(sd, IQR / 1.34) n^-1/5`.
pub fn bandwidth(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let sd = if values.len() > 1 { utils::std_dev(values) } else { 0.0 };
    let iqr = utils::quantile(&sorted, 0.75) - utils::quantile(&sorted, 0.25);
    let mut lo = sd.min(iqr / 1.34);
    for fallback in [sd, values[0].abs(), 1.0] {
        if lo > 0.0 {
            break;
        }
        lo = fallback;
    }
    0.9 * lo * (values.len() as f64).powf(-0.2)
}

/// Gaussian kernel density of `values` on `n` grid points spanning three bandwidths
/// beyond the data.  Values are binned linearly onto the grid before smoothing.
pub fn kde(values: &[f64], n: usize) -> (f64, Vec<(f64, f64)>) {
    let bw = bandwidth(values);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let lo = min - 3.0 * bw;
    let hi = max + 3.0 * bw;
    let delta = (hi - lo) / (n - 1) as f64;
    let weight = 1.0 / values.len() as f64;

    let mut bins = vec![0.0; n];
    for x in values {
        let pos = (x - lo) / delta;
        let j = (pos.floor() as usize).min(n - 2);
        let frac = pos - j as f64;
        bins[j] += (1.0 - frac) * weight;
        bins[j + 1] += frac * weight;
    }

    let norm = 1.0 / (bw * (2.0 * PI).sqrt());
    let points = (0..n)
        .map(|i| {
            let dens: f64 = bins
                .iter()
                .enumerate()
                .filter(|(_, w)| **w > 0.0)
                .map(|(j, w)| {
                    let z = (i as f64 - j as f64) * delta / bw;
                    w * norm * (-0.5 * z * z).exp()
                })
                .sum();
            (lo + i as f64 * delta, dens)
        })
        .collect();
    (bw, points)
}

/// Density estimates of every (parameter, distribution) group in `rows`, in order of appearance.
pub fn densities(rows: &[DensityRow], n: usize) -> Vec<Kde> {
    let mut groups: IndexMap<(String, Distrib), Vec<f64>> = IndexMap::new();
    for row in rows {
        groups
            .entry((row.parameter.clone(), row.distrib))
            .or_default()
            .push(row.value);
    }
    groups
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|((parameter, distrib), values)| {
            let (bandwidth, points) = kde(&values, n);
            Kde {
                parameter,
                distrib,
                bandwidth,
                points,
            }
        })
        .collect()
}

/// Write the long table to csv.
pub fn write_rows<P: AsRef<Path>>(rows: &[DensityRow], path: P) -> Result<()> {
    utils::record(rows, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::tests::fit;
    use crate::settings::Setup;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn row_count_and_labels() {
        let (settings, _) = Setup::S1.settings().unwrap();
        let out = fit(&settings, 3, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        let rows = prior_posterior(&out, &settings, 250, &mut rng).unwrap();
        // 3 chains of 2 draws each
        assert_eq!(rows.len(), (6 + 250) * 4);
        let n_post = rows.iter().filter(|x| x.distrib == Distrib::Posterior).count();
        assert_eq!(n_post, 6 * 4);
        assert!(rows
            .iter()
            .all(|x| ["posterior", "prior"].contains(&x.distrib.to_string().as_str())));
        assert_eq!(rows[0].parameter, "kphio");
        assert_eq!(rows[0].distrib, Distrib::Posterior);
    }

    #[test]
    fn invalid_prior_is_an_error_not_a_panic() {
        let (settings, _) = Setup::S1.settings().unwrap();
        let out = fit(&settings, 1, 1.0);
        let mut bad = settings.clone();
        bad.par["kphio"].lower = 0.2;
        bad.par["kphio"].upper = 0.02;
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            prior_posterior(&out, &bad, 10, &mut rng),
            Err(CalibError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn mismatched_parameters_are_rejected() {
        let mut post = IndexMap::new();
        post.insert("kphio".to_string(), vec![0.1, 0.2]);
        let mut prior = IndexMap::new();
        prior.insert("err_gpp".to_string(), vec![1.0]);
        assert!(tidy(&post, &prior).is_err());
        prior.insert("kphio".to_string(), vec![0.1, 0.3]);
        post.insert("err_gpp".to_string(), vec![0.5]);
        assert!(matches!(tidy(&post, &prior), Err(CalibError::Samples(_))));
    }

    #[test]
    fn distrib_serializes_lowercase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![DensityRow {
            parameter: "kphio".to_string(),
            value: 0.5,
            distrib: Distrib::Prior,
        }];
        write_rows(&rows, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "parameter,value,distrib\nkphio,0.5,prior\n");
    }

    #[test]
    fn bandwidth_matches_normal_reference() {
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        // sd = 3.02765, IQR = 4.5, so sd wins
        assert_relative_eq!(
            bandwidth(&values),
            0.9 * 3.0276503540974917 * 10f64.powf(-0.2),
            epsilon = 1e-9
        );
        assert_relative_eq!(bandwidth(&[2.0, 2.0]), 0.9 * 2.0 * 2f64.powf(-0.2));
    }

    #[test]
    fn density_integrates_to_one() {
        let mut rng = StdRng::seed_from_u64(42);
        let values: Vec<f64> = (0..5000).map(|_| rng.gen::<f64>()).collect();
        let (_, points) = kde(&values, GRID);
        let delta = points[1].0 - points[0].0;
        let area: f64 = points.iter().map(|p| p.1 * delta).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-2);
        let peak = points.iter().map(|p| p.1).fold(0.0, f64::max);
        assert!(peak > 0.8 && peak < 1.3);
    }

    #[test]
    fn densities_follow_row_order() {
        let (settings, _) = Setup::S1.settings().unwrap();
        let out = fit(&settings, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let rows = prior_posterior(&out, &settings, 100, &mut rng).unwrap();
        let kdes = densities(&rows, 64);
        assert_eq!(kdes.len(), 8);
        assert_eq!(kdes[0].parameter, "kphio");
        assert_eq!(kdes[0].distrib, Distrib::Posterior);
        assert_eq!(kdes[4].distrib, Distrib::Prior);
        assert!(kdes.iter().all(|x| x.points.len() == 64));
    }
}
