//! Descriptors and summaries derived from a calibration output.
use crate::calibrate::{CalibOutput, ChainFit, SamplerFit};
use crate::errors::{CalibError, Result};
use crate::utils;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Separator between distinct values when chains disagree on a setting.
pub const SEP: &str = "_";

/// Distinct values of a chain setting, in the order first encountered, joined by [SEP].
pub fn distinct<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    let mut seen: Vec<String> = Vec::new();
    for val in values {
        let val = val.to_string();
        if !seen.contains(&val) {
            seen.push(val);
        }
    }
    seen.join(SEP)
}

fn setting<T: ToString>(chains: &[ChainFit], field: &str, get: impl Fn(&ChainFit) -> T) -> String {
    let joined = distinct(chains.iter().map(get));
    if chains.len() > 1 && joined.contains(SEP) {
        warn!("Chains disagree on {}: {}", field, joined);
    }
    joined
}

/// Human-readable descriptor of the sampler settings, used to name output files.
///
/// # Examples
///
/// With three chains of 50000 DEzs iterations, 10000 of them burn-in, three internal chains
/// each and the experiment name `s1`, the descriptor is
/// `Setup-s1-Sampler-DEzs-50000iterations_ofwhich10000burnin_chains_3x3_`.
pub fn setup_string(out: &CalibOutput) -> Result<String> {
    let chains = match &out.model {
        SamplerFit::ChainList(x) => x,
        other => return Err(CalibError::UnexpectedModel(other.class().to_string())),
    };
    let nr_chains = setting(chains, "nrChains", |x| x.settings.nr_chains);
    let iterations = setting(chains, "iterations", |x| x.settings.iterations);
    let burnin = setting(chains, "burnin", |x| x.settings.burnin);
    let sampler = setting(chains, "sampler", |x| x.settings.sampler.clone());
    Ok(format!(
        "Setup-{}-Sampler-{}-{}iterations_ofwhich{}burnin_chains_{}x{}_",
        out.name,
        sampler,
        iterations,
        burnin,
        nr_chains,
        chains.len()
    ))
}

/// Total elapsed seconds over all runs.
pub fn runtime(out: &CalibOutput) -> f64 {
    out.model.chains().iter().map(|x| x.settings.runtime).sum()
}

/// Total runtime rounded to whole seconds, ties to even.
pub fn runtime_string(out: &CalibOutput) -> String {
    format!("Total runtime: {} secs", runtime(out).round_ties_even())
}

/// Marginal posterior summary of one parameter.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParSummary {
    /// Parameter name.
    pub parameter: String,
    /// Point estimate of the backend, if it reported one.
    pub estimate: Option<f64>,
    /// Posterior mean.
    pub mean: f64,
    /// Posterior median.
    pub median: f64,
    /// 2.5 % quantile.
    pub q025: f64,
    /// 97.5 % quantile.
    pub q975: f64,
}

/// Mean, median and 95% interval of every parameter's pooled posterior draws,
/// next to the point estimate reported by the backend.
pub fn posterior_summary(out: &CalibOutput) -> Result<Vec<ParSummary>> {
    let post = out.posterior()?;
    let mut rec = Vec::with_capacity(post.len());
    for (name, mut values) in post {
        if values.is_empty() {
            return Err(CalibError::Samples(format!("no posterior draws of {}", name)));
        }
        values.sort_by(|a, b| a.total_cmp(b));
        rec.push(ParSummary {
            estimate: out.par.get(&name).copied(),
            mean: utils::mean(&values),
            median: utils::median(&values),
            q025: utils::quantile(&values, 0.025),
            q975: utils::quantile(&values, 0.975),
            parameter: name,
        });
    }
    Ok(rec)
}

/// Write the posterior summary to csv.
pub fn write_summary<P: AsRef<Path>>(out: &CalibOutput, path: P) -> Result<()> {
    let rec = posterior_summary(out)?;
    utils::record(&rec, path)
}
