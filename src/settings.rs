//! Prior bounds, sampler control and the experiment variants of the calibration.
use crate::errors::{CalibError, Result};
use indexmap::IndexMap;
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values of P-model parameters held fixed during a calibration, by parameter name.
pub type FixedParams = IndexMap<String, f64>;

/// Prior bounds and starting value of a calibrated parameter.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Parameter {
    /// Lower bound of the prior.
    pub lower: f64,
    /// Upper bound of the prior.
    pub upper: f64,
    /// Starting value of the sampler.
    pub init: f64,
}

impl Parameter {
    /// Create a parameter with a uniform prior on [`lower`, `upper`] starting at `init`.
    /// Fails if any value is not finite or if `init` falls outside the bounds.
    ///
    /// # Examples
    ///
    /// ```
    /// use pmodel_calib::settings::Parameter;
    /// let kphio = Parameter::new("kphio", 0.02, 0.2, 0.05).unwrap();
    /// assert!(Parameter::new("kphio", 0.02, 0.2, 0.5).is_err());
    /// ```
    pub fn new(name: &str, lower: f64, upper: f64, init: f64) -> Result<Self> {
        let par = Parameter { lower, upper, init };
        par.check(name)?;
        Ok(par)
    }

    fn check(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| CalibError::InvalidParameter {
            name: name.to_string(),
            reason,
        };
        if !(self.lower.is_finite() && self.upper.is_finite() && self.init.is_finite()) {
            return Err(invalid(format!(
                "bounds and init must be finite (lower = {}, upper = {}, init = {})",
                self.lower, self.upper, self.init
            )));
        }
        if self.lower > self.upper {
            return Err(invalid(format!(
                "lower bound {} exceeds upper bound {}",
                self.lower, self.upper
            )));
        }
        if self.init < self.lower || self.init > self.upper {
            return Err(invalid(format!(
                "init {} lies outside [{}, {}]",
                self.init, self.lower, self.upper
            )));
        }
        Ok(())
    }

    /// Uniform prior between the parameter bounds.
    /// Only call on a parameter that passed validation; inverted bounds panic in `rand`.
    fn prior(&self) -> Uniform<f64> {
        Uniform::new_inclusive(self.lower, self.upper)
    }
}

/// MCMC samplers understood by the calibration backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Sampler {
    /// Differential evolution with snooker update.
    DEzs,
    /// DREAM with snooker update.
    DREAMzs,
    /// Adaptive Metropolis.
    Metropolis,
}

impl fmt::Display for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Sampler::DEzs => write!(f, "DEzs"),
            Sampler::DREAMzs => write!(f, "DREAMzs"),
            Sampler::Metropolis => write!(f, "Metropolis"),
        }
    }
}

/// Calibration method passed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Method {
    /// MCMC samplers of the BayesianTools package.
    BayesianTools,
}

/// Target function evaluated by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Gaussian log-likelihood of simulated against observed GPP.
    CostLikelihoodPmodel,
}

/// Iteration controls of each sampler run.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerSettings {
    /// Iterations discarded at the start of each run.
    pub burnin: usize,
    /// Total iterations of each run, burn-in included.
    pub iterations: usize,
    /// Internal chains of a single DEzs run.
    pub nr_chains: usize,
}

/// Sampler choice and the number of independent runs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Control {
    /// Sampler used for every run.
    pub sampler: Sampler,
    /// Iteration controls shared by every run.
    pub settings: SamplerSettings,
    /// Independent (external) chains.
    pub n_chains: usize,
}

/// Complete description of one calibration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalibSettings {
    /// Calibration method.
    pub method: Method,
    /// Likelihood evaluated by the backend.
    pub metric: Metric,
    /// Sampler choice and chain counts.
    pub control: Control,
    /// Calibrated parameters by name, in the order the backend sees them.
    pub par: IndexMap<String, Parameter>,
}

impl Default for CalibSettings {
    fn default() -> Self {
        CalibSettings::new()
    }
}

impl CalibSettings {
    /// Settings with the DEzs defaults (3 x 3 chains, 50000 iterations of which 10000 burn-in)
    /// and no calibrated parameters.  Add parameters with [param](#method.param).
    pub fn new() -> Self {
        CalibSettings {
            method: Method::BayesianTools,
            metric: Metric::CostLikelihoodPmodel,
            control: Control {
                sampler: Sampler::DEzs,
                settings: SamplerSettings {
                    burnin: 10_000,
                    iterations: 50_000,
                    nr_chains: 3,
                },
                n_chains: 3,
            },
            par: IndexMap::new(),
        }
    }

    /// Sampler used for every run.
    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.control.sampler = sampler;
        self
    }

    /// Iterations discarded before draws are kept.
    pub fn burnin(mut self, burnin: usize) -> Self {
        self.control.settings.burnin = burnin;
        self
    }

    /// Total iterations of each run.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.control.settings.iterations = iterations;
        self
    }

    /// Number of independent sampler runs.
    pub fn chains(mut self, n: usize) -> Self {
        self.control.n_chains = n;
        self
    }

    /// Number of chains inside each sampler run.
    pub fn internal_chains(mut self, n: usize) -> Self {
        self.control.settings.nr_chains = n;
        self
    }

    /// Add a calibrated parameter, replacing any earlier entry of the same name.
    pub fn param(mut self, name: &str, par: Parameter) -> Self {
        self.par.insert(name.to_string(), par);
        self
    }

    /// Names of the calibrated parameters in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.par.keys().cloned().collect()
    }

    /// Check the settings can be handed to the backend together with `fixed`.
    pub fn validate(&self, fixed: &FixedParams) -> Result<()> {
        if self.par.is_empty() {
            return Err(CalibError::InvalidSettings(
                "no parameters to calibrate".to_string(),
            ));
        }
        for (name, par) in &self.par {
            par.check(name)?;
            if fixed.contains_key(name) {
                return Err(CalibError::Overlap(name.clone()));
            }
        }
        let settings = &self.control.settings;
        if settings.burnin >= settings.iterations {
            return Err(CalibError::InvalidSettings(format!(
                "burn-in ({}) must be shorter than the run ({} iterations)",
                settings.burnin, settings.iterations
            )));
        }
        if settings.nr_chains == 0 || self.control.n_chains == 0 {
            return Err(CalibError::InvalidSettings(
                "chain counts must be at least one".to_string(),
            ));
        }
        debug!(
            "Validated {} calibrated and {} fixed parameters.",
            self.par.len(),
            fixed.len()
        );
        Ok(())
    }

    /// Draw `n` independent samples from the prior of every calibrated parameter.
    /// Fails on the first parameter whose bounds cannot form a prior.
    pub fn sample_prior<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<IndexMap<String, Vec<f64>>> {
        let mut draws = IndexMap::new();
        for (name, par) in &self.par {
            par.check(name)?;
            let prior = par.prior();
            let values: Vec<f64> = (0..n).map(|_| prior.sample(rng)).collect();
            draws.insert(name.clone(), values);
        }
        Ok(draws)
    }
}

/// Experiment variants of the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setup {
    /// Quantum yield parameters and GPP error only.
    S1,
    /// All P-model parameters.
    S2,
    /// GPP plus leaf trait ratios.  Not implemented.
    S3,
}

impl Setup {
    /// Experiment name used to tag results.
    pub fn name(&self) -> &'static str {
        match self {
            Setup::S1 => "s1",
            Setup::S2 => "s2",
            Setup::S3 => "s3",
        }
    }

    /// Target variables fitted by the setup.
    pub fn targets(&self) -> Vec<String> {
        vec!["gpp".to_string()]
    }

    /// Calibrated and fixed parameters of the setup.
    pub fn settings(&self) -> Result<(CalibSettings, FixedParams)> {
        match self {
            Setup::S1 => {
                let settings = quantum_yield()?;
                let fixed: FixedParams = [
                    ("soilm_thetastar", 0.6 * 240.0),
                    ("soilm_betao", 0.0),
                    ("beta_unitcostratio", 146.0),
                    ("rd_to_vcmax", 0.014),
                    ("tau_acclim", 30.0),
                    ("kc_jmax", 0.41),
                ]
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect();
                Ok((settings, fixed))
            }
            Setup::S2 => {
                let settings = quantum_yield()?
                    .param(
                        "soilm_thetastar",
                        Parameter::new("soilm_thetastar", 0.0, 240.0, 144.0)?,
                    )
                    .param("soilm_betao", Parameter::new("soilm_betao", 0.0, 1.0, 0.2)?)
                    .param(
                        "beta_unitcostratio",
                        Parameter::new("beta_unitcostratio", 50.0, 200.0, 146.0)?,
                    )
                    .param("rd_to_vcmax", Parameter::new("rd_to_vcmax", 0.01, 0.1, 0.014)?)
                    .param("tau_acclim", Parameter::new("tau_acclim", 7.0, 60.0, 30.0)?)
                    .param("kc_jmax", Parameter::new("kc_jmax", 0.2, 0.8, 0.41)?);
                Ok((settings, FixedParams::new()))
            }
            // TODO: combine GPP and leaf trait likelihoods once the backend exposes a joint cost.
            Setup::S3 => Err(CalibError::Unimplemented(self.name().to_string())),
        }
    }
}

/// Parameters shared by every setup, calibrated with the default sampler controls.
fn quantum_yield() -> Result<CalibSettings> {
    // err_gpp is the standard deviation of the Gaussian GPP error model.
    Ok(CalibSettings::new()
        .param("kphio", Parameter::new("kphio", 0.02, 0.2, 0.05)?)
        .param("kphio_par_a", Parameter::new("kphio_par_a", -0.004, -0.001, -0.0025)?)
        .param("kphio_par_b", Parameter::new("kphio_par_b", 10.0, 30.0, 20.0)?)
        .param("err_gpp", Parameter::new("err_gpp", 0.1, 3.0, 0.8)?))
}
