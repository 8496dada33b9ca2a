//! Paths and backend command of an analysis run.
use crate::calibrate::ExternalCalibrator;
use crate::settings::Setup;
use std::path::{Path, PathBuf};

/// Where a run reads drivers, writes results and finds the calibration backend.
///
/// # Examples
///
/// ```
/// use pmodel_calib::config::RunConfig;
/// let config = RunConfig::new()
///     .drivers("data/p_model_drivers.csv")
///     .out_dir("data/calib")
///     .plots(false);
/// assert!(!config.plots);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Driver csv.
    pub drivers: PathBuf,
    /// Directory of the saved calibration outputs and summaries.
    pub out_dir: PathBuf,
    /// Directory of the figures.
    pub fig_dir: PathBuf,
    /// Scratch directory of the backend request and response files.
    pub workdir: PathBuf,
    /// Backend program.
    pub program: PathBuf,
    /// Arguments placed before the request and response paths.
    pub args: Vec<String>,
    /// Experiment variants to run, in order.
    pub setups: Vec<Setup>,
    /// Whether to draw figures after each calibration.
    pub plots: bool,
    /// Seed of the prior draws in the density figures.
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig::new()
    }
}

impl RunConfig {
    /// Defaults relative to the working directory, running S1 and S2 with figures.
    pub fn new() -> Self {
        RunConfig {
            drivers: PathBuf::from("data/p_model_drivers.csv"),
            out_dir: PathBuf::from("data/calib"),
            fig_dir: PathBuf::from("fig"),
            workdir: PathBuf::from("data/calib/work"),
            program: PathBuf::from("calibrate-pmodel"),
            args: Vec::new(),
            setups: vec![Setup::S1, Setup::S2],
            plots: true,
            seed: 1982,
        }
    }

    /// Driver csv to read.
    pub fn drivers<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.drivers = path.as_ref().to_path_buf();
        self
    }

    /// Directory receiving calibration outputs.
    pub fn out_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.out_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory receiving figures.
    pub fn fig_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.fig_dir = path.as_ref().to_path_buf();
        self
    }

    /// Backend program and its leading arguments.
    pub fn backend<P: AsRef<Path>>(mut self, program: P, args: &[&str]) -> Self {
        self.program = program.as_ref().to_path_buf();
        self.args = args.iter().map(|x| x.to_string()).collect();
        self
    }

    /// Experiment variants to run.
    pub fn setups(mut self, setups: &[Setup]) -> Self {
        self.setups = setups.to_vec();
        self
    }

    /// Switch figure drawing on or off.
    pub fn plots(mut self, plots: bool) -> Self {
        self.plots = plots;
        self
    }

    /// Seed of the prior draws.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Calibrator exchanging files in the configured working directory.
    pub fn calibrator(&self) -> ExternalCalibrator {
        ExternalCalibrator::new(&self.program)
            .args(&self.args)
            .workdir(&self.workdir)
    }

    /// Figure path of a setup, e.g. `fig/s1_density.svg`.
    pub fn figure(&self, setup: Setup, kind: &str, ext: &str) -> PathBuf {
        self.fig_dir.join(format!("{}_{}.{}", setup.name(), kind, ext))
    }
}
