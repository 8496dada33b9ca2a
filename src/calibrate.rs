//! Boundary to the calibration backend and the result bundle it returns.
//!
//! The MCMC sampler and the P-model itself live outside this crate.  A [Calibrator]
//! receives the drivers, the GPP observations, the settings and the fixed parameters,
//! and hands back a [CalibOutput] holding the fitted chains.  [ExternalCalibrator]
//! exchanges json files with a backend program; tests substitute their own implementation.
use crate::drivers::{Drivers, Validation};
use crate::errors::{CalibError, Result};
use crate::settings::{CalibSettings, FixedParams, Setup};
use crate::summary;
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Settings a single sampler run reports back, including its wall-clock runtime in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSettings {
    /// Iterations of the run, burn-in included.
    pub iterations: usize,
    /// Iterations discarded before the returned draws.
    pub burnin: usize,
    /// Internal chains of the run.
    pub nr_chains: usize,
    /// Sampler name as reported by the backend.
    pub sampler: String,
    /// Wall-clock seconds.
    pub runtime: f64,
}

/// One independent sampler run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChainFit {
    /// Controls the run was made with.
    pub settings: ChainSettings,
    /// Column names of `draws`.
    pub param_names: Vec<String>,
    /// Post burn-in draws, one row per draw and one column per parameter.
    pub draws: Vec<Vec<f64>>,
}

impl ChainFit {
    /// Draws of parameter column `i`.
    pub fn column(&self, i: usize) -> Vec<f64> {
        self.draws.iter().map(|row| row[i]).collect()
    }

    fn check(&self) -> Result<()> {
        let n = self.param_names.len();
        match self.draws.iter().position(|row| row.len() != n) {
            Some(i) => Err(CalibError::Samples(format!(
                "draw {} has {} values for {} parameters",
                i,
                self.draws[i].len(),
                n
            ))),
            None => Ok(()),
        }
    }
}

/// Fitted sampler state, either a list of independent runs or a single run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "class", content = "fit")]
pub enum SamplerFit {
    /// Independent runs of the same sampler.
    ChainList(Vec<ChainFit>),
    /// One run on its own.
    Single(ChainFit),
}

impl SamplerFit {
    /// Name of the variant, for error messages.
    pub fn class(&self) -> &'static str {
        match self {
            SamplerFit::ChainList(_) => "a chain list",
            SamplerFit::Single(_) => "a single sampler",
        }
    }

    /// All runs held by the fit.
    pub fn chains(&self) -> &[ChainFit] {
        match self {
            SamplerFit::ChainList(x) => x,
            SamplerFit::Single(x) => std::slice::from_ref(x),
        }
    }
}

/// Result of a calibration, tagged with the experiment it belongs to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalibOutput {
    /// Experiment name, empty until tagged.
    #[serde(default)]
    pub name: String,
    /// Point estimates of the calibrated parameters.
    pub par: IndexMap<String, f64>,
    /// Sampler state with the posterior draws.
    #[serde(rename = "mod")]
    pub model: SamplerFit,
}

impl CalibOutput {
    /// Tag the output with an experiment name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Posterior draws of all runs pooled by parameter, in the column order of the first run.
    pub fn posterior(&self) -> Result<IndexMap<String, Vec<f64>>> {
        let chains = self.model.chains();
        let first = chains
            .first()
            .ok_or_else(|| CalibError::Samples("calibration output holds no chains".to_string()))?;
        let mut pooled: IndexMap<String, Vec<f64>> = first
            .param_names
            .iter()
            .map(|x| (x.clone(), Vec::new()))
            .collect();
        for chain in chains {
            chain.check()?;
            if chain.param_names != first.param_names {
                return Err(CalibError::Samples(format!(
                    "chains disagree on parameters: {:?} vs {:?}",
                    first.param_names, chain.param_names
                )));
            }
            for (i, values) in pooled.values_mut().enumerate() {
                values.extend(chain.draws.iter().map(|row| row[i]));
            }
        }
        Ok(pooled)
    }

    /// Write the output as json.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut wtr = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut wtr, self)?;
        wtr.flush()?;
        info!("Saved calibration output to {}.", path.display());
        Ok(())
    }

    /// Read an output written by [save](#method.save) or by the backend.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(rdr)?)
    }
}

/// Everything the backend needs to run one calibration.
#[derive(Debug, Serialize)]
pub struct CalibRequest<'a> {
    /// Forcing of every site.
    pub drivers: &'a Drivers,
    /// Observed GPP the likelihood is evaluated against.
    pub obs: &'a [Validation],
    /// Calibrated parameters and sampler controls.
    pub settings: &'a CalibSettings,
    /// Parameters passed to the model unchanged.
    pub par_fixed: &'a FixedParams,
    /// Observed variables entering the likelihood.
    pub targets: &'a [String],
}

/// Runs a calibration and returns the fitted sampler.
pub trait Calibrator {
    /// Fit the calibrated parameters of `request` and return the sampler output, untagged.
    fn calibrate(&self, request: &CalibRequest) -> Result<CalibOutput>;
}

/// Backend program called with the request and response json paths as its last two arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCalibrator {
    program: PathBuf,
    args: Vec<String>,
    workdir: PathBuf,
}

impl ExternalCalibrator {
    /// Backend `program` exchanging files in a per-process directory under the system temp dir.
    pub fn new<P: AsRef<Path>>(program: P) -> Self {
        ExternalCalibrator {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            workdir: std::env::temp_dir().join(format!("pmodel-calib-{}", std::process::id())),
        }
    }

    /// Leading arguments passed before the request and response paths.
    pub fn args(mut self, args: &[String]) -> Self {
        self.args = args.to_vec();
        self
    }

    /// Directory holding the exchanged json files.
    pub fn workdir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.workdir = dir.as_ref().to_path_buf();
        self
    }
}

impl Calibrator for ExternalCalibrator {
    fn calibrate(&self, request: &CalibRequest) -> Result<CalibOutput> {
        fs::create_dir_all(&self.workdir)?;
        let request_path = self.workdir.join("calib_request.json");
        let response_path = self.workdir.join("calib_response.json");
        // a response left by an earlier run must never be read back as this run's result
        match fs::remove_file(&response_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut wtr = BufWriter::new(File::create(&request_path)?);
        serde_json::to_writer(&mut wtr, request)?;
        wtr.flush()?;
        drop(wtr);

        info!(
            "Running {} with {} parameters over {} sites.",
            self.program.display(),
            request.settings.par.len(),
            request.obs.len()
        );
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&request_path)
            .arg(&response_path)
            .status()?;
        if !status.success() {
            return Err(CalibError::Collaborator(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )));
        }
        if !response_path.exists() {
            return Err(CalibError::Collaborator(format!(
                "{} exited successfully without writing {}",
                self.program.display(),
                response_path.display()
            )));
        }
        debug!("Reading backend response {}.", response_path.display());
        CalibOutput::load(&response_path).map_err(|e| {
            CalibError::Collaborator(format!(
                "unreadable response {}: {}",
                response_path.display(),
                e
            ))
        })
    }
}

/// Calibrate one experiment variant and save the output under its settings string.
/// Returns the output along with the path it was written to.
pub fn run_setup<C: Calibrator + ?Sized>(
    setup: Setup,
    drivers: &Drivers,
    calibrator: &C,
    out_dir: &Path,
) -> Result<(CalibOutput, PathBuf)> {
    let (settings, fixed) = setup.settings()?;
    settings.validate(&fixed)?;
    let obs = drivers.validation();
    let targets = setup.targets();
    let request = CalibRequest {
        drivers,
        obs: &obs,
        settings: &settings,
        par_fixed: &fixed,
        targets: &targets,
    };
    info!("Calibrating setup {}.", setup.name());
    let out = calibrator.calibrate(&request)?.name(setup.name());
    info!("{}", summary::runtime_string(&out));
    let path = out_dir.join(format!("{}.json", summary::setup_string(&out)?));
    out.save(&path)?;
    Ok((out, path))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::settings::Sampler;

    /// Chain list with `n` identical runs and two draws per run.
    pub(crate) fn fit(settings: &CalibSettings, n: usize, runtime: f64) -> CalibOutput {
        let names = settings.names();
        let row: Vec<f64> = settings.par.values().map(|x| x.init).collect();
        let chain = ChainFit {
            settings: ChainSettings {
                iterations: settings.control.settings.iterations,
                burnin: settings.control.settings.burnin,
                nr_chains: settings.control.settings.nr_chains,
                sampler: settings.control.sampler.to_string(),
                runtime,
            },
            param_names: names.clone(),
            draws: vec![row.clone(), row],
        };
        CalibOutput {
            name: String::new(),
            par: settings.par.iter().map(|(k, v)| (k.clone(), v.init)).collect(),
            model: SamplerFit::ChainList(vec![chain; n]),
        }
    }

    struct Canned;

    impl Calibrator for Canned {
        fn calibrate(&self, request: &CalibRequest) -> Result<CalibOutput> {
            assert_eq!(request.targets, ["gpp".to_string()]);
            assert!(request.par_fixed.contains_key("kc_jmax"));
            Ok(fit(request.settings, request.settings.control.n_chains, 10.0))
        }
    }

    #[test]
    fn posterior_pools_chains() {
        let settings = CalibSettings::new()
            .param("a", crate::settings::Parameter::new("a", 0.0, 1.0, 0.5).unwrap())
            .param("b", crate::settings::Parameter::new("b", 0.0, 2.0, 1.5).unwrap());
        let out = fit(&settings, 3, 1.0);
        let post = out.posterior().unwrap();
        assert_eq!(post["a"], vec![0.5; 6]);
        assert_eq!(post["b"], vec![1.5; 6]);
    }

    #[test]
    fn ragged_draws_are_rejected() {
        let (settings, _) = Setup::S1.settings().unwrap();
        let mut out = fit(&settings, 2, 1.0);
        if let SamplerFit::ChainList(chains) = &mut out.model {
            chains[1].draws[0].pop();
        }
        assert!(matches!(out.posterior(), Err(CalibError::Samples(_))));
    }

    #[test]
    fn run_setup_saves_under_settings_string() {
        let dir = tempfile::tempdir().unwrap();
        let drivers = Drivers::default();
        let (out, path) = run_setup(Setup::S1, &drivers, &Canned, dir.path()).unwrap();
        assert_eq!(out.name, "s1");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Setup-s1-Sampler-DEzs-50000iterations_ofwhich10000burnin_chains_3x3_.json"
        );
        let back = CalibOutput::load(&path).unwrap();
        assert_eq!(back.name, "s1");
        assert_eq!(back.model.chains().len(), 3);
        assert_eq!(back.model.chains()[0].settings, out.model.chains()[0].settings);
    }

    #[test]
    fn unimplemented_setup_never_reaches_backend() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_setup(Setup::S3, &Drivers::default(), &Canned, dir.path());
        assert!(matches!(res, Err(CalibError::Unimplemented(_))));
    }

    #[test]
    fn output_json_uses_backend_field_names() {
        let (settings, _) = Setup::S1.settings().unwrap();
        let settings = settings.sampler(Sampler::DREAMzs);
        let json = serde_json::to_value(fit(&settings, 1, 2.5)).unwrap();
        assert_eq!(json["mod"]["class"], "ChainList");
        assert_eq!(json["mod"]["fit"][0]["settings"]["nrChains"], 3);
        assert_eq!(json["mod"]["fit"][0]["settings"]["sampler"], "DREAMzs");
    }

    #[cfg(unix)]
    #[test]
    fn external_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, fixed) = Setup::S1.settings().unwrap();
        let canned = dir.path().join("canned.json");
        fit(&settings, 3, 4.0).save(&canned).unwrap();
        let script = format!("test -s \"$0\" && cp {} \"$1\"", canned.display());
        let calibrator = ExternalCalibrator::new("sh")
            .args(&["-c".to_string(), script])
            .workdir(dir.path().join("work"));
        let drivers = Drivers::default();
        let targets = vec!["gpp".to_string()];
        let request = CalibRequest {
            drivers: &drivers,
            obs: &[],
            settings: &settings,
            par_fixed: &fixed,
            targets: &targets,
        };
        let out = calibrator.calibrate(&request).unwrap();
        assert_eq!(out.model.chains().len(), 3);
        assert!(dir.path().join("work/calib_request.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn silent_backend_does_not_reuse_earlier_response() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, fixed) = Setup::S1.settings().unwrap();
        let canned = dir.path().join("canned.json");
        fit(&settings, 3, 4.0).save(&canned).unwrap();
        let drivers = Drivers::default();
        let request = CalibRequest {
            drivers: &drivers,
            obs: &[],
            settings: &settings,
            par_fixed: &fixed,
            targets: &[],
        };
        let work = dir.path().join("work");
        let writes = ExternalCalibrator::new("sh")
            .args(&["-c".to_string(), format!("cp {} \"$1\"", canned.display())])
            .workdir(&work);
        assert!(writes.calibrate(&request).is_ok());
        assert!(work.join("calib_response.json").exists());

        let silent = ExternalCalibrator::new("sh")
            .args(&["-c".to_string(), "true".to_string()])
            .workdir(&work);
        assert!(matches!(
            silent.calibrate(&request),
            Err(CalibError::Collaborator(_))
        ));
        assert!(!work.join("calib_response.json").exists());
    }

    #[test]
    fn default_workdir_is_private_to_the_process() {
        let calibrator = ExternalCalibrator::new("calibrate-pmodel");
        assert_ne!(calibrator.workdir, std::env::temp_dir());
        assert!(calibrator.workdir.starts_with(std::env::temp_dir()));
    }

    #[cfg(unix)]
    #[test]
    fn failing_backend_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, fixed) = Setup::S1.settings().unwrap();
        let calibrator = ExternalCalibrator::new("sh")
            .args(&["-c".to_string(), "exit 3".to_string()])
            .workdir(dir.path());
        let drivers = Drivers::default();
        let request = CalibRequest {
            drivers: &drivers,
            obs: &[],
            settings: &settings,
            par_fixed: &fixed,
            targets: &[],
        };
        assert!(matches!(
            calibrator.calibrate(&request),
            Err(CalibError::Collaborator(_))
        ));
    }
}
