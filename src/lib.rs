/*!
* # pmodel-calib - Bayesian calibration of the P-model against observed GPP.
* The P-model predicts gross primary productivity (GPP) from light use efficiency theory, and a handful of
* its parameters (the quantum yield of photosynthesis and its temperature dependence, soil moisture stress,
* cost ratios) are poorly constrained.  This crate prepares the calibration of those parameters against
* flux tower GPP: it assembles uniform priors and DEzs sampler controls for each experiment setup, hands the
* run to a calibration backend, and turns the returned chains into file names, runtime summaries and
* prior/posterior density figures.
*
* The MCMC sampler and the P-model itself are provided by the backend program.  Any type implementing
* [Calibrator](calibrate/trait.Calibrator.html) can stand in for it.
*
*  ## Quick Start
*
*  - Load the crate prelude in the preamble of your `main.rs`.
*  - Read the forcing data and calibrate the reduced parameter set:
* ```no_run
* use pmodel_calib::prelude::*;
* use std::path::Path;
*
* fn main() -> Result<(), Box<dyn std::error::Error>> {
*     let drivers = Drivers::read("data/p_model_drivers.csv")?;
*     let backend = ExternalCalibrator::new("calibrate-pmodel").workdir("data/calib/work");
*
*     // saved as data/calib/Setup-s1-Sampler-DEzs-50000iterations_ofwhich10000burnin_chains_3x3_.json
*     let (out, _path) = run_setup(Setup::S1, &drivers, &backend, Path::new("data/calib"))?;
*     println!("{}", summary::runtime_string(&out));
*
*     let (settings, _fixed) = Setup::S1.settings()?;
*     let figs = [Path::new("fig/s1_density.svg"), Path::new("fig/s1_density.png")];
*     plot::prior_posterior_density(&out, &settings, &figs, &mut rand::thread_rng())?;
*     Ok(())
* }
* ```
*
* Settings are built with a builder pattern.  Start from the DEzs defaults with
* [new](settings/struct.CalibSettings.html#method.new) and add parameters with
* [param](settings/struct.CalibSettings.html#method.param):
*
* ```rust
* use pmodel_calib::prelude::*;
*
* let settings = CalibSettings::new()
*     .iterations(3000)
*     .burnin(1500)
*     .param("kphio", Parameter::new("kphio", 0.02, 0.2, 0.05)?)
*     .param("err_gpp", Parameter::new("err_gpp", 0.1, 3.0, 0.8)?);
* settings.validate(&FixedParams::new())?;
* # Ok::<(), CalibError>(())
* ```
*/

#![warn(missing_docs)]
pub mod calibrate;
pub mod colors;
pub mod config;
pub mod density;
pub mod drivers;
pub mod errors;
pub mod plot;
pub mod settings;
pub mod summary;
pub mod utils;

/// Types and functions of a typical analysis script.
pub mod prelude {
    pub use crate::calibrate::{run_setup, CalibOutput, Calibrator, ExternalCalibrator, SamplerFit};
    pub use crate::config::RunConfig;
    pub use crate::drivers::Drivers;
    pub use crate::errors::CalibError;
    pub use crate::settings::{CalibSettings, FixedParams, Parameter, Sampler, Setup};
    pub use crate::{plot, summary};
}
