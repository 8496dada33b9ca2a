use log::info;
use pmodel_calib::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Calibrates the P-model setups against observed GPP, saves each output under its
/// settings string and draws the diagnostic figures.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let config = RunConfig::new();

    // Forcing data produced by the driver sampling stage.
    let drivers = Drivers::read(&config.drivers)?;
    let backend = config.calibrator();
    let mut rng = StdRng::seed_from_u64(config.seed);

    for setup in &config.setups {
        let (out, path) = run_setup(*setup, &drivers, &backend, &config.out_dir)?;
        summary::write_summary(&out, path.with_extension("csv"))?;

        if config.plots {
            let (settings, _) = setup.settings()?;
            let figs = ["svg", "png"].map(|ext| config.figure(*setup, "density", ext));
            plot::prior_posterior_density(&out, &settings, &figs, &mut rng)?;
            let fig = config.figure(*setup, "trace", "png");
            plot::trace(&out, &fig)?;
            info!("Drew {}.", fig.display());
        }
    }
    Ok(())
}
