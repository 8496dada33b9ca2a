//! Diagnostic figures of a calibration: prior/posterior densities and chain traces.
use crate::calibrate::CalibOutput;
use crate::colors;
use crate::density::{self, Distrib, Kde};
use crate::settings::CalibSettings;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use rand::Rng;
use std::error::Error;
use std::path::Path;

/// Fill of posterior densities.
pub const POSTERIOR_COLOR: &str = "#29a274";
/// Fill of prior densities, drawn half transparent.
pub const PRIOR_COLOR: &str = "#777055";

const LEGEND_HEIGHT: u32 = 40;

fn fills() -> Result<(RGBAColor, RGBAColor), Box<dyn Error>> {
    Ok((
        colors::transparent(POSTERIOR_COLOR, 0.0)?.into(),
        colors::transparent(PRIOR_COLOR, 50.0)?.into(),
    ))
}

fn is_svg(path: &Path) -> bool {
    path.extension().and_then(|x| x.to_str()) == Some("svg")
}

/// Overlay prior and posterior densities of every calibrated parameter, one facet per
/// parameter in two rows with free scales.  The densities are estimated once and drawn to
/// every path in `paths`, as svg for `.svg` files and png otherwise.
pub fn prior_posterior_density<R: Rng + ?Sized, P: AsRef<Path>>(
    out: &CalibOutput,
    settings: &CalibSettings,
    paths: &[P],
    rng: &mut R,
) -> Result<Vec<Kde>, Box<dyn Error>> {
    let rows = density::prior_posterior(out, settings, density::PRIOR_DRAWS, rng)?;
    let kdes = density::densities(&rows, density::GRID);
    for path in paths {
        density_figure(&kdes, path.as_ref())?;
    }
    Ok(kdes)
}

/// Draw density estimates to `path`, svg if it ends in `.svg`, png otherwise.
pub fn density_figure(kdes: &[Kde], path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let size = (1200, 700);
    if is_svg(path) {
        draw_densities(SVGBackend::new(path, size).into_drawing_area(), kdes)?;
    } else {
        draw_densities(BitMapBackend::new(path, size).into_drawing_area(), kdes)?;
    }
    info!("Drew {} density curves to {}.", kdes.len(), path.display());
    Ok(())
}

fn draw_densities<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    kdes: &[Kde],
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let (posterior, prior) = fills()?;
    let mut params: Vec<&str> = Vec::new();
    for k in kdes {
        if !params.contains(&k.parameter.as_str()) {
            params.push(&k.parameter);
        }
    }
    root.fill(&WHITE)?;
    let (_, h) = root.dim_in_pixel();
    let (panels, legend) = root.split_vertically(h - LEGEND_HEIGHT);
    let cols = ((params.len() + 1) / 2).max(1);
    let facets = panels.split_evenly((2, cols));

    for (facet, name) in facets.iter().zip(params.iter()) {
        let curves: Vec<&Kde> = kdes.iter().filter(|k| k.parameter == *name).collect();
        let pts = curves.iter().flat_map(|k| k.points.iter());
        let xmin = pts.clone().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let xmax = pts.clone().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let ymax = pts.map(|p| p.1).fold(0.0, f64::max);

        let mut chart = ChartBuilder::on(facet)
            .caption(*name, ("sans-serif", 16))
            .margin(8)
            .x_label_area_size(25)
            .y_label_area_size(45)
            .build_cartesian_2d(xmin..xmax, 0.0..(ymax * 1.05).max(f64::EPSILON))?;
        chart
            .configure_mesh()
            .x_labels(4)
            .y_labels(4)
            .x_label_formatter(&|x| format!("{:.3}", x))
            .y_label_formatter(&|x| format!("{:.1}", x))
            .draw()?;

        for k in curves {
            let fill = match k.distrib {
                Distrib::Posterior => posterior,
                Distrib::Prior => prior,
            };
            chart.draw_series(
                AreaSeries::new(k.points.iter().cloned(), 0.0, fill.filled())
                    .border_style(BLACK.mix(0.6).stroke_width(1)),
            )?;
        }
    }

    // legend strip below the facets
    let (w, _) = legend.dim_in_pixel();
    let entries = [(Distrib::Posterior, posterior), (Distrib::Prior, prior)];
    for (i, (label, color)) in entries.iter().enumerate() {
        let x = w as i32 / 2 - 110 + i as i32 * 130;
        legend.draw(&Rectangle::new([(x, 12), (x + 18, 28)], color.filled()))?;
        legend.draw(&Text::new(
            label.to_string(),
            (x + 24, 13),
            ("sans-serif", 15).into_font(),
        ))?;
    }
    root.present()?;
    Ok(())
}

/// Trace of every parameter, one line per independent chain.
pub fn trace(out: &CalibOutput, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let size = (1200, 900);
    if is_svg(path) {
        draw_trace(SVGBackend::new(path, size).into_drawing_area(), out)
    } else {
        draw_trace(BitMapBackend::new(path, size).into_drawing_area(), out)
    }
}

fn draw_trace<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    out: &CalibOutput,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    // validates chain shapes before indexing columns
    let post = out.posterior()?;
    let chains = out.model.chains();
    root.fill(&WHITE)?;
    let rows = ((post.len() + 1) / 2).max(1);
    let facets = root.split_evenly((rows, 2));

    for (i, (facet, (name, values))) in facets.iter().zip(post.iter()).enumerate() {
        let ymin = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let ymax = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let pad = ((ymax - ymin) * 0.05).max(1e-9);
        let len = chains.iter().map(|x| x.draws.len()).max().unwrap_or(1).max(2);

        let mut chart = ChartBuilder::on(facet)
            .caption(name, ("sans-serif", 16))
            .margin(8)
            .x_label_area_size(25)
            .y_label_area_size(55)
            .build_cartesian_2d(0..len - 1, (ymin - pad)..(ymax + pad))?;
        chart
            .configure_mesh()
            .x_labels(5)
            .y_labels(4)
            .y_label_formatter(&|x| format!("{:.3}", x))
            .draw()?;

        for (c, chain) in chains.iter().enumerate() {
            let color = Palette99::pick(c).mix(0.8);
            chart.draw_series(LineSeries::new(
                chain.column(i).into_iter().enumerate(),
                &color,
            ))?;
        }
    }
    root.present()?;
    Ok(())
}
