//! Forcing data of the P-model and the GPP observations derived from it.
use crate::errors::Result;
use chrono::NaiveDate;
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One day of forcing at a site, as written by the driver sampling stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ForcingRecord {
    /// FLUXNET site identifier.
    pub sitename: String,
    /// Day of the record.
    pub date: NaiveDate,
    /// Mean air temperature (°C).
    pub temp: f64,
    /// Vapour pressure deficit (Pa).
    pub vpd: f64,
    /// Photosynthetic photon flux density (mol m-2 s-1).
    pub ppfd: f64,
    /// Net radiation (W m-2).
    pub netrad: f64,
    /// Atmospheric pressure (Pa).
    pub patm: f64,
    /// Snowfall (mm s-1).
    pub snow: f64,
    /// Rainfall (mm s-1).
    pub rain: f64,
    /// Daily minimum temperature (°C).
    pub tmin: f64,
    /// Daily maximum temperature (°C).
    pub tmax: f64,
    /// Fraction of absorbed photosynthetically active radiation.
    pub fapar: f64,
    /// Atmospheric CO2 (ppm).
    pub co2: f64,
    /// Cloud cover (%).
    pub ccov: f64,
    /// Observed GPP, missing where the flux tower has no data.
    #[serde(deserialize_with = "csv::invalid_option")]
    pub gpp: Option<f64>,
}

/// Observed GPP on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GppObs {
    /// Day of the record.
    pub date: NaiveDate,
    /// Observed GPP (gC m-2 d-1), missing where the tower has no data.
    pub gpp: Option<f64>,
}

/// Observation data of one site, restricted to date and GPP.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Validation {
    /// FLUXNET site identifier.
    pub sitename: String,
    /// Daily observations in file order.
    pub data: Vec<GppObs>,
}

/// Forcing time series by site, in the order sites appear in the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Drivers {
    /// Daily forcing by site name.
    pub sites: IndexMap<String, Vec<ForcingRecord>>,
}

impl Drivers {
    /// Read a long-format driver table (one row per site and day) from csv.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut rdr = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for result in rdr.deserialize() {
            let row: ForcingRecord = result?;
            records.push(row);
        }
        let drivers = Drivers::from_records(records);
        info!(
            "Read {} sites with {} forcing days from {}.",
            drivers.sites.len(),
            drivers.len(),
            path.display()
        );
        Ok(drivers)
    }

    /// Group forcing rows by site, keeping row order within each site.
    pub fn from_records(records: Vec<ForcingRecord>) -> Self {
        let mut sites: IndexMap<String, Vec<ForcingRecord>> = IndexMap::new();
        for rec in records {
            sites.entry(rec.sitename.clone()).or_default().push(rec);
        }
        Drivers { sites }
    }

    /// Total number of forcing days across sites.
    pub fn len(&self) -> usize {
        self.sites.values().map(|x| x.len()).sum()
    }

    /// True when no site has forcing days.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Date and GPP columns of every site, the observations the calibration is fit to.
    pub fn validation(&self) -> Vec<Validation> {
        self.sites
            .iter()
            .map(|(site, forcing)| {
                let data: Vec<GppObs> = forcing
                    .iter()
                    .map(|x| GppObs {
                        date: x.date,
                        gpp: x.gpp,
                    })
                    .collect();
                if data.iter().all(|x| x.gpp.is_none()) {
                    warn!("Site {} has no GPP observations.", site);
                }
                Validation {
                    sitename: site.clone(),
                    data,
                }
            })
            .collect()
    }
}
