use std::fs;
use std::io;
use std::path::Path;

use ecosim_core::{ClassSet, DatasetSampler, MapPoint, SampledDataset};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::DatasetError;

const ROADWAYS: &str = "Horizontal_Distance_To_Roadways";
const HYDROLOGY: &str = "Horizontal_Distance_To_Hydrology";
const COVER_TYPE: &str = "Cover_Type";

/// A single row of the reference dataset. Only the plotted columns are read.
#[derive(Debug, Clone, Deserialize)]
struct DatasetRow {
    #[serde(
        rename = "Horizontal_Distance_To_Roadways",
        default,
        deserialize_with = "number_or_na"
    )]
    roadways: Option<f64>,
    #[serde(
        rename = "Horizontal_Distance_To_Hydrology",
        default,
        deserialize_with = "number_or_na"
    )]
    hydrology: Option<f64>,
    #[serde(rename = "Cover_Type", default, deserialize_with = "number_or_na")]
    cover_type: Option<f64>,
    #[serde(rename = "Elevation", default, deserialize_with = "number_or_na")]
    elevation: Option<f64>,
    #[serde(rename = "Slope", default, deserialize_with = "number_or_na")]
    slope: Option<f64>,
    #[serde(rename = "Aspect", default, deserialize_with = "number_or_na")]
    aspect: Option<f64>,
}

impl DatasetRow {
    fn into_point(self) -> Option<MapPoint> {
        let cover_type = self.cover_type?;
        if cover_type.fract() != 0.0 || cover_type < 0.0 || cover_type > f64::from(u32::MAX) {
            return None;
        }

        Some(MapPoint {
            roadways: self.roadways?,
            hydrology: self.hydrology?,
            cover_type: cover_type as u32,
            elevation: self.elevation,
            slope: self.slope,
            aspect: self.aspect,
        })
    }
}

/// Points read from a reference dataset, before sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLoad {
    pub points: Vec<MapPoint>,
    /// Data rows in the file, including skipped ones
    pub rows: usize,
    /// Rows that could not be read or lacked a required value
    pub skipped: usize,
}

pub fn read_points(path: impl AsRef<Path>) -> Result<DatasetLoad, DatasetError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let load = read_points_from(file)?;
    info!(
        path = %path.display(),
        rows = load.rows,
        skipped = load.skipped,
        "read reference dataset"
    );
    Ok(load)
}

/// Read map points from any headered CSV source. Malformed rows are skipped;
/// a missing required column is an error.
pub fn read_points_from<R: io::Read>(reader: R) -> Result<DatasetLoad, DatasetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    validate_header(rdr.headers()?)?;

    let mut points = Vec::new();
    let mut rows = 0;
    let mut skipped = 0;

    for (line, result) in rdr.deserialize::<DatasetRow>().enumerate() {
        rows += 1;
        match result.map(DatasetRow::into_point) {
            Ok(Some(point)) => points.push(point),
            Ok(None) => {
                debug!(row = line + 1, "skipping row with missing values");
                skipped += 1;
            }
            Err(err) => {
                debug!(row = line + 1, %err, "skipping malformed row");
                skipped += 1;
            }
        }
    }

    Ok(DatasetLoad {
        points,
        rows,
        skipped,
    })
}

fn validate_header(header: &csv::StringRecord) -> Result<(), DatasetError> {
    for column in [ROADWAYS, HYDROLOGY, COVER_TYPE] {
        if !header.iter().any(|h| h == column) {
            return Err(DatasetError::MissingColumn(column));
        }
    }
    Ok(())
}

/// Read `path` and reduce it to at most `cap` plottable points.
pub fn load_sample(
    path: impl AsRef<Path>,
    cap: usize,
    classes: &ClassSet,
) -> Result<(SampledDataset, DatasetLoad), DatasetError> {
    let load = read_points(path)?;
    let sample = DatasetSampler::new(cap, classes).sample(load.points.iter().cloned());
    Ok((sample, load))
}

/// Deserialize a cell into an `Option<f64>`, returning `None` if the cell is
/// empty, the literal "NA", or not a number.
fn number_or_na<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = String::deserialize(deserializer)?;

    if s == "NA" || s.is_empty() {
        Ok(None)
    } else {
        Ok(s.parse().ok().filter(|v: &f64| v.is_finite()))
    }
}
