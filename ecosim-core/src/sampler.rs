use serde::{Deserialize, Serialize};

use crate::schema::ClassSet;

/// Number of points the map view is drawn with.
pub const DEFAULT_SAMPLE_CAP: usize = 2000;

/// A reference dataset row, reduced to the fields the map needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    #[serde(rename = "Horizontal_Distance_To_Roadways")]
    pub roadways: f64,
    #[serde(rename = "Horizontal_Distance_To_Hydrology")]
    pub hydrology: f64,
    /// 1-based class identifier
    #[serde(rename = "Cover_Type")]
    pub cover_type: u32,
    #[serde(rename = "Elevation", default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    #[serde(rename = "Slope", default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    #[serde(rename = "Aspect", default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<f64>,
}

impl MapPoint {
    pub fn new(roadways: f64, hydrology: f64, cover_type: u32) -> Self {
        Self {
            roadways,
            hydrology,
            cover_type,
            elevation: None,
            slope: None,
            aspect: None,
        }
    }

    /// Plotted distances are finite and non-negative, and the class exists.
    pub fn is_valid(&self, classes: &ClassSet) -> bool {
        let distance_ok = |d: f64| d.is_finite() && d >= 0.0;
        distance_ok(self.roadways)
            && distance_ok(self.hydrology)
            && classes.label_for_id(self.cover_type).is_some()
    }
}

/// Take every k-th element starting at index 0, where `k = len / cap`, until
/// `cap` elements are collected. Sources no longer than `cap` are returned
/// whole.
pub fn stride_sample<T: Clone>(source: &[T], cap: usize) -> Vec<T> {
    if source.len() <= cap {
        return source.to_vec();
    }
    if cap == 0 {
        return Vec::new();
    }

    let step = source.len() / cap;
    source.iter().step_by(step).take(cap).cloned().collect()
}

/// Per-field maxima over a sampled set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisMaxima {
    pub roadways: f64,
    pub hydrology: f64,
    pub elevation: Option<f64>,
    pub slope: Option<f64>,
    pub aspect: Option<f64>,
}

impl AxisMaxima {
    fn of(points: &[MapPoint]) -> Self {
        fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
            values.fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
        }

        Self {
            roadways: max_of(points.iter().map(|p| p.roadways)).unwrap_or(0.0),
            hydrology: max_of(points.iter().map(|p| p.hydrology)).unwrap_or(0.0),
            elevation: max_of(points.iter().filter_map(|p| p.elevation)),
            slope: max_of(points.iter().filter_map(|p| p.slope)),
            aspect: max_of(points.iter().filter_map(|p| p.aspect)),
        }
    }
}

/// Maps distances onto a 0..100 plot area. Roadway distance runs along x,
/// hydrology distance along y with the origin at the bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    x_max: f64,
    y_max: f64,
}

impl AxisScale {
    pub fn new(x_max: f64, y_max: f64) -> Self {
        Self { x_max, y_max }
    }

    pub fn x_percent(&self, value: f64) -> f64 {
        if self.x_max > 0.0 {
            value / self.x_max * 100.0
        } else {
            0.0
        }
    }

    pub fn y_percent(&self, value: f64) -> f64 {
        if self.y_max > 0.0 {
            100.0 - value / self.y_max * 100.0
        } else {
            0.0
        }
    }
}

/// A fixed-size, reproducible subset of a reference dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledDataset {
    points: Vec<MapPoint>,
    maxima: AxisMaxima,
    valid: usize,
    rejected: usize,
}

impl SampledDataset {
    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn maxima(&self) -> AxisMaxima {
        self.maxima
    }

    pub fn scale(&self) -> AxisScale {
        AxisScale::new(self.maxima.roadways, self.maxima.hydrology)
    }

    /// Number of valid source records the sample was drawn from.
    pub fn valid_count(&self) -> usize {
        self.valid
    }

    /// Number of source records that failed validation.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// Sampled points per class, in canonical class order.
    pub fn class_counts<'c>(&self, classes: &'c ClassSet) -> Vec<(&'c str, usize)> {
        classes
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                let id = idx as u32 + 1;
                let count = self.points.iter().filter(|p| p.cover_type == id).count();
                (label, count)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DatasetSampler<'a> {
    cap: usize,
    classes: &'a ClassSet,
}

impl<'a> DatasetSampler<'a> {
    pub fn new(cap: usize, classes: &'a ClassSet) -> Self {
        Self { cap, classes }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Drop invalid records, then stride sample what is left.
    pub fn sample(&self, source: impl IntoIterator<Item = MapPoint>) -> SampledDataset {
        let mut rejected = 0;
        let valid: Vec<MapPoint> = source
            .into_iter()
            .filter(|p| {
                let ok = p.is_valid(self.classes);
                if !ok {
                    rejected += 1;
                }
                ok
            })
            .collect();

        let points = stride_sample(&valid, self.cap);
        tracing::debug!(
            valid = valid.len(),
            rejected,
            sampled = points.len(),
            "sampled reference dataset"
        );

        SampledDataset {
            maxima: AxisMaxima::of(&points),
            points,
            valid: valid.len(),
            rejected,
        }
    }
}
