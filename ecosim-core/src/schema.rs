use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, UnknownClass};

const COVER_CLASSES: [(&str, &str); 7] = [
    ("Spruce/Fir", "#1E90FF"),
    ("Lodgepole Pine", "#32CD32"),
    ("Ponderosa Pine", "#FFD700"),
    ("Cottonwood/Willow", "#FF69B4"),
    ("Aspen", "#ADFF2F"),
    ("Douglas-fir", "#8A2BE2"),
    ("Krummholz", "#A52A2A"),
];

const CONTINUOUS_FIELDS: [&str; 10] = [
    "Elevation",
    "Aspect",
    "Slope",
    "Horizontal_Distance_To_Hydrology",
    "Vertical_Distance_To_Hydrology",
    "Horizontal_Distance_To_Roadways",
    "Hillshade_9am",
    "Hillshade_Noon",
    "Hillshade_3pm",
    "Horizontal_Distance_To_Fire_Points",
];

const CURATED_SOILS: [(u16, &str); 8] = [
    (1, "Cathedral family - Rock outcrop complex, extremely stony"),
    (2, "Vanet - Ratake families complex, very stony"),
    (10, "Leighcan family, till substratum, extremely bouldery"),
    (22, "Legault family - Rock land complex, stony"),
    (23, "Catamount family - Rock land - Bullwark family complex, rubbly"),
    (29, "Como - Legault families complex, extremely stony"),
    (32, "Bullwark - Catamount families - Rock outcrop complex, rubbly"),
    (38, "Moran family - Cryaquolls complex, local alluvium-slopewash"),
];

/// Map colour of one of the default cover classes.
pub fn default_color(label: &str) -> Option<&'static str> {
    COVER_CLASSES
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, color)| *color)
}

/// The closed, ordered set of classes a predictor can output.
///
/// The position of a label is its canonical rank. Datasets refer to classes by
/// `position + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassSet {
    labels: Vec<String>,
}

impl ClassSet {
    pub fn new<I, S>(labels: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(SchemaError::NoClasses);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(label.as_str()) {
                return Err(SchemaError::Duplicate(label.clone()));
            }
        }

        Ok(Self { labels })
    }

    /// The seven forest cover types.
    pub fn forest_cover() -> Self {
        Self {
            labels: COVER_CLASSES.iter().map(|(l, _)| l.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index_of(label).is_some()
    }

    /// Look up a class by its 1-based dataset identifier.
    pub fn label_for_id(&self, id: u32) -> Option<&str> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.labels.get(idx).map(String::as_str)
    }

    pub fn check(&self, label: &str) -> Result<(), UnknownClass> {
        if self.contains(label) {
            Ok(())
        } else {
            Err(UnknownClass(label.to_string()))
        }
    }
}

impl Default for ClassSet {
    fn default() -> Self {
        Self::forest_cover()
    }
}

impl TryFrom<Vec<String>> for ClassSet {
    type Error = SchemaError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(labels)
    }
}

impl From<ClassSet> for Vec<String> {
    fn from(set: ClassSet) -> Self {
        set.labels
    }
}

/// A categorical input field, one-hot encoded over `1..=cardinality`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    field: String,
    prefix: String,
    cardinality: u16,
    /// Identifiers exposed to users, with a human readable label
    curated: BTreeMap<u16, String>,
}

impl CategoryGroup {
    pub fn new(
        field: impl Into<String>,
        prefix: impl Into<String>,
        cardinality: u16,
    ) -> Result<Self, SchemaError> {
        let field = field.into();
        let prefix = prefix.into();
        if field.trim().is_empty() || prefix.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if cardinality == 0 {
            return Err(SchemaError::EmptyGroup(field));
        }

        Ok(Self {
            field,
            prefix,
            cardinality,
            curated: BTreeMap::new(),
        })
    }

    pub fn with_curated(mut self, id: u16, label: impl Into<String>) -> Result<Self, SchemaError> {
        if !self.contains(id) {
            return Err(SchemaError::CategoryOutOfRange {
                group: self.field,
                id,
            });
        }
        self.curated.insert(id, label.into());
        Ok(self)
    }

    /// `Soil_Type1` to `Soil_Type40`, with the soils a form usually offers.
    pub fn soil_type() -> Self {
        Self {
            field: "Soil_Type".to_string(),
            prefix: "Soil_Type".to_string(),
            cardinality: 40,
            curated: CURATED_SOILS
                .iter()
                .map(|(id, label)| (*id, label.to_string()))
                .collect(),
        }
    }

    /// `Wilderness_Area1` to `Wilderness_Area4`.
    pub fn wilderness_area() -> Self {
        Self {
            field: "Wilderness_Area".to_string(),
            prefix: "Wilderness_Area".to_string(),
            cardinality: 4,
            curated: BTreeMap::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn cardinality(&self) -> u16 {
        self.cardinality
    }

    pub fn ids(&self) -> RangeInclusive<u16> {
        1..=self.cardinality
    }

    pub fn contains(&self, id: u16) -> bool {
        self.ids().contains(&id)
    }

    pub fn indicator_key(&self, id: u16) -> String {
        format!("{}{}", self.prefix, id)
    }

    pub fn curated(&self) -> impl Iterator<Item = (u16, &str)> {
        self.curated.iter().map(|(id, label)| (*id, label.as_str()))
    }

    /// Parse a user value into a category identifier. Both the bare
    /// identifier (`10`) and the indicator key (`Soil_Type10`) are accepted.
    pub fn parse_id(&self, raw: &str) -> Option<u16> {
        let raw = raw.trim();
        let digits = raw.strip_prefix(self.prefix.as_str()).unwrap_or(raw);
        if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let id = digits.parse::<u16>().ok()?;
        self.contains(id).then_some(id)
    }
}

/// Declares the exact vector layout the external predictor was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    continuous: Vec<String>,
    groups: Vec<CategoryGroup>,
    classes: ClassSet,
}

impl FeatureSchema {
    pub fn new<I, S>(
        continuous: I,
        groups: Vec<CategoryGroup>,
        classes: ClassSet,
    ) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let continuous: Vec<String> = continuous.into_iter().map(Into::into).collect();

        // Input names and output keys share the JSON payload, so they must not collide
        let mut seen = HashSet::new();
        let names = continuous
            .iter()
            .cloned()
            .chain(groups.iter().map(|g| g.field().to_string()))
            .chain(
                groups
                    .iter()
                    .flat_map(|g| g.ids().map(|id| g.indicator_key(id))),
            );
        for name in names {
            if name.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(name.clone()) {
                return Err(SchemaError::Duplicate(name));
            }
        }

        Ok(Self {
            continuous,
            groups,
            classes,
        })
    }

    /// Ten cartographic measurements followed by the 40 soil types.
    pub fn forest_cover() -> Self {
        Self {
            continuous: CONTINUOUS_FIELDS.iter().map(|f| f.to_string()).collect(),
            groups: vec![CategoryGroup::soil_type()],
            classes: ClassSet::forest_cover(),
        }
    }

    /// The complete covertype layout, with wilderness areas before soil types.
    pub fn forest_cover_full() -> Self {
        Self {
            continuous: CONTINUOUS_FIELDS.iter().map(|f| f.to_string()).collect(),
            groups: vec![CategoryGroup::wilderness_area(), CategoryGroup::soil_type()],
            classes: ClassSet::forest_cover(),
        }
    }

    pub fn continuous(&self) -> &[String] {
        &self.continuous
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn group(&self, field: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.field() == field)
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Length of every vector encoded against this schema.
    pub fn vector_len(&self) -> usize {
        self.continuous.len()
            + self
                .groups
                .iter()
                .map(|g| usize::from(g.cardinality()))
                .sum::<usize>()
    }

    /// Output keys, in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.vector_len());
        names.extend(self.continuous.iter().cloned());
        for group in &self.groups {
            names.extend(group.ids().map(|id| group.indicator_key(id)));
        }
        names
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::forest_cover()
    }
}
