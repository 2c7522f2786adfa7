use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::schema::ClassSet;

/// A normalized distribution sums to 1 within this bound.
pub const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub class: String,
    pub probability: f64,
}

/// One probability per class of the class set, in canonical class order.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    entries: Vec<ClassProbability>,
}

impl Distribution {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassProbability> {
        self.entries.iter()
    }

    pub fn probability(&self, class: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.class == class)
            .map(|e| e.probability)
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|e| e.probability).sum()
    }

    /// Display order: highest probability first, ties in canonical class order.
    pub fn ranked(&self) -> Vec<&ClassProbability> {
        let mut ranked: Vec<_> = self.entries.iter().collect();
        // Stable sort keeps the canonical order among equal probabilities
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked
    }

    pub fn top(&self) -> Option<&ClassProbability> {
        self.ranked().into_iter().next()
    }
}

/// Turns raw per-class scores into a [`Distribution`] over a fixed class set.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilityNormalizer<'a> {
    classes: &'a ClassSet,
}

impl<'a> ProbabilityNormalizer<'a> {
    pub fn new(classes: &'a ClassSet) -> Self {
        Self { classes }
    }

    /// Divide each score by the total. Classes missing from `raw` get
    /// probability 0.
    pub fn normalize<I, S>(&self, raw: I) -> Result<Distribution, NormalizeError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut scores = vec![0.0; self.classes.len()];
        let mut seen = HashSet::new();

        for (class, score) in raw {
            let class = class.as_ref();
            let idx = self
                .classes
                .index_of(class)
                .ok_or_else(|| NormalizeError::UnknownClass(class.to_string()))?;
            if !seen.insert(idx) {
                return Err(NormalizeError::DuplicateClass(class.to_string()));
            }
            if !score.is_finite() || score < 0.0 {
                return Err(NormalizeError::InvalidScore {
                    class: class.to_string(),
                    score,
                });
            }
            scores[idx] = score;
        }

        // Scale by the largest score first so the sum cannot overflow
        let max = scores.iter().copied().fold(0.0, f64::max);
        if max <= 0.0 {
            return Err(NormalizeError::EmptyDistribution);
        }
        let scores: Vec<f64> = scores.into_iter().map(|s| s / max).collect();
        let total: f64 = scores.iter().sum();

        let entries = self
            .classes
            .iter()
            .zip(scores)
            .map(|(class, score)| ClassProbability {
                class: class.to_string(),
                probability: score / total,
            })
            .collect();

        Ok(Distribution { entries })
    }
}
