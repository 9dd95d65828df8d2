#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use anyhow::Result;
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use thiserror::Error;

use super::session::{
    Axis, PropertyLevel, PropertyState, SessionConfig, property_state_to_string,
};

/// Failures raised while classifying an observed verdict triple.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeError {
    /// The observed triple is not a row of the correctness matrix.
    #[error(
        "no correctness level for syntax={syntax}, semantics={semantics}, results={results}"
    )]
    Consistency {
        /// Observed syntax verdict.
        syntax:    PropertyState,
        /// Observed semantics verdict.
        semantics: PropertyState,
        /// Observed results verdict.
        results:   PropertyState,
    },
    /// Every combination was excluded.
    #[error("the correctness matrix is empty")]
    EmptyMatrix,
}

/// One (syntax, semantics, results) verdict triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Properties {
    /// Syntax verdict.
    pub syntax:    PropertyState,
    /// Semantics verdict.
    pub semantics: PropertyState,
    /// Results verdict.
    pub results:   PropertyState,
}

impl Properties {
    /// Creates a triple.
    pub fn new(syntax: PropertyState, semantics: PropertyState, results: PropertyState) -> Self {
        Self {
            syntax,
            semantics,
            results,
        }
    }

    /// Verdict of `axis`.
    pub fn get(&self, axis: Axis) -> PropertyState {
        match axis {
            Axis::Syntax => self.syntax,
            Axis::Semantics => self.semantics,
            Axis::Results => self.results,
        }
    }

    /// Sets the verdict of `axis`.
    fn set(&mut self, axis: Axis, state: PropertyState) {
        match axis {
            Axis::Syntax => self.syntax = state,
            Axis::Semantics => self.semantics = state,
            Axis::Results => self.results = state,
        }
    }
}

/// Row of the printed matrix.
#[derive(Tabled, Clone, Debug)]
pub struct MatrixRow {
    #[tabled(rename = "Level")]
    /// 1-based correctness level.
    pub level:     usize,
    #[tabled(rename = "Results")]
    /// Results verdict.
    pub results:   &'static str,
    #[tabled(rename = "Semantics")]
    /// Semantics verdict.
    pub semantics: &'static str,
    #[tabled(rename = "Syntax")]
    /// Syntax verdict.
    pub syntax:    &'static str,
    #[tabled(rename = "Normalized")]
    /// Normalized value of the level.
    pub normalized: String,
}

/// Ordered list of the plausible verdict triples of a session; a triple's
/// position is its correctness level.
#[derive(Debug, Clone)]
pub struct CorrectnessMatrix {
    /// Plausible triples, worst first.
    entries: Vec<Properties>,
}

impl CorrectnessMatrix {
    /// Enumerates and filters the triples for `session`.
    pub fn new(session: &SessionConfig) -> Result<Self> {
        session.validate()?;
        let [first, second, third] = session.order.axes();

        let entries: Vec<Properties> = iproduct!(
            session.level(first).possible_states(),
            session.level(second).possible_states(),
            session.level(third).possible_states()
        )
        .map(|(a, b, c)| {
            let mut triple = Properties::new(
                PropertyState::Invalid,
                PropertyState::Invalid,
                PropertyState::Invalid,
            );
            triple.set(first, a);
            triple.set(second, b);
            triple.set(third, c);
            triple
        })
        .filter(|triple| !is_excluded(triple, session))
        .collect();

        if entries.is_empty() {
            return Err(GradeError::EmptyMatrix.into());
        }
        Ok(Self { entries })
    }

    /// Plausible triples, worst first.
    pub fn entries(&self) -> &[Properties] {
        &self.entries
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed matrix.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maps a 1-based level onto `[0, 1]`; a single-level matrix yields 1.0.
    pub fn normalized_value(&self, level: usize) -> f64 {
        let count = self.entries.len();
        if count <= 1 {
            return 1.0;
        }
        (level.saturating_sub(1)) as f64 / (count - 1) as f64
    }

    /// Returns the 1-based level of `observed` and its normalized value.
    pub fn calculate_correctness_level(
        &self,
        observed: Properties,
    ) -> Result<(usize, f64), GradeError> {
        let position = self
            .entries
            .iter()
            .position(|entry| *entry == observed)
            .ok_or(GradeError::Consistency {
                syntax:    observed.syntax,
                semantics: observed.semantics,
                results:   observed.results,
            })?;
        let level = position + 1;
        Ok((level, self.normalized_value(level)))
    }

    /// Table rows for printing.
    pub fn rows(&self) -> Vec<MatrixRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| MatrixRow {
                level:      i + 1,
                results:    property_state_to_string(entry.results),
                semantics:  property_state_to_string(entry.semantics),
                syntax:     property_state_to_string(entry.syntax),
                normalized: format!("{:.3}", self.normalized_value(i + 1)),
            })
            .collect()
    }
}

/// True when `triple` is an implausible combination under `session`.
fn is_excluded(triple: &Properties, session: &SessionConfig) -> bool {
    use PropertyLevel::{SixLevels, ThreeLevels};
    use PropertyState::{Correct, Incorrect, MinorIncorrect};

    let (sy, sm, re) = (triple.syntax, triple.semantics, triple.results);
    let (sy_level, sm_level, re_level) = (
        session.syntax_level,
        session.semantics_level,
        session.results_level,
    );
    let all_three = sy_level == ThreeLevels && sm_level == ThreeLevels && re_level == ThreeLevels;

    (re == Incorrect && sm == MinorIncorrect)
        || (re == MinorIncorrect && sm == Incorrect && sy == Incorrect && all_three)
        || (re == Correct && sm == Incorrect && sm_level == ThreeLevels)
        || (sm == MinorIncorrect
            && sy == Incorrect
            && sm_level == ThreeLevels
            && sy_level == ThreeLevels)
        || (re == MinorIncorrect
            && sm == MinorIncorrect
            && re_level == ThreeLevels
            && sm_level == ThreeLevels)
        || (sm == Correct && sy == Incorrect && sy_level == ThreeLevels)
        || (re == Incorrect && sm == Correct)
        || (re == MinorIncorrect
            && sm == Correct
            && re_level == ThreeLevels
            && sm_level == ThreeLevels)
        || (re == Correct && sm.is_partial())
        || (re == Correct && sm == Incorrect && sm_level == SixLevels)
        || (sy == Incorrect && sm.is_partial())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::session::{PropertyOrder, default_session};

    #[test]
    fn default_matrix_is_ordered_worst_to_best() {
        let matrix = CorrectnessMatrix::new(&default_session()).expect("matrix");
        let first = matrix.entries()[0];
        let last = matrix.entries()[matrix.len() - 1];
        assert_eq!(first.results, PropertyState::Incorrect);
        assert_eq!(
            last,
            Properties::new(PropertyState::Correct, PropertyState::Correct, PropertyState::Correct)
        );
        assert_eq!(matrix.normalized_value(1), 0.0);
        assert_eq!(matrix.normalized_value(matrix.len()), 1.0);
    }

    #[test]
    fn excluded_triples_are_consistency_errors() {
        let matrix = CorrectnessMatrix::new(&default_session()).expect("matrix");
        let observed = Properties::new(
            PropertyState::Incorrect,
            PropertyState::Correct,
            PropertyState::Correct,
        );
        assert!(matches!(
            matrix.calculate_correctness_level(observed),
            Err(GradeError::Consistency { .. })
        ));
    }

    #[test]
    fn single_level_matrix_normalizes_to_one() {
        let session = SessionConfig::builder()
            .syntax_level(PropertyLevel::Absent)
            .semantics_level(PropertyLevel::Absent)
            .results_level(PropertyLevel::Absent)
            .build();
        let matrix = CorrectnessMatrix::new(&session).expect("matrix");
        assert_eq!(matrix.len(), 1);
        let invalid = Properties::new(
            PropertyState::Invalid,
            PropertyState::Invalid,
            PropertyState::Invalid,
        );
        assert_eq!(matrix.calculate_correctness_level(invalid), Ok((1, 1.0)));
    }

    #[test]
    fn most_important_axis_varies_slowest() {
        let session = SessionConfig::builder()
            .order(PropertyOrder::SySmRe)
            .syntax_level(PropertyLevel::TwoLevels)
            .semantics_level(PropertyLevel::TwoLevels)
            .results_level(PropertyLevel::TwoLevels)
            .build();
        let matrix = CorrectnessMatrix::new(&session).expect("matrix");
        let syntax: Vec<_> = matrix.entries().iter().map(|e| e.syntax).collect();
        let mut sorted = syntax.clone();
        sorted.sort();
        assert_eq!(syntax, sorted);
    }
}
