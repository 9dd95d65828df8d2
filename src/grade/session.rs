#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::{self, Display};

use anyhow::{Result, bail};
use bon::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Verdict of one grading axis, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyState {
    /// The axis is not evaluated.
    Invalid,
    /// Wrong.
    Incorrect,
    /// Partial credit, lowest band (semantics only).
    Sm1,
    /// Partial credit, second band.
    Sm2,
    /// Partial credit, third band.
    Sm3,
    /// Partial credit, fourth band.
    Sm4,
    /// Partial credit, highest band.
    Sm5,
    /// Wrong, but within the configured tolerance of correct.
    MinorIncorrect,
    /// Right.
    Correct,
}

impl PropertyState {
    /// Partial-credit bands in ascending order.
    pub const PARTIAL: [PropertyState; 5] = [Self::Sm1, Self::Sm2, Self::Sm3, Self::Sm4, Self::Sm5];

    /// Serialized spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Incorrect => "INCORRECT",
            Self::Sm1 => "SM_1",
            Self::Sm2 => "SM_2",
            Self::Sm3 => "SM_3",
            Self::Sm4 => "SM_4",
            Self::Sm5 => "SM_5",
            Self::MinorIncorrect => "MINOR_INCORRECT",
            Self::Correct => "CORRECT",
        }
    }

    /// True for the SM_1..SM_5 bands.
    pub fn is_partial(self) -> bool {
        Self::PARTIAL.contains(&self)
    }
}

/// Human-readable verdict used in reports and output records.
pub fn property_state_to_string(state: PropertyState) -> &'static str {
    match state {
        PropertyState::Invalid => "invalid",
        PropertyState::Incorrect => "Incorrect",
        PropertyState::Sm1 => "SM_1",
        PropertyState::Sm2 => "SM_2",
        PropertyState::Sm3 => "SM_3",
        PropertyState::Sm4 => "SM_4",
        PropertyState::Sm5 => "SM_5",
        PropertyState::MinorIncorrect => "Minor incorrect",
        PropertyState::Correct => "correct",
    }
}

impl Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(property_state_to_string(*self))
    }
}

impl Serialize for PropertyState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "INVALID" => Ok(Self::Invalid),
            "INCORRECT" => Ok(Self::Incorrect),
            "SM_1" => Ok(Self::Sm1),
            "SM_2" => Ok(Self::Sm2),
            "SM_3" => Ok(Self::Sm3),
            "SM_4" => Ok(Self::Sm4),
            "SM_5" => Ok(Self::Sm5),
            "MINOR_INCORRECT" => Ok(Self::MinorIncorrect),
            "CORRECT" => Ok(Self::Correct),
            other => Err(de::Error::custom(format!("Unknown property state: {other}"))),
        }
    }
}

/// How many distinct verdicts an axis uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyLevel {
    /// The axis is not graded.
    Absent,
    /// Incorrect or correct.
    TwoLevels,
    /// Incorrect, minor incorrect or correct.
    ThreeLevels,
    /// Three levels plus five partial-credit bands; semantics only.
    SixLevels,
}

impl PropertyLevel {
    /// Serialized spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "ABSENT",
            Self::TwoLevels => "TWO_LEVELS",
            Self::ThreeLevels => "THREE_LEVELS",
            Self::SixLevels => "SIX_LEVELS",
        }
    }

    /// Verdicts an axis at this level can take, worst first.
    pub fn possible_states(self) -> Vec<PropertyState> {
        use PropertyState::*;
        match self {
            Self::Absent => vec![Invalid],
            Self::TwoLevels => vec![Incorrect, Correct],
            Self::ThreeLevels => vec![Incorrect, MinorIncorrect, Correct],
            Self::SixLevels => vec![Incorrect, Sm1, Sm2, Sm3, Sm4, Sm5, MinorIncorrect, Correct],
        }
    }

    /// True when the axis distinguishes a minor-incorrect verdict.
    pub fn has_minor(self) -> bool {
        matches!(self, Self::ThreeLevels | Self::SixLevels)
    }
}

impl Display for PropertyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PropertyLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.as_str() {
            "ABSENT" => Ok(Self::Absent),
            "TWO_LEVELS" => Ok(Self::TwoLevels),
            "THREE_LEVELS" => Ok(Self::ThreeLevels),
            "SIX_LEVELS" => Ok(Self::SixLevels),
            other => Err(de::Error::custom(format!("Unknown property level: {other}"))),
        }
    }
}

/// One of the three graded axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Does the statement parse.
    Syntax,
    /// Does the statement mean the right thing.
    Semantics,
    /// Does the statement produce the right output.
    Results,
}

/// Importance ranking of the three axes, most important first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyOrder {
    /// Syntax, semantics, results.
    SySmRe,
    /// Syntax, results, semantics.
    SyReSm,
    /// Semantics, syntax, results.
    SmSyRe,
    /// Semantics, results, syntax.
    SmReSy,
    /// Results, syntax, semantics.
    ReSySm,
    /// Results, semantics, syntax.
    ReSmSy,
}

impl PropertyOrder {
    /// Every ordering.
    pub const ALL: [PropertyOrder; 6] = [
        Self::SySmRe,
        Self::SyReSm,
        Self::SmSyRe,
        Self::SmReSy,
        Self::ReSySm,
        Self::ReSmSy,
    ];

    /// Serialized spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SySmRe => "SY_SM_RE",
            Self::SyReSm => "SY_RE_SM",
            Self::SmSyRe => "SM_SY_RE",
            Self::SmReSy => "SM_RE_SY",
            Self::ReSySm => "RE_SY_SM",
            Self::ReSmSy => "RE_SM_SY",
        }
    }

    /// Axes from most to least important.
    pub fn axes(self) -> [Axis; 3] {
        use Axis::*;
        match self {
            Self::SySmRe => [Syntax, Semantics, Results],
            Self::SyReSm => [Syntax, Results, Semantics],
            Self::SmSyRe => [Semantics, Syntax, Results],
            Self::SmReSy => [Semantics, Results, Syntax],
            Self::ReSySm => [Results, Syntax, Semantics],
            Self::ReSmSy => [Results, Semantics, Syntax],
        }
    }

    /// Short note explaining how this ordering weighs the axes.
    pub fn grader_comment(self) -> &'static str {
        match self {
            Self::SySmRe => {
                "Grading emphasis is introductory: correct syntax matters most, then meaning, then output."
            }
            Self::SmSyRe => {
                "Grading emphasis is intermediate: the meaning of the query matters most, then syntax, then output."
            }
            Self::ReSmSy => {
                "Grading emphasis is advanced: the produced output matters most, then meaning, then syntax."
            }
            _ => "Syntax, semantics and results are weighed in the configured order of importance.",
        }
    }
}

impl Display for PropertyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PropertyOrder {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PropertyOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        PropertyOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == value)
            .ok_or_else(|| de::Error::custom(format!("Unknown property order: {value}")))
    }
}

/// Administrator-supplied policy for one grading session.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sensitivity of the syntax axis.
    #[builder(default = PropertyLevel::ThreeLevels)]
    #[builder(getter)]
    pub syntax_level:              PropertyLevel,
    /// Sensitivity of the semantics axis.
    #[builder(default = PropertyLevel::ThreeLevels)]
    #[builder(getter)]
    pub semantics_level:           PropertyLevel,
    /// Sensitivity of the results axis.
    #[builder(default = PropertyLevel::ThreeLevels)]
    #[builder(getter)]
    pub results_level:             PropertyLevel,
    /// Importance ranking of the axes.
    #[builder(default = PropertyOrder::ReSmSy)]
    #[builder(getter)]
    pub order:                     PropertyOrder,
    /// Whether row order matters when comparing SELECT output.
    #[builder(default)]
    #[builder(getter)]
    pub check_order:               bool,
    /// Largest keyword character cost still counted as a minor syntax error.
    #[builder(default = 4)]
    #[builder(getter)]
    pub syntax_minor_threshold:    usize,
    /// Largest tree-edit distance still counted as a minor semantic error.
    #[builder(default = 4)]
    #[builder(getter)]
    pub semantics_minor_threshold: usize,
}

/// The session used when the administrator supplies nothing: three levels on
/// every axis, results first, unordered rows, thresholds of 4.
pub fn default_session() -> SessionConfig {
    SessionConfig::builder().build()
}

impl Default for SessionConfig {
    fn default() -> Self {
        default_session()
    }
}

impl SessionConfig {
    /// Rejects configurations the correctness matrix cannot represent.
    pub fn validate(&self) -> Result<()> {
        if self.syntax_level == PropertyLevel::SixLevels {
            bail!("SIX_LEVELS is only supported for the semantics axis, not syntax");
        }
        if self.results_level == PropertyLevel::SixLevels {
            bail!("SIX_LEVELS is only supported for the semantics axis, not results");
        }
        Ok(())
    }

    /// Configured level of `axis`.
    pub fn level(&self, axis: Axis) -> PropertyLevel {
        match axis {
            Axis::Syntax => self.syntax_level,
            Axis::Semantics => self.semantics_level,
            Axis::Results => self.results_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_matches_documented_policy() {
        let session = default_session();
        assert_eq!(session.syntax_level, PropertyLevel::ThreeLevels);
        assert_eq!(session.order, PropertyOrder::ReSmSy);
        assert!(!session.check_order);
        assert_eq!(session.syntax_minor_threshold, 4);
        assert_eq!(session.semantics_minor_threshold, 4);
        assert!(session.validate().is_ok());
    }

    #[test]
    fn six_levels_only_for_semantics() {
        let session = SessionConfig::builder()
            .semantics_level(PropertyLevel::SixLevels)
            .build();
        assert!(session.validate().is_ok());

        let session = SessionConfig::builder()
            .results_level(PropertyLevel::SixLevels)
            .build();
        assert!(session.validate().is_err());
    }

    #[test]
    fn session_json_uses_upper_case_spellings() {
        let session: SessionConfig =
            serde_json::from_str(r#"{"order": "SY_SM_RE", "semantics_level": "SIX_LEVELS"}"#)
                .expect("valid session");
        assert_eq!(session.order, PropertyOrder::SySmRe);
        assert_eq!(session.semantics_level, PropertyLevel::SixLevels);
        assert_eq!(session.syntax_level, PropertyLevel::ThreeLevels);

        let text = serde_json::to_string(&session).expect("serializable");
        assert!(text.contains("\"SY_SM_RE\""));
        assert!(serde_json::from_str::<SessionConfig>(r#"{"order": "XX"}"#).is_err());
    }

    #[test]
    fn states_are_ordered_worst_to_best() {
        assert!(PropertyState::Incorrect < PropertyState::Sm1);
        assert!(PropertyState::Sm5 < PropertyState::MinorIncorrect);
        assert!(PropertyState::MinorIncorrect < PropertyState::Correct);
        assert_eq!(property_state_to_string(PropertyState::MinorIncorrect), "Minor incorrect");
    }
}
