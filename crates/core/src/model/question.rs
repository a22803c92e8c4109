use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, QuestionId, UnitId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("correct option {index} is out of range for {count} options")]
    CorrectOptionOutOfRange { index: usize, count: usize },

    #[error("unknown {kind}: {raw}")]
    UnknownLabel { kind: &'static str, raw: String },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Ordered difficulty of a question: easy < medium < hard < very hard.
///
/// Catalog ingestion is lenient: any label it does not know maps to
/// `Unrecognized`, which sorts after `VeryHard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    VeryHard,
    Unrecognized,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::VeryHard => "very_hard",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Lenient parse used for stored and seeded catalog data.
    #[must_use]
    pub fn from_label(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Unrecognized)
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "very_hard" => Ok(Self::VeryHard),
            other => Err(QuestionError::UnknownLabel {
                kind: "difficulty",
                raw: other.to_string(),
            }),
        }
    }
}

impl From<String> for Difficulty {
    fn from(raw: String) -> Self {
        Self::from_label(&raw)
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ROLE / COMPANY SIZE / CATEGORY ───────────────────────────────────────────
//

/// Interview role a question applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    DataScientist,
    MlEngineer,
    AiEngineer,
    MlopsEngineer,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::DataScientist,
        Role::MlEngineer,
        Role::AiEngineer,
        Role::MlopsEngineer,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataScientist => "data_scientist",
            Self::MlEngineer => "ml_engineer",
            Self::AiEngineer => "ai_engineer",
            Self::MlopsEngineer => "mlops_engineer",
        }
    }
}

impl FromStr for Role {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| QuestionError::UnknownLabel {
                kind: "role",
                raw: s.to_string(),
            })
    }
}

/// Company size bucket a question is typical for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Startup,
    Midsize,
    Large,
    Faang,
}

impl CompanySize {
    pub const ALL: [CompanySize; 4] = [
        CompanySize::Startup,
        CompanySize::Midsize,
        CompanySize::Large,
        CompanySize::Faang,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Midsize => "midsize",
            Self::Large => "large",
            Self::Faang => "faang",
        }
    }
}

impl FromStr for CompanySize {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s.trim())
            .ok_or_else(|| QuestionError::UnknownLabel {
                kind: "company size",
                raw: s.to_string(),
            })
    }
}

/// Free-form topic label, e.g. `technical` or `industry_practice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::new("technical")
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives from a catalog file or a database row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    #[serde(alias = "correctOption")]
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub company_sizes: BTreeSet<CompanySize>,
    pub unit_id: String,
    pub lesson_id: String,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id or text is blank, fewer than two
    /// options are given, or the correct index does not point at an option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: self.options.len(),
            });
        }
        if self.correct_answer >= self.options.len() {
            return Err(QuestionError::CorrectOptionOutOfRange {
                index: self.correct_answer,
                count: self.options.len(),
            });
        }

        Ok(Question {
            id: QuestionId::new(id),
            text: self.text,
            options: self.options,
            correct_option: self.correct_answer,
            explanation: self.explanation,
            difficulty: self.difficulty,
            category: self.category,
            roles: self.roles,
            company_sizes: self.company_sizes,
            unit_id: UnitId::new(self.unit_id),
            lesson_id: LessonId::new(self.lesson_id),
        })
    }
}

/// Immutable catalog entry. The engine only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_option: usize,
    explanation: String,
    difficulty: Difficulty,
    category: Category,
    roles: BTreeSet<Role>,
    company_sizes: BTreeSet<CompanySize>,
    unit_id: UnitId,
    lesson_id: LessonId,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    #[must_use]
    pub fn company_sizes(&self) -> &BTreeSet<CompanySize> {
        &self.company_sizes
    }

    #[must_use]
    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    /// Converts back into a draft, e.g. for persisting.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id.as_str().to_owned(),
            text: self.text.clone(),
            options: self.options.clone(),
            correct_answer: self.correct_option,
            explanation: self.explanation.clone(),
            difficulty: self.difficulty,
            category: self.category.clone(),
            roles: self.roles.clone(),
            company_sizes: self.company_sizes.clone(),
            unit_id: self.unit_id.as_str().to_owned(),
            lesson_id: self.lesson_id.as_str().to_owned(),
        }
    }
}

//
// ─── FILTER ────────────────────────────────────────────────────────────────────
//

/// Optional criteria for listing catalog questions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub role: Option<Role>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
    pub company_size: Option<CompanySize>,
    pub unit_id: Option<UnitId>,
}

impl QuestionFilter {
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        self.role.is_none_or(|role| question.roles.contains(&role))
            && self.difficulty.is_none_or(|d| question.difficulty == d)
            && self
                .category
                .as_ref()
                .is_none_or(|c| &question.category == c)
            && self
                .company_size
                .is_none_or(|size| question.company_sizes.contains(&size))
            && self.unit_id.as_ref().is_none_or(|u| &question.unit_id == u)
    }
}

#[cfg(test)]
pub(crate) fn sample_question(id: &str, difficulty: Difficulty) -> Question {
    QuestionDraft {
        id: id.to_string(),
        text: format!("Question {id}?"),
        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        correct_answer: 1,
        explanation: "because b".into(),
        difficulty,
        category: Category::default(),
        roles: Role::ALL.into_iter().collect(),
        company_sizes: [CompanySize::Startup, CompanySize::Large].into_iter().collect(),
        unit_id: "u1".into(),
        lesson_id: "l1".into(),
    }
    .validate()
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_orders_easy_to_very_hard() {
        assert!(Difficulty::Easy < Difficulty::Medium);
        assert!(Difficulty::Medium < Difficulty::Hard);
        assert!(Difficulty::Hard < Difficulty::VeryHard);
        assert!(Difficulty::VeryHard < Difficulty::Unrecognized);
    }

    #[test]
    fn unknown_difficulty_label_is_lenient_on_ingest_but_strict_on_parse() {
        assert_eq!(Difficulty::from_label("legendary"), Difficulty::Unrecognized);
        assert!("legendary".parse::<Difficulty>().is_err());
        assert_eq!("very_hard".parse::<Difficulty>().unwrap(), Difficulty::VeryHard);
    }

    #[test]
    fn draft_deserializes_from_catalog_json() {
        let raw = r#"{
            "id": "ml-b-1",
            "text": "What is the bias-variance tradeoff?",
            "options": ["a", "b", "c", "d"],
            "correctAnswer": 1,
            "explanation": "It is a balance.",
            "difficulty": "easy",
            "roles": ["data_scientist", "ml_engineer"],
            "category": "technical",
            "companySizes": ["startup", "faang"],
            "unitId": "ml-fundamentals",
            "lessonId": "ml-basics"
        }"#;
        let draft: QuestionDraft = serde_json::from_str(raw).unwrap();
        let question = draft.validate().unwrap();
        assert_eq!(question.id().as_str(), "ml-b-1");
        assert_eq!(question.difficulty(), Difficulty::Easy);
        assert!(question.roles().contains(&Role::MlEngineer));
        assert!(question.company_sizes().contains(&CompanySize::Faang));
        assert_eq!(question.unit_id().as_str(), "ml-fundamentals");
    }

    #[test]
    fn draft_with_unknown_difficulty_still_validates() {
        let mut draft = sample_question("q1", Difficulty::Easy).to_draft();
        draft.difficulty = Difficulty::from_label("impossible");
        assert_eq!(draft.validate().unwrap().difficulty(), Difficulty::Unrecognized);
    }

    #[test]
    fn validate_rejects_out_of_range_answer() {
        let mut draft = sample_question("q1", Difficulty::Easy).to_draft();
        draft.correct_answer = 4;
        assert_eq!(
            draft.validate().unwrap_err(),
            QuestionError::CorrectOptionOutOfRange { index: 4, count: 4 }
        );
    }

    #[test]
    fn validate_rejects_single_option() {
        let mut draft = sample_question("q1", Difficulty::Easy).to_draft();
        draft.options.truncate(1);
        draft.correct_answer = 0;
        assert!(matches!(
            draft.validate(),
            Err(QuestionError::TooFewOptions { count: 1 })
        ));
    }

    #[test]
    fn filter_matches_on_every_set_criterion() {
        let question = sample_question("q1", Difficulty::Hard);
        let mut filter = QuestionFilter::default();
        assert!(filter.matches(&question));

        filter.company_size = Some(CompanySize::Startup);
        filter.difficulty = Some(Difficulty::Hard);
        assert!(filter.matches(&question));

        filter.company_size = Some(CompanySize::Faang);
        assert!(!filter.matches(&question));

        filter.company_size = None;
        filter.unit_id = Some(UnitId::new("other"));
        assert!(!filter.matches(&question));
    }
}
