// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// Lifecycle status of a survey.
///
/// The at-rest codes are the two-letter forms used by the collection
/// platform. The long forms are accepted on input for convenience.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SurveyStatus {
    #[serde(rename = "AT", alias = "ACTIVE")]
    Active,
    #[serde(rename = "IN", alias = "INACTIVE")]
    Inactive,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "SINGLE_CHOICE")]
    SingleChoice,
    #[serde(rename = "MULTIPLE_CHOICE")]
    MultipleChoice,
}

impl QuestionType {
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice
        )
    }
}

/// Where an option sends the respondent next.
///
/// The at-rest encoding uses a raw integer with `-1` meaning "end the survey".
/// That sentinel never escapes the decoder: it is turned into `End` here.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum JumpTarget {
    /// Jump to the question at this zero-based position in the question list.
    Index(usize),
    /// Terminate the survey immediately.
    End,
}

/// The single canonical shape for an option, whatever its at-rest encoding
/// (plain string, JSON-encoded string or already-parsed object).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CanonicalOption {
    /// The text shown to the respondent.
    pub text: String,
    /// The stored value. Defaults to the display text when absent.
    pub value: String,
    /// Optional embedded skip-logic target.
    pub jump: Option<JumpTarget>,
}

impl CanonicalOption {
    pub fn new(text: &str) -> CanonicalOption {
        CanonicalOption {
            text: text.to_string(),
            value: text.to_string(),
            jump: None,
        }
    }

    pub fn with_value(mut self, value: &str) -> CanonicalOption {
        self.value = value.to_string();
        self
    }

    pub fn jump_to(mut self, index: usize) -> CanonicalOption {
        self.jump = Some(JumpTarget::Index(index));
        self
    }

    pub fn ends_survey(mut self) -> CanonicalOption {
        self.jump = Some(JumpTarget::End);
        self
    }
}

/// Legacy skip-logic rule, keyed by question *id* rather than position.
/// Deprecated in favor of option-embedded jumps but still honored.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SkipRule {
    pub answer: String,
    #[serde(rename = "nextQuestionId")]
    pub next_question_id: u64,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub id: u64,
    pub text: String,
    pub qtype: QuestionType,
    /// Only meaningful for choice types. Already decoded to canonical form.
    pub options: Vec<CanonicalOption>,
    /// Legacy rules attached to the question itself.
    pub skip_logic: Vec<SkipRule>,
    /// Position in the survey. Dense and equal to the array index at read time.
    pub order: u32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Survey {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub status: SurveyStatus,
    /// Overall response target. Zero when no goal was set.
    pub goal: u64,
    /// Derived: ceil(goal / collector count), zero when either side is zero.
    pub goal_per_collector: u64,
    pub questions: Vec<Question>,
    pub collector_ids: Vec<u64>,
    pub client_id: Option<u64>,
    pub created_by: Option<u64>,
}

impl Survey {
    pub fn is_active(&self) -> bool {
        self.status == SurveyStatus::Active
    }

    pub fn set_status(&mut self, status: SurveyStatus) {
        self.status = status;
    }

    /// Position of a question in the ordered list, by id.
    pub fn question_position(&self, question_id: u64) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }

    /// Replaces the question list. Rejected while the survey is active:
    /// structural changes mid-collection would corrupt in-flight data.
    /// `order` is re-assigned densely from the new array positions.
    pub fn replace_questions(&mut self, questions: Vec<Question>) -> Result<(), SurveyError> {
        if self.is_active() {
            return Err(SurveyError::ActiveSurveyEdit);
        }
        self.questions = questions;
        for (idx, q) in self.questions.iter_mut().enumerate() {
            q.order = idx as u32;
        }
        Ok(())
    }

    /// Updates the overall goal and re-derives the per-collector share.
    pub fn set_goal(&mut self, goal: u64) -> Result<(), SurveyError> {
        if self.is_active() {
            return Err(SurveyError::ActiveSurveyEdit);
        }
        self.goal = goal;
        self.recompute_goal_per_collector();
        Ok(())
    }

    /// Replaces the assigned collector set and re-derives the per-collector share.
    pub fn assign_collectors(&mut self, collector_ids: Vec<u64>) -> Result<(), SurveyError> {
        if self.is_active() {
            return Err(SurveyError::ActiveSurveyEdit);
        }
        self.collector_ids = collector_ids;
        self.recompute_goal_per_collector();
        Ok(())
    }

    fn recompute_goal_per_collector(&mut self) {
        let n = self.collector_ids.len() as u64;
        self.goal_per_collector = if self.goal > 0 && n > 0 {
            (self.goal + n - 1) / n
        } else {
            0
        };
    }
}

/// An answer as stored in a response's data map: a scalar for text and
/// single-choice questions, an array for multi-select.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Single(String),
    Multi(Vec<String>),
}

impl AnswerValue {
    /// Equality for scalars, contains for arrays. Used by both report and
    /// heatmap filtering.
    pub fn matches(&self, expected: &str) -> bool {
        match self {
            AnswerValue::Single(s) => s == expected,
            AnswerValue::Multi(vs) => vs.iter().any(|v| v == expected),
        }
    }
}

/// One completed collection session, immutable once submitted.
#[derive(PartialEq, Debug, Clone)]
pub struct Response {
    pub id: u64,
    pub survey_id: u64,
    pub collector_id: Option<u64>,
    /// Stringified question id -> answer.
    pub data: BTreeMap<String, AnswerValue>,
    /// Free-form location payload: either a flat `{lat, lng}` object or a map
    /// of arbitrary keys to such objects. Only the heatmap extractor
    /// interprets it.
    pub location: JSValue,
}

/// Restricts a report or heatmap to the responses whose answer to a
/// designated question matches a given value.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseFilter {
    pub question_id: u64,
    pub answer: String,
}

impl ResponseFilter {
    pub fn matches(&self, response: &Response) -> bool {
        match response.data.get(&self.question_id.to_string()) {
            Some(answer) => answer.matches(&self.answer),
            None => false,
        }
    }
}

// ******** Output data structures *********

/// One labeled count in a choice question's aggregation.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ChoiceBucket {
    pub name: String,
    pub value: u64,
    pub percentage: u32,
}

/// Aggregation outcome for a text question.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct TextSummary {
    pub answers: Vec<String>,
    pub filled_count: u64,
    pub filled_percentage: u32,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StatsData {
    Choice(Vec<ChoiceBucket>),
    Text(TextSummary),
}

/// Aggregated result for one question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuestionStats {
    pub id: u64,
    pub text: String,
    pub qtype: QuestionType,
    /// Denominator shared by every question of the report.
    pub total: u64,
    pub data: StatsData,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyReport {
    pub survey_title: String,
    pub total_responses: u64,
    pub goal: u64,
    /// Percentage of the goal reached, when a goal was set.
    pub goal_completion: Option<u32>,
    pub questions: Vec<QuestionStats>,
}

/// Errors that prevent an operation from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SurveyError {
    /// Structural edit attempted while the survey is collecting.
    ActiveSurveyEdit,
    /// The survey has no questions.
    EmptySurvey,
    /// A rule or filter referenced a question id not present in the survey.
    UnknownQuestion(u64),
}

impl Error for SurveyError {}

impl Display for SurveyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyError::ActiveSurveyEdit => {
                write!(f, "cannot edit an active survey, deactivate it first")
            }
            SurveyError::EmptySurvey => write!(f, "the survey has no questions"),
            SurveyError::UnknownQuestion(id) => {
                write!(f, "question id {} is not part of the survey", id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> Survey {
        Survey {
            id: 1,
            title: "t".to_string(),
            description: None,
            status: SurveyStatus::Inactive,
            goal: 0,
            goal_per_collector: 0,
            questions: vec![Question {
                id: 10,
                text: "q".to_string(),
                qtype: QuestionType::Text,
                options: vec![],
                skip_logic: vec![],
                order: 0,
            }],
            collector_ids: vec![],
            client_id: None,
            created_by: None,
        }
    }

    #[test]
    fn active_survey_rejects_structural_edits() {
        let mut s = survey();
        s.set_status(SurveyStatus::Active);
        assert_eq!(
            s.replace_questions(vec![]),
            Err(SurveyError::ActiveSurveyEdit)
        );
        assert_eq!(s.set_goal(10), Err(SurveyError::ActiveSurveyEdit));
        s.set_status(SurveyStatus::Inactive);
        assert_eq!(s.set_goal(10), Ok(()));
    }

    #[test]
    fn goal_per_collector_is_ceiled() {
        let mut s = survey();
        s.assign_collectors(vec![1, 2, 3]).unwrap();
        s.set_goal(100).unwrap();
        assert_eq!(s.goal_per_collector, 34);
        s.assign_collectors(vec![1, 2]).unwrap();
        assert_eq!(s.goal_per_collector, 50);
        s.assign_collectors(vec![]).unwrap();
        assert_eq!(s.goal_per_collector, 0);
    }

    #[test]
    fn replace_questions_reassigns_dense_order() {
        let mut s = survey();
        let mut q1 = s.questions[0].clone();
        q1.order = 7;
        let mut q2 = q1.clone();
        q2.id = 11;
        q2.order = 3;
        s.replace_questions(vec![q1, q2]).unwrap();
        assert_eq!(s.questions[0].order, 0);
        assert_eq!(s.questions[1].order, 1);
    }

    #[test]
    fn filter_uses_contains_for_arrays() {
        let mut r = Response {
            id: 1,
            survey_id: 1,
            collector_id: None,
            data: BTreeMap::new(),
            location: JSValue::Null,
        };
        r.data.insert(
            "10".to_string(),
            AnswerValue::Multi(vec!["A".to_string(), "B".to_string()]),
        );
        let f = ResponseFilter {
            question_id: 10,
            answer: "B".to_string(),
        };
        assert!(f.matches(&r));
        let f2 = ResponseFilter {
            question_id: 10,
            answer: "C".to_string(),
        };
        assert!(!f2.matches(&r));
    }
}
