pub use crate::model::*;

/// A builder for assembling surveys in memory.
///
/// Surveys are built inactive (editable) and activated last, mirroring the
/// platform's lifecycle: structural edits are only legal before collection
/// starts.
///
/// ```
/// pub use survey_logic::builder::SurveyBuilder;
/// pub use survey_logic::{CanonicalOption, QuestionType};
/// # use survey_logic::SurveyError;
///
/// let survey = SurveyBuilder::new(1, "Household census")
///     .text_question(10, "Head of household name")
///     .choice_question(
///         11,
///         "Area type",
///         QuestionType::SingleChoice,
///         vec![
///             CanonicalOption::new("Urban"),
///             CanonicalOption::new("Rural").jump_to(0),
///         ],
///     )
///     .goal(100)
///     .build()?;
///
/// assert_eq!(survey.questions.len(), 2);
/// # Ok::<(), SurveyError>(())
/// ```
pub struct SurveyBuilder {
    survey: Survey,
}

impl SurveyBuilder {
    pub fn new(id: u64, title: &str) -> SurveyBuilder {
        SurveyBuilder {
            survey: Survey {
                id,
                title: title.to_string(),
                description: None,
                status: SurveyStatus::Inactive,
                goal: 0,
                goal_per_collector: 0,
                questions: Vec::new(),
                collector_ids: Vec::new(),
                client_id: None,
                created_by: None,
            },
        }
    }

    pub fn description(mut self, description: &str) -> SurveyBuilder {
        self.survey.description = Some(description.to_string());
        self
    }

    pub fn goal(mut self, goal: u64) -> SurveyBuilder {
        self.survey.goal = goal;
        self.recompute();
        self
    }

    pub fn collectors(mut self, collector_ids: &[u64]) -> SurveyBuilder {
        self.survey.collector_ids = collector_ids.to_vec();
        self.recompute();
        self
    }

    pub fn client(mut self, client_id: u64) -> SurveyBuilder {
        self.survey.client_id = Some(client_id);
        self
    }

    pub fn text_question(self, id: u64, text: &str) -> SurveyBuilder {
        self.push_question(id, text, QuestionType::Text, Vec::new())
    }

    pub fn choice_question(
        self,
        id: u64,
        text: &str,
        qtype: QuestionType,
        options: Vec<CanonicalOption>,
    ) -> SurveyBuilder {
        self.push_question(id, text, qtype, options)
    }

    /// Attaches a legacy id-keyed skip rule to an already-added question.
    pub fn skip_rule(
        mut self,
        question_id: u64,
        answer: &str,
        next_question_id: u64,
    ) -> Result<SurveyBuilder, SurveyError> {
        let question = self
            .survey
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or(SurveyError::UnknownQuestion(question_id))?;
        question.skip_logic.push(SkipRule {
            answer: answer.to_string(),
            next_question_id,
        });
        Ok(self)
    }

    pub fn build(self) -> Result<Survey, SurveyError> {
        if self.survey.questions.is_empty() {
            return Err(SurveyError::EmptySurvey);
        }
        Ok(self.survey)
    }

    /// Builds and immediately activates, for surveys going straight into the
    /// field.
    pub fn build_active(mut self) -> Result<Survey, SurveyError> {
        self.survey.status = SurveyStatus::Active;
        if self.survey.questions.is_empty() {
            return Err(SurveyError::EmptySurvey);
        }
        Ok(self.survey)
    }

    fn push_question(
        mut self,
        id: u64,
        text: &str,
        qtype: QuestionType,
        options: Vec<CanonicalOption>,
    ) -> SurveyBuilder {
        let order = self.survey.questions.len() as u32;
        self.survey.questions.push(Question {
            id,
            text: text.to_string(),
            qtype,
            options,
            skip_logic: Vec::new(),
            order,
        });
        self
    }

    fn recompute(&mut self) {
        let n = self.survey.collector_ids.len() as u64;
        self.survey.goal_per_collector = if self.survey.goal > 0 && n > 0 {
            (self.survey.goal + n - 1) / n
        } else {
            0
        };
    }
}
