//! The question-graph navigator: given the question just answered, decide
//! which question to present next or whether the survey is complete.
//!
//! Two skip-logic representations coexist in authored surveys. Options may
//! embed a `JumpTarget` (index-based, the canonical mechanism), and questions
//! may carry legacy id-keyed rules. Resolution tries the embedded jumps first
//! and falls back to the legacy rules, so both kinds of survey keep working.

use log::debug;

use std::collections::BTreeMap;

use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::heatmap::GeoPoint;
use crate::model::{
    AnswerValue, JumpTarget, Question, Response, Survey, SurveyError,
};

/// Outcome of one navigation decision.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum NextStep {
    /// Present the question at this position next.
    Question(usize),
    /// The survey is complete (terminate sentinel or walked past the end).
    Complete,
}

/// Computes the next question to present after answering `current`.
///
/// Precedence:
/// 1. default: the next question in sequence,
/// 2. option-embedded jumps, scanning every selected value. A terminate
///    target wins over everything; otherwise the furthest-forward candidate
///    index wins. A backward target is honored when it is the winner.
/// 3. legacy id-keyed rules, consulted only when no embedded jump applied,
///    resolved by linear search over the question list.
///
/// An answer matching no option and no rule falls through to the default.
/// The resolved index is bounds-checked last: past-the-end means complete.
pub fn next_step(
    current: &Question,
    current_index: usize,
    answer: &AnswerValue,
    all_questions: &[Question],
) -> NextStep {
    let mut resolved = current_index + 1;

    match option_jump(current, answer) {
        Some(JumpTarget::End) => {
            debug!(
                "next_step: question {} answer {:?}: terminate",
                current.id, answer
            );
            return NextStep::Complete;
        }
        Some(JumpTarget::Index(idx)) => {
            resolved = idx;
        }
        None => {
            if let Some(idx) = legacy_jump(current, answer, all_questions) {
                resolved = idx;
            }
        }
    }

    debug!(
        "next_step: question {} answer {:?}: resolved index {}",
        current.id, answer, resolved
    );
    if resolved < all_questions.len() {
        NextStep::Question(resolved)
    } else {
        NextStep::Complete
    }
}

/// Resolves the option-embedded jumps for every selected value. Returns
/// `End` as soon as any selection carries the terminate target, otherwise
/// the maximum of all candidate indices.
fn option_jump(question: &Question, answer: &AnswerValue) -> Option<JumpTarget> {
    if !question.qtype.is_choice() {
        return None;
    }
    let selected: Vec<&str> = match answer {
        AnswerValue::Single(s) => vec![s.as_str()],
        AnswerValue::Multi(vs) => vs.iter().map(|s| s.as_str()).collect(),
    };

    let mut furthest: Option<usize> = None;
    for value in selected {
        let jump = question
            .options
            .iter()
            .find(|opt| opt.text == value)
            .and_then(|opt| opt.jump);
        match jump {
            Some(JumpTarget::End) => return Some(JumpTarget::End),
            Some(JumpTarget::Index(idx)) => {
                furthest = Some(furthest.map_or(idx, |f| f.max(idx)));
            }
            None => {}
        }
    }
    furthest.map(JumpTarget::Index)
}

/// Legacy fallback: an exact answer match on the question's rule list,
/// with the target question *id* resolved to a position. Legacy rules never
/// supported multi-select.
fn legacy_jump(
    question: &Question,
    answer: &AnswerValue,
    all_questions: &[Question],
) -> Option<usize> {
    let scalar = match answer {
        AnswerValue::Single(s) => s,
        AnswerValue::Multi(_) => return None,
    };
    let rule = question.skip_logic.iter().find(|r| &r.answer == scalar)?;
    all_questions
        .iter()
        .position(|q| q.id == rule.next_question_id)
}

/// Caller-side execution state for one collection session.
///
/// The navigator itself is stateless; the session owns what the executing
/// client must track: the cursor, the answer map, the visited-index history
/// needed for "go back", and the locations captured per question. Location
/// capture is the caller's concern: a failed fix is simply not recorded and
/// never blocks advancing.
#[derive(Debug, Clone)]
pub struct Session<'a> {
    survey: &'a Survey,
    cursor: Option<usize>,
    history: Vec<usize>,
    answers: BTreeMap<String, AnswerValue>,
    locations: BTreeMap<String, GeoPoint>,
}

impl<'a> Session<'a> {
    pub fn new(survey: &'a Survey) -> Result<Session<'a>, SurveyError> {
        if survey.questions.is_empty() {
            return Err(SurveyError::EmptySurvey);
        }
        Ok(Session {
            survey,
            cursor: Some(0),
            history: Vec::new(),
            answers: BTreeMap::new(),
            locations: BTreeMap::new(),
        })
    }

    /// The question currently presented, or none once the survey completed.
    pub fn current_question(&self) -> Option<&'a Question> {
        self.cursor.map(|idx| &self.survey.questions[idx])
    }

    pub fn current_index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor.is_none()
    }

    /// Indices visited before the current one, oldest first.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Records the answer (and the location fix, when one was obtained) for
    /// the current question and advances the cursor.
    pub fn answer_current(&mut self, answer: AnswerValue, location: Option<GeoPoint>) -> NextStep {
        let idx = match self.cursor {
            Some(idx) => idx,
            None => return NextStep::Complete,
        };
        let question = &self.survey.questions[idx];
        let key = question.id.to_string();
        self.answers.insert(key.clone(), answer.clone());
        if let Some(point) = location {
            self.locations.insert(key, point);
        }

        let step = next_step(question, idx, &answer, &self.survey.questions);
        self.history.push(idx);
        self.cursor = match step {
            NextStep::Question(next) => Some(next),
            NextStep::Complete => None,
        };
        step
    }

    /// Returns to the previously visited question by popping the history
    /// stack. Forward-jump logic is not re-run. Returns the restored index.
    pub fn back(&mut self) -> Option<usize> {
        let prev = self.history.pop()?;
        self.cursor = Some(prev);
        Some(prev)
    }

    /// Assembles the record the collection client submits on completion:
    /// the answer map plus a per-question location payload.
    pub fn into_response(self, response_id: u64, collector_id: Option<u64>) -> Response {
        let mut location = JSMap::new();
        for (key, point) in &self.locations {
            location.insert(
                key.clone(),
                serde_json::json!({"lat": point.lat, "lng": point.lng}),
            );
        }
        Response {
            id: response_id,
            survey_id: self.survey.id,
            collector_id,
            data: self.answers,
            location: JSValue::Object(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SurveyBuilder;
    use crate::model::{CanonicalOption, QuestionType};

    fn single(s: &str) -> AnswerValue {
        AnswerValue::Single(s.to_string())
    }

    fn multi(vs: &[&str]) -> AnswerValue {
        AnswerValue::Multi(vs.iter().map(|s| s.to_string()).collect())
    }

    /// Five questions: q0 plain text, q1 single-choice with jumps,
    /// q2..q4 plain text. Ids are 100 + index.
    fn jump_survey() -> Survey {
        SurveyBuilder::new(1, "branching")
            .text_question(100, "intro")
            .choice_question(
                101,
                "route",
                QuestionType::SingleChoice,
                vec![
                    CanonicalOption::new("Skip ahead").jump_to(3),
                    CanonicalOption::new("Stop here").ends_survey(),
                    CanonicalOption::new("Go back").jump_to(0),
                    CanonicalOption::new("Continue"),
                ],
            )
            .text_question(102, "detail")
            .text_question(103, "landing")
            .text_question(104, "outro")
            .build()
            .unwrap()
    }

    #[test]
    fn no_rules_advance_sequentially() {
        let s = jump_survey();
        let step = next_step(&s.questions[0], 0, &single("anything"), &s.questions);
        assert_eq!(step, NextStep::Question(1));
    }

    #[test]
    fn option_jump_skips_forward() {
        let s = jump_survey();
        let step = next_step(&s.questions[1], 1, &single("Skip ahead"), &s.questions);
        assert_eq!(step, NextStep::Question(3));
    }

    #[test]
    fn terminate_sentinel_completes() {
        let s = jump_survey();
        let step = next_step(&s.questions[1], 1, &single("Stop here"), &s.questions);
        assert_eq!(step, NextStep::Complete);
    }

    #[test]
    fn backward_jump_is_honored() {
        let s = jump_survey();
        let step = next_step(&s.questions[1], 1, &single("Go back"), &s.questions);
        assert_eq!(step, NextStep::Question(0));
    }

    #[test]
    fn unmatched_answer_falls_through_to_default() {
        let s = jump_survey();
        let step = next_step(&s.questions[1], 1, &single("Unlisted"), &s.questions);
        assert_eq!(step, NextStep::Question(2));
    }

    #[test]
    fn multi_select_furthest_jump_wins() {
        let s = SurveyBuilder::new(2, "multi")
            .choice_question(
                200,
                "pick",
                QuestionType::MultipleChoice,
                vec![
                    CanonicalOption::new("X").jump_to(2),
                    CanonicalOption::new("Y").jump_to(5),
                    CanonicalOption::new("Z"),
                ],
            )
            .text_question(201, "a")
            .text_question(202, "b")
            .text_question(203, "c")
            .text_question(204, "d")
            .text_question(205, "e")
            .build()
            .unwrap();
        let step = next_step(&s.questions[0], 0, &multi(&["X", "Y"]), &s.questions);
        assert_eq!(step, NextStep::Question(5));
        // A selection with no jump does not pull the result back.
        let step = next_step(&s.questions[0], 0, &multi(&["Z", "X"]), &s.questions);
        assert_eq!(step, NextStep::Question(2));
    }

    #[test]
    fn multi_select_terminate_beats_jumps() {
        let s = SurveyBuilder::new(3, "multi-end")
            .choice_question(
                300,
                "pick",
                QuestionType::MultipleChoice,
                vec![
                    CanonicalOption::new("X").jump_to(2),
                    CanonicalOption::new("Quit").ends_survey(),
                ],
            )
            .text_question(301, "a")
            .text_question(302, "b")
            .build()
            .unwrap();
        let step = next_step(&s.questions[0], 0, &multi(&["X", "Quit"]), &s.questions);
        assert_eq!(step, NextStep::Complete);
    }

    #[test]
    fn legacy_rule_resolves_question_id_to_position() {
        let s = SurveyBuilder::new(4, "legacy")
            .text_question(1, "start")
            .text_question(2, "middle")
            .text_question(3, "also middle")
            .text_question(4, "target")
            .skip_rule(1, "Skip", 4)
            .unwrap()
            .build()
            .unwrap();
        let step = next_step(&s.questions[0], 0, &single("Skip"), &s.questions);
        assert_eq!(step, NextStep::Question(3));
        // Non-matching answers keep the sequence.
        let step = next_step(&s.questions[0], 0, &single("Stay"), &s.questions);
        assert_eq!(step, NextStep::Question(1));
    }

    #[test]
    fn embedded_jump_outranks_legacy_rule() {
        let s = SurveyBuilder::new(5, "priority")
            .choice_question(
                1,
                "route",
                QuestionType::SingleChoice,
                vec![CanonicalOption::new("Both").jump_to(2)],
            )
            .text_question(2, "a")
            .text_question(3, "b")
            .text_question(4, "c")
            .skip_rule(1, "Both", 4)
            .unwrap()
            .build()
            .unwrap();
        let step = next_step(&s.questions[0], 0, &single("Both"), &s.questions);
        assert_eq!(step, NextStep::Question(2));
    }

    #[test]
    fn walking_past_the_end_completes() {
        let s = jump_survey();
        let last = s.questions.len() - 1;
        let step = next_step(&s.questions[last], last, &single("done"), &s.questions);
        assert_eq!(step, NextStep::Complete);
    }

    #[test]
    fn session_round_trip_records_visits_and_assembles_response() {
        // Q1 has no jumps, Q2 jumps {end, backward, default} per option.
        let s = SurveyBuilder::new(9, "round-trip")
            .text_question(11, "first")
            .choice_question(
                12,
                "branch",
                QuestionType::SingleChoice,
                vec![
                    CanonicalOption::new("End").ends_survey(),
                    CanonicalOption::new("Restart").jump_to(0),
                    CanonicalOption::new("On"),
                ],
            )
            .text_question(13, "last")
            .build()
            .unwrap();

        let mut session = Session::new(&s).unwrap();
        let mut visited = vec![session.current_index().unwrap()];

        // Forward default, backward jump, forward again, then finish.
        for answer in ["hello", "Restart", "hello again", "On", "bye"] {
            let step = session.answer_current(single(answer), None);
            if let NextStep::Question(idx) = step {
                visited.push(idx);
            }
        }
        assert_eq!(visited, vec![0, 1, 0, 1, 2]);
        assert!(session.is_complete());

        let response = session.into_response(77, Some(5));
        assert_eq!(response.survey_id, 9);
        assert_eq!(response.data.get("12"), Some(&single("On")));
        assert_eq!(response.data.get("13"), Some(&single("bye")));
    }

    #[test]
    fn session_terminate_short_circuits() {
        let s = jump_survey();
        let mut session = Session::new(&s).unwrap();
        session.answer_current(single("hi"), None);
        let step = session.answer_current(single("Stop here"), None);
        assert_eq!(step, NextStep::Complete);
        assert!(session.is_complete());
    }

    #[test]
    fn back_pops_history_without_rerunning_jumps() {
        let s = jump_survey();
        let mut session = Session::new(&s).unwrap();
        session.answer_current(single("hi"), None);
        session.answer_current(single("Skip ahead"), None);
        assert_eq!(session.current_index(), Some(3));
        assert_eq!(session.back(), Some(1));
        assert_eq!(session.back(), Some(0));
        assert_eq!(session.back(), None);
        assert_eq!(session.current_index(), Some(0));
    }

    #[test]
    fn session_records_locations_per_question() {
        let s = jump_survey();
        let mut session = Session::new(&s).unwrap();
        session.answer_current(
            single("hi"),
            Some(GeoPoint {
                lat: -16.9,
                lng: -49.3,
            }),
        );
        // GPS fix failed for the second answer: recorded without location.
        session.answer_current(single("Continue"), None);
        let response = session.into_response(1, None);
        let loc = &response.location["100"];
        assert_eq!(loc["lat"], serde_json::json!(-16.9));
        assert!(response.location.get("101").is_none());
    }

    #[test]
    fn empty_survey_cannot_start_a_session() {
        let s = Survey {
            id: 1,
            title: "empty".to_string(),
            description: None,
            status: crate::model::SurveyStatus::Inactive,
            goal: 0,
            goal_per_collector: 0,
            questions: vec![],
            collector_ids: vec![],
            client_id: None,
            created_by: None,
        };
        assert_eq!(Session::new(&s).err(), Some(SurveyError::EmptySurvey));
    }
}
