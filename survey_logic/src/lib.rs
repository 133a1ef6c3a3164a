pub mod builder;
mod decode;
pub mod heatmap;
pub mod manual;
mod model;
pub mod navigator;

use log::{debug, info};

use std::collections::HashMap;

pub use crate::decode::{decode_answer, decode_option, decode_options};
pub use crate::model::*;

// **** Private structures ****

/// Running tally for one choice question. Buckets keep a stable order:
/// declared options first (even at zero), then undeclared stored values in
/// first-encounter order.
struct ChoiceTally {
    labels: Vec<String>,
    counts: HashMap<String, u64>,
    /// Both the option value and its display text resolve to the display
    /// text, so answers stored under either encoding land in the same bucket.
    value_to_label: HashMap<String, String>,
}

impl ChoiceTally {
    fn seeded(options: &[CanonicalOption]) -> ChoiceTally {
        let mut tally = ChoiceTally {
            labels: Vec::new(),
            counts: HashMap::new(),
            value_to_label: HashMap::new(),
        };
        for opt in options {
            tally
                .value_to_label
                .insert(opt.value.clone(), opt.text.clone());
            tally
                .value_to_label
                .insert(opt.text.clone(), opt.text.clone());
            if !tally.counts.contains_key(&opt.text) {
                tally.labels.push(opt.text.clone());
                tally.counts.insert(opt.text.clone(), 0);
            }
        }
        tally
    }

    /// Counts one stored value, seeding a new bucket on the fly when the
    /// value matches no declared option. Unanticipated stored values are
    /// never silently dropped.
    fn bump(&mut self, raw: &str) {
        let label = self
            .value_to_label
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string());
        let entry = self.counts.entry(label.clone()).or_insert_with(|| {
            self.labels.push(label.clone());
            0
        });
        *entry += 1;
    }

    fn into_buckets(self, total: u64) -> Vec<ChoiceBucket> {
        self.labels
            .iter()
            .map(|label| {
                let count = self.counts.get(label).cloned().unwrap_or(0);
                ChoiceBucket {
                    name: label.clone(),
                    value: count,
                    percentage: percentage(count, total),
                }
            })
            .collect()
    }
}

/// Nearest-integer percentage, 0 when the denominator is 0.
fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Runs the report aggregation for a whole survey.
///
/// Arguments:
/// * `survey` the survey definition, questions in order
/// * `responses` the stored responses for this survey
/// * `filter` optional restriction to responses whose answer to a designated
///   question matches a value (contains for multi-select answers)
///
/// The filter is applied once, before aggregation; the size of the filtered
/// set is the denominator for every question's percentages.
pub fn run_survey_report(
    survey: &Survey,
    responses: &[Response],
    filter: Option<&ResponseFilter>,
) -> Result<SurveyReport, SurveyError> {
    info!(
        "run_survey_report: survey {} ({} questions), {} stored responses, filter: {:?}",
        survey.id,
        survey.questions.len(),
        responses.len(),
        filter
    );
    if let Some(f) = filter {
        if survey.question_position(f.question_id).is_none() {
            return Err(SurveyError::UnknownQuestion(f.question_id));
        }
    }

    let selected: Vec<&Response> = responses
        .iter()
        .filter(|r| filter.map_or(true, |f| f.matches(r)))
        .collect();
    let total = selected.len() as u64;
    debug!("run_survey_report: {} responses after filtering", total);

    let questions = survey
        .questions
        .iter()
        .map(|q| aggregate_question(q, &selected, total))
        .collect();

    Ok(SurveyReport {
        survey_title: survey.title.clone(),
        total_responses: total,
        goal: survey.goal,
        goal_completion: if survey.goal > 0 {
            Some(percentage(total, survey.goal))
        } else {
            None
        },
        questions,
    })
}

fn aggregate_question(question: &Question, selected: &[&Response], total: u64) -> QuestionStats {
    let key = question.id.to_string();
    let data = if question.qtype.is_choice() {
        let mut tally = ChoiceTally::seeded(&question.options);
        for r in selected {
            match r.data.get(&key) {
                Some(AnswerValue::Single(v)) => tally.bump(v),
                Some(AnswerValue::Multi(vs)) => {
                    for v in vs {
                        tally.bump(v);
                    }
                }
                None => {}
            }
        }
        StatsData::Choice(tally.into_buckets(total))
    } else {
        let mut answers: Vec<String> = Vec::new();
        for r in selected {
            let raw = match r.data.get(&key) {
                Some(AnswerValue::Single(v)) => v.clone(),
                // A text answer stored as an array is flattened; it only
                // happens through administrative correction scripts.
                Some(AnswerValue::Multi(vs)) => vs.join(", "),
                None => continue,
            };
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                answers.push(trimmed.to_string());
            }
        }
        let filled_count = answers.len() as u64;
        StatsData::Text(TextSummary {
            answers,
            filled_count,
            filled_percentage: percentage(filled_count, total),
        })
    };
    debug!("aggregate_question: question {}: done", question.id);

    QuestionStats {
        id: question.id,
        text: question.text.clone(),
        qtype: question.qtype,
        total,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SurveyBuilder;
    use serde_json::Value as JSValue;
    use std::collections::BTreeMap;

    fn response(id: u64, entries: &[(u64, AnswerValue)]) -> Response {
        let mut data = BTreeMap::new();
        for (qid, answer) in entries {
            data.insert(qid.to_string(), answer.clone());
        }
        Response {
            id,
            survey_id: 1,
            collector_id: None,
            data,
            location: JSValue::Null,
        }
    }

    fn single(s: &str) -> AnswerValue {
        AnswerValue::Single(s.to_string())
    }

    fn choice_survey() -> Survey {
        SurveyBuilder::new(1, "Field test")
            .choice_question(
                10,
                "Pick one",
                QuestionType::SingleChoice,
                vec![CanonicalOption::new("A"), CanonicalOption::new("B")],
            )
            .build()
            .unwrap()
    }

    fn buckets(report: &SurveyReport, idx: usize) -> &Vec<ChoiceBucket> {
        match &report.questions[idx].data {
            StatsData::Choice(buckets) => buckets,
            StatsData::Text(_) => panic!("expected choice stats"),
        }
    }

    #[test]
    fn declared_options_appear_even_at_zero() {
        let survey = choice_survey();
        let responses = vec![response(1, &[(10, single("A"))])];
        let report = run_survey_report(&survey, &responses, None).unwrap();
        let bs = buckets(&report, 0);
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[1].name, "B");
        assert_eq!(bs[1].value, 0);
        assert_eq!(bs[1].percentage, 0);
    }

    #[test]
    fn undeclared_values_seed_new_buckets() {
        let survey = choice_survey();
        let responses = vec![
            response(1, &[(10, single("A"))]),
            response(2, &[(10, single("A"))]),
            response(3, &[(10, single("A"))]),
            response(4, &[(10, single("C"))]),
        ];
        let report = run_survey_report(&survey, &responses, None).unwrap();
        let bs = buckets(&report, 0);
        let a = bs.iter().find(|b| b.name == "A").unwrap();
        assert_eq!((a.value, a.percentage), (3, 75));
        let c = bs.iter().find(|b| b.name == "C").unwrap();
        assert_eq!((c.value, c.percentage), (1, 25));
    }

    #[test]
    fn answers_stored_as_values_or_labels_share_a_bucket() {
        let survey = SurveyBuilder::new(1, "s")
            .choice_question(
                10,
                "Area",
                QuestionType::SingleChoice,
                vec![CanonicalOption::new("Rural").with_value("R")],
            )
            .build()
            .unwrap();
        let responses = vec![
            response(1, &[(10, single("R"))]),
            response(2, &[(10, single("Rural"))]),
        ];
        let report = run_survey_report(&survey, &responses, None).unwrap();
        let bs = buckets(&report, 0);
        assert_eq!(bs.len(), 1);
        assert_eq!(bs[0].name, "Rural");
        assert_eq!(bs[0].value, 2);
        assert_eq!(bs[0].percentage, 100);
    }

    #[test]
    fn multi_select_counts_each_element() {
        let survey = SurveyBuilder::new(1, "s")
            .choice_question(
                10,
                "Pick many",
                QuestionType::MultipleChoice,
                vec![CanonicalOption::new("A"), CanonicalOption::new("B")],
            )
            .build()
            .unwrap();
        let responses = vec![
            response(
                1,
                &[(
                    10,
                    AnswerValue::Multi(vec!["A".to_string(), "B".to_string()]),
                )],
            ),
            response(2, &[(10, single("A"))]),
        ];
        let report = run_survey_report(&survey, &responses, None).unwrap();
        let bs = buckets(&report, 0);
        assert_eq!(bs[0].value, 2);
        assert_eq!(bs[0].percentage, 100);
        assert_eq!(bs[1].value, 1);
        assert_eq!(bs[1].percentage, 50);
    }

    #[test]
    fn text_questions_list_trimmed_non_empty_answers() {
        let survey = SurveyBuilder::new(1, "s")
            .text_question(10, "Comments")
            .build()
            .unwrap();
        let responses = vec![
            response(1, &[(10, single("  first  "))]),
            response(2, &[(10, single("   "))]),
            response(3, &[(10, single("second"))]),
        ];
        let report = run_survey_report(&survey, &responses, None).unwrap();
        match &report.questions[0].data {
            StatsData::Text(summary) => {
                assert_eq!(summary.answers, vec!["first", "second"]);
                assert_eq!(summary.filled_count, 2);
                assert_eq!(summary.filled_percentage, 67);
            }
            StatsData::Choice(_) => panic!("expected text stats"),
        }
    }

    #[test]
    fn empty_response_set_yields_zero_percentages() {
        let survey = choice_survey();
        let report = run_survey_report(&survey, &[], None).unwrap();
        assert_eq!(report.total_responses, 0);
        let bs = buckets(&report, 0);
        assert!(bs.iter().all(|b| b.value == 0 && b.percentage == 0));
    }

    #[test]
    fn filter_fixes_one_shared_denominator() {
        let survey = SurveyBuilder::new(1, "s")
            .choice_question(
                10,
                "Area",
                QuestionType::SingleChoice,
                vec![CanonicalOption::new("Urban"), CanonicalOption::new("Rural")],
            )
            .choice_question(
                11,
                "Served",
                QuestionType::SingleChoice,
                vec![CanonicalOption::new("Yes"), CanonicalOption::new("No")],
            )
            .build()
            .unwrap();
        let responses = vec![
            response(1, &[(10, single("Urban")), (11, single("Yes"))]),
            response(2, &[(10, single("Urban")), (11, single("No"))]),
            response(3, &[(10, single("Rural")), (11, single("Yes"))]),
        ];
        let filter = ResponseFilter {
            question_id: 10,
            answer: "Urban".to_string(),
        };
        let report = run_survey_report(&survey, &responses, Some(&filter)).unwrap();
        assert_eq!(report.total_responses, 2);
        assert!(report.questions.iter().all(|q| q.total == 2));
        let served = buckets(&report, 1);
        assert_eq!(served[0].value, 1);
        assert_eq!(served[0].percentage, 50);
    }

    #[test]
    fn filter_on_unknown_question_is_an_error() {
        let survey = choice_survey();
        let filter = ResponseFilter {
            question_id: 99,
            answer: "x".to_string(),
        };
        let res = run_survey_report(&survey, &[], Some(&filter));
        assert_eq!(res.err(), Some(SurveyError::UnknownQuestion(99)));
    }

    #[test]
    fn goal_completion_is_reported_when_a_goal_is_set() {
        let mut survey = choice_survey();
        survey.set_goal(4).unwrap();
        let responses = vec![
            response(1, &[(10, single("A"))]),
            response(2, &[(10, single("B"))]),
            response(3, &[(10, single("A"))]),
        ];
        let report = run_survey_report(&survey, &responses, None).unwrap();
        assert_eq!(report.goal_completion, Some(75));
        survey.set_goal(0).unwrap();
        let report = run_survey_report(&survey, &responses, None).unwrap();
        assert_eq!(report.goal_completion, None);
    }
}
