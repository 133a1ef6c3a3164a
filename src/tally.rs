use log::{debug, info, warn};

use survey_logic::heatmap::run_heatmap;
use survey_logic::navigator::{NextStep, Session};
use survey_logic::*;

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use std::collections::HashSet;
use text_diff::print_diff;

use crate::tally::config_reader::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No readable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading a record of {path}"))]
    ParsingCsv { source: csv::Error, path: String },
    #[snafu(display("No header row in {path}"))]
    EmptyFile { path: String },
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display("Error writing output to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display(""))]
    ParsingJsonNumber {},
    #[snafu(display(""))]
    MissingParentDir {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

/// A response, as parsed by the readers.
/// Answers are still raw JSON values: decoding and survey checks happen in
/// [validate_responses].
#[derive(PartialEq, Debug, Clone)]
pub struct ParsedResponse {
    pub id: Option<String>,
    pub survey_id: Option<u64>,
    pub collector_id: Option<u64>,
    /// Stringified question id -> raw answer, in source order.
    pub answers: Vec<(String, JSValue)>,
    pub location: JSValue,
}

pub mod config_reader {
    use crate::tally::*;

    /// The survey definition, as exported by the collection platform.
    /// Options and skip logic are kept raw here: the decoding rules live in
    /// the `survey_logic` crate.
    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SurveyDef {
        pub id: u64,
        pub title: String,
        pub description: Option<String>,
        pub status: Option<SurveyStatus>,
        pub goal: Option<u64>,
        #[serde(rename = "goalPerCollector")]
        pub goal_per_collector: Option<u64>,
        #[serde(rename = "clientId")]
        pub client_id: Option<u64>,
        #[serde(rename = "createdById")]
        pub created_by: Option<u64>,
        #[serde(rename = "collectorIds", default)]
        pub collector_ids: Vec<u64>,
        pub questions: Vec<QuestionDef>,
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct QuestionDef {
        pub id: u64,
        pub text: String,
        #[serde(rename = "type")]
        pub qtype: QuestionType,
        #[serde(default)]
        pub options: JSValue,
        #[serde(rename = "skipLogic", default)]
        pub skip_logic: Vec<SkipRule>,
        pub order: Option<u32>,
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FileSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "answerDelimiter")]
        pub answer_delimiter: Option<String>,
        #[serde(rename = "firstResponseRowIndex")]
        _first_response_row_index: Option<JSValue>,
        #[serde(rename = "idColumnIndex")]
        pub id_column_index: Option<JSValue>,
        #[serde(rename = "latColumnIndex")]
        pub lat_column_index: Option<JSValue>,
        #[serde(rename = "lngColumnIndex")]
        pub lng_column_index: Option<JSValue>,
        #[serde(rename = "excelWorksheetName")]
        pub excel_worksheet_name: Option<String>,
    }

    impl FileSource {
        /// 0-based index of the first data row. Defaults to 1 (one header row).
        pub fn first_response_row_index(&self) -> TallyResult<usize> {
            match &self._first_response_row_index {
                None => Ok(1),
                x => {
                    let idx = read_js_int(x)?;
                    if idx < 1 {
                        whatever!("firstResponseRowIndex must be >= 1, got {}", idx);
                    }
                    Ok(idx - 1)
                }
            }
        }

        pub fn id_column(&self) -> TallyResult<Option<usize>> {
            read_opt_column(&self.id_column_index)
        }

        pub fn lat_column(&self) -> TallyResult<Option<usize>> {
            read_opt_column(&self.lat_column_index)
        }

        pub fn lng_column(&self) -> TallyResult<Option<usize>> {
            read_opt_column(&self.lng_column_index)
        }

        pub fn delimiter(&self) -> String {
            self.answer_delimiter.clone().unwrap_or_else(|| ";".to_string())
        }
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct TallyConfig {
        pub survey: SurveyDef,
        #[serde(rename = "responseSources", default)]
        pub response_sources: Vec<FileSource>,
    }

    pub fn read_config(path: &str) -> TallyResult<TallyConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let config: TallyConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        debug!("read_config: {:?}", config);
        Ok(config)
    }

    /// Turns the raw export into the canonical in-memory survey: questions
    /// sorted by their declared order, options decoded, derived fields filled.
    pub fn build_survey(def: &SurveyDef) -> Survey {
        let mut defs: Vec<(u32, &QuestionDef)> = def
            .questions
            .iter()
            .enumerate()
            .map(|(idx, q)| (q.order.unwrap_or(idx as u32), q))
            .collect();
        defs.sort_by_key(|(order, _)| *order);

        let questions: Vec<Question> = defs
            .iter()
            .enumerate()
            .map(|(idx, (_, q))| Question {
                id: q.id,
                text: q.text.clone(),
                qtype: q.qtype,
                options: decode_options(&q.options),
                skip_logic: q.skip_logic.clone(),
                order: idx as u32,
            })
            .collect();

        let goal = def.goal.unwrap_or(0);
        let n = def.collector_ids.len() as u64;
        let goal_per_collector = def.goal_per_collector.unwrap_or({
            if goal > 0 && n > 0 {
                (goal + n - 1) / n
            } else {
                0
            }
        });

        Survey {
            id: def.id,
            title: def.title.clone(),
            description: def.description.clone(),
            status: def.status.unwrap_or(SurveyStatus::Inactive),
            goal,
            goal_per_collector,
            questions,
            collector_ids: def.collector_ids.clone(),
            client_id: def.client_id,
            created_by: def.created_by,
        }
    }

    pub fn read_summary(path: String) -> TallyResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        debug!("read_summary: {:?}", js);
        Ok(js)
    }

    /// A 1-based column reference: a number, a numeric string or an Excel
    /// column letter ("A", "B", ..).
    fn read_js_int(x: &Option<JSValue>) -> TallyResult<usize> {
        match x {
            Some(JSValue::Number(n)) => n
                .as_u64()
                .map(|x| x as usize)
                .context(ParsingJsonNumberSnafu {}),
            Some(JSValue::String(s)) => match s.parse::<usize>() {
                Result::Ok(x) => Ok(x),
                Err(_) => column_letters(s).context(ParsingJsonNumberSnafu {}),
            },
            _ => None.context(ParsingJsonNumberSnafu {}),
        }
    }

    fn read_opt_column(x: &Option<JSValue>) -> TallyResult<Option<usize>> {
        match x {
            None => Ok(None),
            x => {
                let idx = read_js_int(x)?;
                if idx < 1 {
                    whatever!("column indices are 1-based, got {}", idx);
                }
                Ok(Some(idx - 1))
            }
        }
    }

    fn column_letters(s: &str) -> Option<usize> {
        if s.is_empty() {
            return None;
        }
        let mut acc: usize = 0;
        for c in s.chars() {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_uppercase() {
                return None;
            }
            acc = acc * 26 + (c as usize - 'A' as usize + 1);
        }
        Some(acc)
    }
}

/// Splits a spreadsheet answer cell on the configured delimiter. Cells with
/// the delimiter become arrays (multi-select), blanks become null.
fn parse_answer_cell(cell: &str, delim: &str) -> JSValue {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return JSValue::Null;
    }
    if trimmed.contains(delim) {
        let parts: Vec<JSValue> = trimmed
            .split(delim)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| json!(s))
            .collect();
        JSValue::Array(parts)
    } else {
        json!(trimmed)
    }
}

/// Assembles the location payload of a row from its coordinate cells. Rows
/// with a missing coordinate have no payload at all.
fn row_location(lat: Option<JSValue>, lng: Option<JSValue>) -> JSValue {
    match (lat, lng) {
        (Some(lat), Some(lng)) if !lat.is_null() && !lng.is_null() => {
            json!({ "lat": lat, "lng": lng })
        }
        _ => JSValue::Null,
    }
}

pub mod json_reader {
    use crate::tally::*;

    /// One element of a platform response export.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct RawResponse {
        id: Option<JSValue>,
        #[serde(rename = "surveyId")]
        survey_id: Option<u64>,
        #[serde(rename = "collectorId")]
        collector_id: Option<u64>,
        #[serde(default)]
        data: JSMap<String, JSValue>,
        #[serde(default)]
        location: JSValue,
    }

    pub fn read_json_file(path: String) -> TallyResult<Vec<ParsedResponse>> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let raw: Vec<RawResponse> =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        let mut res: Vec<ParsedResponse> = Vec::new();
        for rr in raw {
            let id = rr.id.as_ref().map(|x| match x {
                JSValue::String(s) => s.clone(),
                x => x.to_string(),
            });
            let answers: Vec<(String, JSValue)> =
                rr.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            res.push(ParsedResponse {
                id,
                survey_id: rr.survey_id,
                collector_id: rr.collector_id,
                answers,
                location: rr.location,
            });
        }
        Ok(res)
    }
}

pub mod csv_reader {
    use crate::tally::*;

    pub fn read_csv_file(path: String, cfs: &FileSource) -> TallyResult<Vec<ParsedResponse>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.clone())
            .context(OpeningCsvSnafu { path: path.clone() })?;
        let mut records: Vec<csv::StringRecord> = Vec::new();
        for rec in rdr.records() {
            records.push(rec.context(ParsingCsvSnafu { path: path.clone() })?);
        }
        let header = records.first().context(EmptyFileSnafu { path: path.clone() })?;
        debug!("header: {:?}", header);

        let id_col = cfs.id_column()?;
        let lat_col = cfs.lat_column()?;
        let lng_col = cfs.lng_column()?;
        let delim = cfs.delimiter();
        let bookkeeping: HashSet<usize> =
            [id_col, lat_col, lng_col].iter().flatten().cloned().collect();

        // The remaining header cells name the questions by id.
        let question_cols: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(idx, _)| !bookkeeping.contains(idx))
            .map(|(idx, name)| (idx, name.trim().to_string()))
            .collect();

        let first_row = cfs.first_response_row_index()?;
        let mut res: Vec<ParsedResponse> = Vec::new();
        for record in records.iter().skip(first_row) {
            let cell = |col: Option<usize>| -> Option<JSValue> {
                col.and_then(|idx| record.get(idx))
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| json!(s))
            };
            let id = cell(id_col).and_then(|v| v.as_str().map(|s| s.to_string()));
            let location = row_location(cell(lat_col), cell(lng_col));
            let mut answers: Vec<(String, JSValue)> = Vec::new();
            for (idx, qid) in question_cols.iter() {
                let raw = record
                    .get(*idx)
                    .map(|s| parse_answer_cell(s, &delim))
                    .unwrap_or(JSValue::Null);
                if !raw.is_null() {
                    answers.push((qid.clone(), raw));
                }
            }
            res.push(ParsedResponse {
                id,
                survey_id: None,
                collector_id: None,
                answers,
                location,
            });
        }
        Ok(res)
    }
}

pub mod excel_reader {
    use crate::tally::*;

    pub fn read_excel_file(path: String, cfs: &FileSource) -> TallyResult<Vec<ParsedResponse>> {
        let p = path.clone();
        let mut workbook: Xlsx<_> =
            open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;
        let wrange = match &cfs.excel_worksheet_name {
            Some(name) => workbook
                .worksheet_range(name)
                .context(EmptyExcelSnafu { path: path.clone() })?
                .context(OpeningExcelSnafu { path: path.clone() })?,
            None => workbook
                .worksheet_range_at(0)
                .context(EmptyExcelSnafu { path: path.clone() })?
                .context(OpeningExcelSnafu { path: path.clone() })?,
        };
        let header = wrange
            .rows()
            .next()
            .context(EmptyFileSnafu { path: path.clone() })?;
        debug!("header: {:?}", header);

        let id_col = cfs.id_column()?;
        let lat_col = cfs.lat_column()?;
        let lng_col = cfs.lng_column()?;
        let delim = cfs.delimiter();
        let bookkeeping: HashSet<usize> =
            [id_col, lat_col, lng_col].iter().flatten().cloned().collect();

        let question_cols: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(idx, _)| !bookkeeping.contains(idx))
            .map(|(idx, cell)| (idx, header_cell(cell)))
            .collect();

        let first_row = cfs.first_response_row_index()?;
        let mut res: Vec<ParsedResponse> = Vec::new();
        for row in wrange.rows().skip(first_row) {
            debug!("workbook: {:?}", row);
            let id = id_col
                .and_then(|idx| row.get(idx))
                .and_then(cell_string);
            let location = row_location(
                lat_col.and_then(|idx| row.get(idx)).and_then(cell_scalar),
                lng_col.and_then(|idx| row.get(idx)).and_then(cell_scalar),
            );
            let mut answers: Vec<(String, JSValue)> = Vec::new();
            for (idx, qid) in question_cols.iter() {
                let raw = match row.get(*idx) {
                    Some(cell) => answer_cell(cell, &delim)?,
                    None => JSValue::Null,
                };
                if !raw.is_null() {
                    answers.push((qid.clone(), raw));
                }
            }
            res.push(ParsedResponse {
                id,
                survey_id: None,
                collector_id: None,
                answers,
                location,
            });
        }
        Ok(res)
    }

    fn header_cell(cell: &calamine::DataType) -> String {
        match cell {
            calamine::DataType::String(s) => s.trim().to_string(),
            calamine::DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            calamine::DataType::Int(i) => i.to_string(),
            x => x.to_string(),
        }
    }

    fn answer_cell(cell: &calamine::DataType, delim: &str) -> TallyResult<JSValue> {
        match cell {
            calamine::DataType::String(s) => Ok(parse_answer_cell(s, delim)),
            // Integral floats render without the fraction, like header_cell,
            // so a numeric answer buckets with an option declared as "4".
            calamine::DataType::Float(f) if f.fract() == 0.0 => Ok(json!(*f as i64)),
            calamine::DataType::Float(f) => Ok(json!(f)),
            calamine::DataType::Int(i) => Ok(json!(i)),
            calamine::DataType::Bool(b) => Ok(json!(b)),
            calamine::DataType::Empty => Ok(JSValue::Null),
            _ => whatever!("answer_cell: could not understand cell {:?}", cell),
        }
    }

    fn cell_scalar(cell: &calamine::DataType) -> Option<JSValue> {
        match cell {
            calamine::DataType::String(s) if !s.trim().is_empty() => Some(json!(s.trim())),
            calamine::DataType::Float(f) => Some(json!(f)),
            calamine::DataType::Int(i) => Some(json!(i)),
            _ => None,
        }
    }

    fn cell_string(cell: &calamine::DataType) -> Option<String> {
        cell_scalar(cell).map(|v| match v {
            JSValue::String(s) => s,
            x => x.to_string(),
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn integral_float_cells_render_without_fraction() {
            let cell = calamine::DataType::Float(4.0);
            assert_eq!(answer_cell(&cell, ";").unwrap(), json!(4));
            assert_eq!(header_cell(&cell), "4");
            let cell = calamine::DataType::Float(4.5);
            assert_eq!(answer_cell(&cell, ";").unwrap(), json!(4.5));
        }
    }
}

fn read_response_data(root_path: String, cfs: &FileSource) -> TallyResult<Vec<ParsedResponse>> {
    let p: PathBuf = [root_path, cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read response file {:?}", p2);
    match cfs.provider.as_str() {
        "json" => json_reader::read_json_file(p2),
        "csv" => csv_reader::read_csv_file(p2, cfs),
        "xlsx" => excel_reader::read_excel_file(p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

/// Checks the parsed responses against the survey and decodes their answers
/// into the canonical form. Responses tagged with a different survey id are
/// dropped, as are answers for questions the survey does not have.
fn validate_responses(parsed: &[ParsedResponse], survey: &Survey) -> Vec<Response> {
    let known: HashSet<String> = survey.questions.iter().map(|q| q.id.to_string()).collect();
    let mut res: Vec<Response> = Vec::new();
    for pr in parsed.iter() {
        if let Some(sid) = pr.survey_id {
            if sid != survey.id {
                warn!(
                    "validate_responses: response {:?} belongs to survey {}, skipping",
                    pr.id, sid
                );
                continue;
            }
        }
        let mut data = std::collections::BTreeMap::new();
        for (qid, raw) in pr.answers.iter() {
            if !known.contains(qid) {
                warn!(
                    "validate_responses: response {:?}: dropping answer for unknown question {}",
                    pr.id, qid
                );
                continue;
            }
            if let Some(answer) = decode_answer(raw) {
                data.insert(qid.clone(), answer);
            }
        }
        let id = pr
            .id
            .as_ref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(res.len() as u64 + 1);
        res.push(Response {
            id,
            survey_id: survey.id,
            collector_id: pr.collector_id,
            data,
            location: pr.location.clone(),
        });
    }
    res
}

fn question_stats_to_json(stats: &QuestionStats) -> JSValue {
    let mut q: JSMap<String, JSValue> = JSMap::new();
    q.insert("id".to_string(), json!(stats.id));
    q.insert("text".to_string(), json!(stats.text));
    q.insert(
        "type".to_string(),
        serde_json::to_value(stats.qtype).unwrap_or(JSValue::Null),
    );
    q.insert("total".to_string(), json!(stats.total));
    match &stats.data {
        StatsData::Choice(buckets) => {
            let data: Vec<JSValue> = buckets
                .iter()
                .map(|b| json!({"name": b.name, "value": b.value, "percentage": b.percentage}))
                .collect();
            q.insert("data".to_string(), JSValue::Array(data));
        }
        StatsData::Text(summary) => {
            q.insert("textAnswers".to_string(), json!(summary.answers));
            q.insert("filledCount".to_string(), json!(summary.filled_count));
            q.insert(
                "filledPercentage".to_string(),
                json!(summary.filled_percentage),
            );
        }
    }
    JSValue::Object(q)
}

fn build_summary_js(report: &SurveyReport) -> JSValue {
    let questions: Vec<JSValue> = report.questions.iter().map(question_stats_to_json).collect();
    let mut summary: JSMap<String, JSValue> = JSMap::new();
    summary.insert("surveyTitle".to_string(), json!(report.survey_title));
    summary.insert("totalResponses".to_string(), json!(report.total_responses));
    summary.insert("goal".to_string(), json!(report.goal));
    if let Some(gc) = report.goal_completion {
        summary.insert("goalCompletion".to_string(), json!(gc));
    }
    summary.insert("questions".to_string(), JSValue::Array(questions));
    JSValue::Object(summary)
}

fn load_inputs(config_path: &str) -> TallyResult<(Survey, Vec<Response>)> {
    let config = read_config(config_path)?;
    let survey = build_survey(&config.survey);
    info!(
        "load_inputs: survey {} with {} questions",
        survey.id,
        survey.questions.len()
    );

    if config.response_sources.is_empty() {
        whatever!("no response sources declared in {}", config_path);
    }

    let config_p = Path::new(config_path);
    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let mut responses: Vec<Response> = Vec::new();
    for cfs in config.response_sources.iter() {
        let parsed = read_response_data(root_p.display().to_string(), cfs)?;
        debug!("load_inputs: {} parsed responses from {:?}", parsed.len(), cfs.file_path);
        let mut validated = validate_responses(&parsed, &survey);
        responses.append(&mut validated);
    }
    info!("load_inputs: {} responses total", responses.len());
    Ok((survey, responses))
}

/// Tabulates the statistics summary for a survey. When a reference summary is
/// provided, the output is compared against it and a difference is an error.
pub fn run_report(
    config_path: String,
    filter: Option<ResponseFilter>,
    check_summary_path: Option<String>,
) -> TallyResult<JSValue> {
    let (survey, responses) = load_inputs(config_path.as_str())?;

    let report = match run_survey_report(&survey, &responses, filter.as_ref()) {
        Result::Ok(x) => x,
        Result::Err(x) => {
            whatever!("Survey error: {:?}", x)
        }
    };

    let result_js = build_summary_js(&report);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_str(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(result_js)
}

/// Produces the list of usable response coordinates, one `{lat, lng}` object
/// per response that carries one.
pub fn run_heatmap_export(
    config_path: String,
    filter: Option<ResponseFilter>,
) -> TallyResult<JSValue> {
    let (survey, responses) = load_inputs(config_path.as_str())?;
    if let Some(f) = &filter {
        if survey.question_position(f.question_id).is_none() {
            whatever!("Survey error: {:?}", SurveyError::UnknownQuestion(f.question_id));
        }
    }
    let points = run_heatmap(&responses, filter.as_ref());
    info!("run_heatmap_export: {} usable locations", points.len());
    serde_json::to_value(&points).context(ParsingJsonSnafu {})
}

/// Replays a script of answers through the questionnaire and reports the
/// sequence of visited questions along with the assembled response.
pub fn run_walkthrough(config_path: String, script_path: String) -> TallyResult<JSValue> {
    let config = read_config(config_path.as_str())?;
    let survey = build_survey(&config.survey);

    let contents = fs::read_to_string(script_path).context(OpeningJsonSnafu {})?;
    let script: Vec<JSValue> =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;

    let mut session = match Session::new(&survey) {
        Result::Ok(s) => s,
        Result::Err(x) => {
            whatever!("Survey error: {:?}", x)
        }
    };

    let mut visited: Vec<usize> = vec![0];
    for (idx, raw) in script.iter().enumerate() {
        if session.is_complete() {
            warn!(
                "run_walkthrough: questionnaire ended, {} unused script entries",
                script.len() - idx
            );
            break;
        }
        let answer = match decode_answer(raw) {
            Some(a) => a,
            None => {
                whatever!("script entry {} is empty", idx)
            }
        };
        match session.answer_current(answer, None) {
            NextStep::Question(next) => visited.push(next),
            NextStep::Complete => {}
        }
    }

    let completed = session.is_complete();
    let response = session.into_response(0, None);
    Ok(json!({
        "visited": visited,
        "completed": completed,
        "response": {
            "surveyId": response.survey_id,
            "data": response.data,
        }
    }))
}

fn run_tally_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
    let test_dir = option_env!("SURVTAB_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    info!("Running test {}", test_name);
    let res = run_report(
        format!("{}/{}/{}", test_dir, test_name, config_lpath),
        None,
        Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
    );
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = snafu::ErrorCompat::backtrace(e) {
            eprintln!("trace: {}", bt);
        }
    }
    assert!(res.is_ok());
}

pub fn test_wrapper(test_name: &str) {
    run_tally_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
