use clap::Parser;

/// Survey tabulation program.
///
/// survtab reads a survey definition and its collected responses, replays the
/// skip logic of the questionnaire and produces aggregate statistics for each
/// question. It accepts response exports in multiple formats (JSON, CSV,
/// Excel). For more information about the file formats, read the
/// documentation of the survey_logic crate.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The configuration file describing the survey and the
    /// response sources.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) An existing summary file to check the tabulated statistics
    /// against. The program fails if the output differs from this reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) The path to write the output to. If not specified, the
    /// output is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// Produce the list of usable response coordinates instead of the
    /// statistics summary.
    #[clap(long, takes_value = false)]
    pub heatmap: bool,

    /// (file path) A script of answers to walk through the questionnaire
    /// with. Prints the sequence of visited questions and the assembled
    /// response instead of the statistics summary.
    #[clap(long, value_parser)]
    pub walk: Option<String>,

    /// (question id) Only tabulate the responses that gave a specific answer
    /// to this question. Requires --filter-answer.
    #[clap(long, value_parser)]
    pub filter_question: Option<u64>,

    /// (text) The answer that the filtered responses must contain. Requires
    /// --filter-question.
    #[clap(long, value_parser)]
    pub filter_answer: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
