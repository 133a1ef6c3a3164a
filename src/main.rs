use log::{debug, info};

use clap::Parser;
use snafu::{prelude::*, ErrorCompat};
use std::fs;

use survey_logic::ResponseFilter;

mod args;
mod tally;

use crate::args::Args;
use crate::tally::{
    run_heatmap_export, run_report, run_walkthrough, ParsingJsonSnafu, TallyResult,
    WritingOutputSnafu,
};

fn build_filter(args: &Args) -> TallyResult<Option<ResponseFilter>> {
    match (&args.filter_question, &args.filter_answer) {
        (None, None) => Ok(None),
        (Some(question_id), Some(answer)) => Ok(Some(ResponseFilter {
            question_id: *question_id,
            answer: answer.clone(),
        })),
        _ => {
            whatever!("--filter-question and --filter-answer must be used together")
        }
    }
}

fn run(args: &Args) -> TallyResult<String> {
    let filter = build_filter(args)?;
    let result_js = if let Some(script_path) = &args.walk {
        run_walkthrough(args.config.clone(), script_path.clone())?
    } else if args.heatmap {
        run_heatmap_export(args.config.clone(), filter)?
    } else {
        run_report(args.config.clone(), filter, args.reference.clone())?
    };
    serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})
}

fn main() {
    let args = Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
    debug!("arguments: {:?}", args);

    let res = run(&args).and_then(|pretty| match &args.out {
        Some(out_path) if out_path != "stdout" => {
            info!("Writing summary to {}", out_path);
            fs::write(out_path, pretty).context(WritingOutputSnafu { path: out_path.clone() })
        }
        _ => {
            println!("{}", pretty);
            Ok(())
        }
    });

    if let Err(e) = res {
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
