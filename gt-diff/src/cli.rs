use clap::{ArgAction, Parser};
use config::ArgCheck;

use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gt-diff")]
#[command(about = "Tests two replicate groups for differential G-tailing per transcript")]
#[command(version = config::VERSION)]
pub struct DiffArgs {
    #[arg(
        short = 'a',
        long = "group-a",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Snapshot files of the first (reference) group"
    )]
    pub group_a: Vec<PathBuf>,

    #[arg(
        short = 'b',
        long = "group-b",
        required = true,
        value_name = "PATHS",
        value_delimiter = ',',
        num_args = 1..,
        help = "Snapshot files of the second (test) group"
    )]
    pub group_b: Vec<PathBuf>,

    #[arg(
        long = "name-a",
        value_name = "NAME",
        default_value = "A",
        help = "Label of the first group"
    )]
    pub name_a: String,

    #[arg(
        long = "name-b",
        value_name = "NAME",
        default_value = "B",
        help = "Label of the second group"
    )]
    pub name_b: String,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "DIR",
        default_value = ".",
        help = "Output directory for the result table"
    )]
    pub outdir: PathBuf,

    #[arg(
        long = "min-size",
        value_name = "COUNT",
        default_value_t = config::MIN_TEST_SIZE,
        help = "Rank test floor: samples of at most this size skip the test"
    )]
    pub min_size: usize,

    #[arg(
        long = "penalty",
        value_name = "LOGLIK",
        default_value_t = config::RANGE_PENALTY,
        help = "Per-observation log-likelihood of out-of-range anchors"
    )]
    pub penalty: f64,

    #[arg(
        long = "alpha",
        value_name = "LEVEL",
        default_value_t = config::ALPHA,
        help = "Significance level used for the end-of-run summary"
    )]
    pub alpha: f64,

    #[arg(
        long = "fit-lognormal",
        required = false,
        value_name = "FLAG",
        help = "Refit the fragment-size model with a log-normal moment fit",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub fit_lognormal: bool,

    #[arg(
        long = "lrt",
        required = false,
        value_name = "FLAG",
        help = "Run the likelihood-ratio companion test",
        default_missing_value("true"),
        default_value("true"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub lrt: bool,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl ArgCheck for DiffArgs {
    fn get_inputs(&self) -> Vec<(&PathBuf, &str)> {
        self.group_a
            .iter()
            .chain(self.group_b.iter())
            .map(|path| (path, "json"))
            .collect()
    }
}
