use clap::Parser;
use config::ArgCheck;

use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gt-scan")]
#[command(about = "Aggregates G-tail and NVTR libraries of one replicate into a snapshot")]
#[command(version = config::VERSION)]
pub struct ScanArgs {
    #[arg(
        short = 'g',
        long = "gtail",
        required = true,
        value_name = "PATH",
        help = "Path to the name-sorted G-tail library BAM"
    )]
    pub gtail: PathBuf,

    #[arg(
        short = 'n',
        long = "nvtr",
        required = true,
        value_name = "PATH",
        help = "Path to the name-sorted NVTR library BAM"
    )]
    pub nvtr: PathBuf,

    #[arg(
        long = "name",
        required = true,
        value_name = "NAME",
        help = "Replicate name recorded in the snapshot"
    )]
    pub name: String,

    #[arg(
        short = 'o',
        long = "outdir",
        value_name = "DIR",
        default_value = ".",
        help = "Output directory for the snapshot"
    )]
    pub outdir: PathBuf,

    #[arg(
        long = "window",
        value_name = "BASES",
        default_value_t = config::SIGNATURE_WINDOW,
        help = "Signature window length inspected at the read end"
    )]
    pub window: usize,

    #[arg(
        long = "min-tag",
        value_name = "BASES",
        default_value_t = config::MIN_TAG_LENGTH,
        help = "Minimum G (or C) run length inside the window"
    )]
    pub min_tag: usize,

    #[arg(
        long = "max-ambiguous",
        value_name = "BASES",
        default_value_t = config::MAX_AMBIGUOUS,
        help = "Maximum N bases tolerated in the signature window"
    )]
    pub max_ambiguous: usize,

    #[arg(
        long = "tolerance",
        value_name = "MISMATCHES",
        default_value_t = config::TAIL_TOLERANCE,
        help = "Error tolerance of the tail-run scan"
    )]
    pub tolerance: u32,

    #[arg(
        long = "min-mapq",
        value_name = "QUAL",
        default_value_t = config::MIN_MAPQ,
        help = "Minimum mapping quality of accepted anchors"
    )]
    pub min_mapq: u8,

    #[arg(
        long = "allowlist",
        required = false,
        value_name = "PATH",
        help = "Optional file of transcript ids to keep, one per line"
    )]
    pub allowlist: Option<PathBuf>,
}

impl ArgCheck for ScanArgs {
    fn get_inputs(&self) -> Vec<(&PathBuf, &str)> {
        vec![(&self.gtail, "bam"), (&self.nvtr, "bam")]
    }

    fn get_allowlist(&self) -> Vec<&PathBuf> {
        self.allowlist.iter().collect()
    }
}
