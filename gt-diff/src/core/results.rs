//! Fixed-schema result table
//!
//! One row per transcript of the shared transcriptome, one column per
//! member of a closed enum. The schema is validated by the type
//! system: there is no string-keyed lookup to reject at call time.
//! Missing cells hold NaN and export as a literal NA token; a cell is
//! written at most once.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Per-transcript numeric columns, in export order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    MeanA,
    MeanB,
    MeanDiff,
    RankStatistic,
    PValue,
    CorrectedPValue,
    LrtStatistic,
    LrtPValue,
    ThetaDiff,
    TailCountA,
    TailCountB,
    BackgroundCountA,
    BackgroundCountB,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::MeanA,
        Column::MeanB,
        Column::MeanDiff,
        Column::RankStatistic,
        Column::PValue,
        Column::CorrectedPValue,
        Column::LrtStatistic,
        Column::LrtPValue,
        Column::ThetaDiff,
        Column::TailCountA,
        Column::TailCountB,
        Column::BackgroundCountA,
        Column::BackgroundCountB,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::MeanA => "mean_a",
            Column::MeanB => "mean_b",
            Column::MeanDiff => "mean_diff",
            Column::RankStatistic => "rank_statistic",
            Column::PValue => "p_value",
            Column::CorrectedPValue => "corrected_p_value",
            Column::LrtStatistic => "lrt_statistic",
            Column::LrtPValue => "lrt_p_value",
            Column::ThetaDiff => "theta_diff",
            Column::TailCountA => "tail_count_a",
            Column::TailCountB => "tail_count_b",
            Column::BackgroundCountA => "background_count_a",
            Column::BackgroundCountB => "background_count_b",
        }
    }

    fn index(&self) -> usize {
        Column::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }
}

/// Run-level provenance exported alongside the table
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub group_a: String,
    pub group_b: String,
    pub files_a: Vec<String>,
    pub files_b: Vec<String>,
}

pub struct ResultStore {
    transcripts: Vec<String>,
    cells: Vec<[f64; Column::ALL.len()]>,
    global_statistic: f64,
    global_p_value: f64,
    global_mean_diff: f64,
    provenance: Provenance,
}

impl ResultStore {
    pub fn new(transcripts: Vec<String>, provenance: Provenance) -> Self {
        let rows = transcripts.len();

        Self {
            transcripts,
            cells: vec![[f64::NAN; Column::ALL.len()]; rows],
            global_statistic: f64::NAN,
            global_p_value: f64::NAN,
            global_mean_diff: f64::NAN,
            provenance,
        }
    }

    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    pub fn transcripts(&self) -> &[String] {
        &self.transcripts
    }

    /// Write-once per cell; a later pass never overwrites a value
    pub fn set(&mut self, row: usize, column: Column, value: f64) {
        let cell = &mut self.cells[row][column.index()];
        debug_assert!(cell.is_nan(), "result cell written twice");

        *cell = value;
    }

    pub fn get(&self, row: usize, column: Column) -> f64 {
        self.cells[row][column.index()]
    }

    pub fn set_global(&mut self, statistic: f64, p_value: f64, mean_diff: f64) {
        self.global_statistic = statistic;
        self.global_p_value = p_value;
        self.global_mean_diff = mean_diff;
    }

    pub fn global(&self) -> (f64, f64, f64) {
        (
            self.global_statistic,
            self.global_p_value,
            self.global_mean_diff,
        )
    }

    /// Bonferroni pass: every recorded rank p-value multiplied by the
    /// total row count (missing rows included), clamped to 1.0
    pub fn correct_rank_p(&mut self) {
        let multiplier = self.transcripts.len() as f64;

        for row in 0..self.cells.len() {
            let p = self.get(row, Column::PValue);
            if !p.is_nan() {
                self.set(row, Column::CorrectedPValue, (p * multiplier).min(1.0));
            }
        }
    }

    /// Rows whose corrected rank p-value clears the level
    pub fn significant(&self, alpha: f64) -> usize {
        (0..self.cells.len())
            .filter(|&row| self.get(row, Column::CorrectedPValue) < alpha)
            .count()
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);

        self.write_tsv(&mut writer)?;
        writer.flush()?;

        log::info!("Results written to {}", path.as_ref().display());

        Ok(())
    }

    /// TSV with provenance and global scalars as leading comments
    pub fn write_tsv<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        writeln!(
            writer,
            "# groups: \"{}\" vs \"{}\"",
            self.provenance.group_a, self.provenance.group_b
        )?;
        writeln!(writer, "# files_a: {}", self.provenance.files_a.join(","))?;
        writeln!(writer, "# files_b: {}", self.provenance.files_b.join(","))?;
        writeln!(
            writer,
            "# global: statistic={} p_value={} mean_diff={}",
            format_cell(self.global_statistic),
            format_cell(self.global_p_value),
            format_cell(self.global_mean_diff)
        )?;

        write!(writer, "transcript")?;
        for column in Column::ALL {
            write!(writer, "\t{}", column.as_str())?;
        }
        writeln!(writer)?;

        for (transcript, row) in self.transcripts.iter().zip(self.cells.iter()) {
            write!(writer, "\"{}\"", transcript)?;
            for value in row {
                write!(writer, "\t{}", format_cell(*value))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        config::NA.to_string()
    } else {
        format!("{}", value)
    }
}
