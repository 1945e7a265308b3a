//! Fragment aggregation over a name-synchronized mate stream
//!
//! The aggregator consumes a name-sorted BAM stream, pairs consecutive
//! records by read name and pushes each pair through an explicit
//! filter cascade. Every exclusion carries its own skip reason so the
//! end-of-pass summary can say exactly where the library went; the one
//! structural violation (a record without the paired flag inside a
//! paired stream) is fatal because it means the input itself is
//! corrupt, not that the fragment is biologically excludable.

use hashbrown::HashSet;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::RecordBuf;
use thiserror::Error;

use std::path::PathBuf;

use config::snapshot::{
    AnchorCounts, BackgroundChannel, MapqHistogram, TailChannel, TailRunHistograms,
};

use crate::core::classify::ReadClassifier;
use crate::core::tail::TailRunMeasurer;

/// Which alignment pattern the aggregator expects from its stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// G-tail library: one aligned anchor, one unaligned tail carrier
    Tail,
    /// NVTR library: both mates aligned as a proper pair
    Background,
}

/// Structural failures that abort the whole pass
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("record {0} lacks the paired flag; the stream is corrupt")]
    UnpairedRecord(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-pair exclusion reasons, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingMate,
    ImproperPair,
    PatternMismatch,
    ReferenceMismatch,
    NotInAllowList,
    LowMapq,
    NoSignature,
}

impl SkipReason {
    pub const ALL: [SkipReason; 7] = [
        SkipReason::MissingMate,
        SkipReason::ImproperPair,
        SkipReason::PatternMismatch,
        SkipReason::ReferenceMismatch,
        SkipReason::NotInAllowList,
        SkipReason::LowMapq,
        SkipReason::NoSignature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingMate => "missing mate",
            SkipReason::ImproperPair => "improper pair",
            SkipReason::PatternMismatch => "alignment pattern mismatch",
            SkipReason::ReferenceMismatch => "reference mismatch between mates",
            SkipReason::NotInAllowList => "not in allow-list",
            SkipReason::LowMapq => "mapping quality below threshold",
            SkipReason::NoSignature => "no tail signature",
        }
    }
}

/// What an accepted pair contributes to the aggregates
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Fragment {
        transcript: String,
        start: u64,
        size: u64,
    },
    TailHit {
        transcript: String,
        anchor: u64,
        run: u32,
    },
}

/// Outcome of the filter cascade for one mate pair
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept(Observation),
    Skip(SkipReason),
}

/// Accumulates per-transcript aggregates for one channel of one replicate
///
/// All accumulation is additive, so the aggregates are independent of
/// input order; only the diagnostic counters carry no such guarantee
/// requirement (they are additive too, as it happens).
pub struct FragmentAggregator {
    channel: Channel,
    classifier: ReadClassifier,
    measurer: TailRunMeasurer,
    min_mapq: u8,
    allowlist: Option<HashSet<String>>,
    anchor_counts: AnchorCounts,
    tail_run_histograms: TailRunHistograms,
    fragment_size_histogram: hashbrown::HashMap<u64, u64>,
    mapq_histogram: MapqHistogram,
    skips: [u64; SkipReason::ALL.len()],
    accepted: u64,
}

impl FragmentAggregator {
    pub fn new(
        channel: Channel,
        classifier: ReadClassifier,
        measurer: TailRunMeasurer,
        min_mapq: u8,
        allowlist: Option<HashSet<String>>,
    ) -> Self {
        Self {
            channel,
            classifier,
            measurer,
            min_mapq,
            allowlist,
            anchor_counts: AnchorCounts::default(),
            tail_run_histograms: TailRunHistograms::default(),
            fragment_size_histogram: hashbrown::HashMap::new(),
            mapq_histogram: MapqHistogram::default(),
            skips: [0; SkipReason::ALL.len()],
            accepted: 0,
        }
    }

    /// Consumes a name-sorted record stream, pairing consecutive records
    /// by name; `reference_names` maps reference ids to transcript ids
    pub fn consume<I>(&mut self, records: I, reference_names: &[String]) -> Result<(), ScanError>
    where
        I: IntoIterator<Item = std::io::Result<RecordBuf>>,
    {
        let mut pending: Option<(String, RecordBuf)> = None;

        for result in records {
            let record = result?;
            let flags = record.flags();

            if flags.is_secondary() || flags.is_supplementary() {
                continue;
            }

            let name = record.name().map(|n| n.to_string()).unwrap_or_default();

            match pending.take() {
                Some((mate_name, mate)) if mate_name == name => {
                    match self.classify_pair(&mate, &record, reference_names)? {
                        Verdict::Accept(obs) => self.record(obs),
                        Verdict::Skip(reason) => self.skip(reason),
                    }
                }
                Some((mate_name, _)) => {
                    log::debug!("read {} has no mate in the stream", mate_name);
                    self.skip(SkipReason::MissingMate);
                    pending = Some((name, record));
                }
                None => {
                    pending = Some((name, record));
                }
            }
        }

        if let Some((name, _)) = pending {
            log::debug!("read {} has no mate in the stream", name);
            self.skip(SkipReason::MissingMate);
        }

        Ok(())
    }

    /// The filter cascade for one mate pair, in fixed order
    pub fn classify_pair(
        &mut self,
        a: &RecordBuf,
        b: &RecordBuf,
        reference_names: &[String],
    ) -> Result<Verdict, ScanError> {
        for record in [a, b] {
            if !record.flags().is_segmented() {
                let name = record.name().map(|n| n.to_string()).unwrap_or_default();
                return Err(ScanError::UnpairedRecord(name));
            }
        }

        // one first segment, one last segment, or the pair is malformed
        if a.flags().is_first_segment() == b.flags().is_first_segment() {
            return Ok(Verdict::Skip(SkipReason::ImproperPair));
        }

        let (anchor, carrier) = match self.channel {
            Channel::Background => {
                let aligned = !a.flags().is_unmapped() && !b.flags().is_unmapped();
                let proper = a.flags().contains(Flags::PROPERLY_SEGMENTED)
                    && b.flags().contains(Flags::PROPERLY_SEGMENTED);

                if !aligned || !proper {
                    return Ok(Verdict::Skip(SkipReason::PatternMismatch));
                }

                if a.reference_sequence_id() != b.reference_sequence_id() {
                    return Ok(Verdict::Skip(SkipReason::ReferenceMismatch));
                }

                (a, b)
            }
            Channel::Tail => match (a.flags().is_unmapped(), b.flags().is_unmapped()) {
                (false, true) => (a, b),
                (true, false) => (b, a),
                _ => return Ok(Verdict::Skip(SkipReason::PatternMismatch)),
            },
        };

        let transcript = match anchor
            .reference_sequence_id()
            .and_then(|id| reference_names.get(id))
        {
            Some(name) => name.clone(),
            None => return Ok(Verdict::Skip(SkipReason::ReferenceMismatch)),
        };

        if let Some(list) = &self.allowlist {
            if !list.contains(&transcript) {
                return Ok(Verdict::Skip(SkipReason::NotInAllowList));
            }
        }

        // both qualities go to the histogram whether or not the pair
        // survives the threshold
        let quality = |record: &RecordBuf| record.mapping_quality().map(|q| q.get()).unwrap_or(0);
        let (anchor_mapq, carrier_mapq) = (quality(anchor), quality(carrier));

        *self.mapq_histogram.entry(anchor_mapq).or_insert(0) += 1;
        *self.mapq_histogram.entry(carrier_mapq).or_insert(0) += 1;

        let passes = match self.channel {
            Channel::Background => anchor_mapq >= self.min_mapq && carrier_mapq >= self.min_mapq,
            Channel::Tail => anchor_mapq >= self.min_mapq,
        };

        if !passes {
            return Ok(Verdict::Skip(SkipReason::LowMapq));
        }

        match self.channel {
            Channel::Background => {
                let (Some(span_a), Some(span_b)) = (alignment_span(a), alignment_span(b)) else {
                    return Ok(Verdict::Skip(SkipReason::PatternMismatch));
                };

                let start = span_a.0.min(span_b.0);
                let end = span_a.1.max(span_b.1);

                Ok(Verdict::Accept(Observation::Fragment {
                    transcript,
                    start,
                    size: end - start + 1,
                }))
            }
            Channel::Tail => {
                let Some(span) = alignment_span(anchor) else {
                    return Ok(Verdict::Skip(SkipReason::PatternMismatch));
                };

                let sequence = carrier.sequence().as_ref();
                let Some(orientation) = self.classifier.classify(sequence) else {
                    return Ok(Verdict::Skip(SkipReason::NoSignature));
                };

                let run = self.measurer.measure(sequence, orientation);

                // anchor 5' coordinate localizes the tailed end
                let anchor_pos = if anchor.flags().is_reverse_complemented() {
                    span.1
                } else {
                    span.0
                };

                Ok(Verdict::Accept(Observation::TailHit {
                    transcript,
                    anchor: anchor_pos,
                    run,
                }))
            }
        }
    }

    fn record(&mut self, observation: Observation) {
        self.accepted += 1;

        match observation {
            Observation::Fragment {
                transcript,
                start,
                size,
            } => {
                *self
                    .anchor_counts
                    .entry(transcript)
                    .or_default()
                    .entry(start)
                    .or_insert(0) += 1;
                *self.fragment_size_histogram.entry(size).or_insert(0) += 1;
            }
            Observation::TailHit {
                transcript,
                anchor,
                run,
            } => {
                *self
                    .anchor_counts
                    .entry(transcript.clone())
                    .or_default()
                    .entry(anchor)
                    .or_insert(0) += 1;
                *self
                    .tail_run_histograms
                    .entry(transcript)
                    .or_default()
                    .entry(run)
                    .or_insert(0) += 1;
            }
        }
    }

    fn skip(&mut self, reason: SkipReason) {
        let slot = SkipReason::ALL
            .iter()
            .position(|r| *r == reason)
            .unwrap_or(0);
        self.skips[slot] += 1;
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn skipped(&self, reason: SkipReason) -> u64 {
        let slot = SkipReason::ALL
            .iter()
            .position(|r| *r == reason)
            .unwrap_or(0);
        self.skips[slot]
    }

    /// one line per skip reason, plus the accepted total
    pub fn log_summary(&self, label: &str) {
        for (reason, count) in SkipReason::ALL.iter().zip(self.skips.iter()) {
            if *count > 0 {
                log::info!("{}: skipped {} pairs [{}]", label, count, reason.as_str());
            }
        }

        log::info!("{}: accepted {} fragments", label, self.accepted);
    }

    /// Hands the aggregates over as the snapshot's G-tail section
    pub fn into_tail_channel(self, file: PathBuf) -> TailChannel {
        TailChannel {
            file,
            anchor_counts: self.anchor_counts,
            tail_run_histograms: self.tail_run_histograms,
            mapq_histogram: self.mapq_histogram,
        }
    }

    /// Hands the aggregates over as the snapshot's NVTR section
    pub fn into_background_channel(self, file: PathBuf) -> BackgroundChannel {
        BackgroundChannel {
            file,
            anchor_counts: self.anchor_counts,
            fragment_size_histogram: self.fragment_size_histogram,
            mapq_histogram: self.mapq_histogram,
        }
    }
}

/// 1-based inclusive alignment interval of a mapped record
fn alignment_span(record: &RecordBuf) -> Option<(u64, u64)> {
    let start = record.alignment_start()?.get() as u64;
    let end = record.alignment_end()?.get() as u64;

    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classify::Tail;

    use bstr::BString;
    use noodles::core::Position;
    use noodles::sam::alignment::record::cigar::op::{Kind, Op};
    use noodles::sam::alignment::record::MappingQuality;
    use noodles::sam::alignment::record_buf::{Cigar, Sequence};

    fn aggregator(channel: Channel) -> FragmentAggregator {
        FragmentAggregator::new(
            channel,
            ReadClassifier::new(14, 3, 0),
            TailRunMeasurer::new(0),
            13,
            None,
        )
    }

    fn mapped(
        name: &str,
        first: bool,
        ref_id: usize,
        start: usize,
        len: usize,
        mapq: u8,
    ) -> RecordBuf {
        let mut flags = Flags::SEGMENTED | Flags::PROPERLY_SEGMENTED;
        if first {
            flags |= Flags::FIRST_SEGMENT;
        } else {
            flags |= Flags::LAST_SEGMENT;
        }

        RecordBuf::builder()
            .set_name(BString::from(name))
            .set_flags(flags)
            .set_reference_sequence_id(ref_id)
            .set_alignment_start(Position::try_from(start).unwrap())
            .set_cigar(Cigar::from(vec![Op::new(Kind::Match, len)]))
            .set_mapping_quality(MappingQuality::new(mapq).unwrap())
            .set_sequence(Sequence::from(vec![b'A'; len]))
            .build()
    }

    fn unmapped(name: &str, first: bool, seq: &[u8]) -> RecordBuf {
        let mut flags = Flags::SEGMENTED | Flags::UNMAPPED;
        if first {
            flags |= Flags::FIRST_SEGMENT;
        } else {
            flags |= Flags::LAST_SEGMENT;
        }

        RecordBuf::builder()
            .set_name(BString::from(name))
            .set_flags(flags)
            .set_sequence(Sequence::from(seq.to_vec()))
            .build()
    }

    fn refs() -> Vec<String> {
        vec!["tx1".to_string(), "tx2".to_string()]
    }

    #[test]
    fn test_background_pair_records_fragment() {
        let mut agg = aggregator(Channel::Background);

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 60)),
            Ok(mapped("p1", false, 0, 301, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.accepted(), 1);
        assert_eq!(agg.anchor_counts["tx1"][&100], 1);
        // span: 100..=149 and 301..=350 -> fragment 100..=350
        assert_eq!(agg.fragment_size_histogram[&251], 1);
    }

    #[test]
    fn test_tail_pair_records_anchor_and_run() {
        let mut agg = aggregator(Channel::Tail);

        // forward signature; reversed remainder carries a clean A-run
        let carrier = b"TGCATGCATGCATGCTAAAAAAAAAAGGGG";
        let records = vec![
            Ok(mapped("p1", true, 1, 200, 40, 60)),
            Ok(unmapped("p1", false, carrier)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.accepted(), 1);
        assert_eq!(agg.anchor_counts["tx2"][&200], 1);

        let expected_run =
            TailRunMeasurer::new(0).measure(carrier, Tail::Forward);
        assert_eq!(agg.tail_run_histograms["tx2"][&expected_run], 1);
    }

    #[test]
    fn test_unpaired_flag_is_fatal() {
        let mut agg = aggregator(Channel::Background);

        let mut bad = mapped("p1", true, 0, 100, 50, 60);
        *bad.flags_mut() = Flags::empty();

        let records = vec![Ok(bad), Ok(mapped("p1", false, 0, 301, 50, 60))];
        let result = agg.consume(records, &refs());

        assert!(matches!(result, Err(ScanError::UnpairedRecord(_))));
    }

    #[test]
    fn test_same_segment_pair_is_improper() {
        let mut agg = aggregator(Channel::Background);

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 60)),
            Ok(mapped("p1", true, 0, 301, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.accepted(), 0);
        assert_eq!(agg.skipped(SkipReason::ImproperPair), 1);
    }

    #[test]
    fn test_both_mapped_is_pattern_mismatch_in_tail_channel() {
        let mut agg = aggregator(Channel::Tail);

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 60)),
            Ok(mapped("p1", false, 0, 301, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.skipped(SkipReason::PatternMismatch), 1);
    }

    #[test]
    fn test_reference_mismatch_between_mates() {
        let mut agg = aggregator(Channel::Background);

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 60)),
            Ok(mapped("p1", false, 1, 301, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.skipped(SkipReason::ReferenceMismatch), 1);
    }

    #[test]
    fn test_low_mapq_skipped_but_histogrammed() {
        let mut agg = aggregator(Channel::Background);

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 5)),
            Ok(mapped("p1", false, 0, 301, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.accepted(), 0);
        assert_eq!(agg.skipped(SkipReason::LowMapq), 1);
        // the diagnostic histogram still saw both mates
        assert_eq!(agg.mapq_histogram[&5], 1);
        assert_eq!(agg.mapq_histogram[&60], 1);
    }

    #[test]
    fn test_allowlist_excludes_other_references() {
        let mut list = HashSet::new();
        list.insert("tx2".to_string());

        let mut agg = FragmentAggregator::new(
            Channel::Background,
            ReadClassifier::new(14, 3, 0),
            TailRunMeasurer::new(0),
            13,
            Some(list),
        );

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 60)),
            Ok(mapped("p1", false, 0, 301, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.skipped(SkipReason::NotInAllowList), 1);
    }

    #[test]
    fn test_singletons_count_as_missing_mates() {
        let mut agg = aggregator(Channel::Background);

        let records = vec![
            Ok(mapped("p1", true, 0, 100, 50, 60)),
            Ok(mapped("p2", true, 0, 200, 50, 60)),
            Ok(mapped("p2", false, 0, 401, 50, 60)),
            Ok(mapped("p3", true, 0, 300, 50, 60)),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.accepted(), 1);
        assert_eq!(agg.skipped(SkipReason::MissingMate), 2);
    }

    #[test]
    fn test_no_signature_is_its_own_reason() {
        let mut agg = aggregator(Channel::Tail);

        let records = vec![
            Ok(mapped("p1", true, 0, 200, 40, 60)),
            Ok(unmapped("p1", false, b"ACGTACGTACGTACGTACGTACGTACGTAC")),
        ];
        agg.consume(records, &refs()).unwrap();

        assert_eq!(agg.skipped(SkipReason::NoSignature), 1);
    }
}
