//! Tail-signature classification of single reads
//!
//! A read that failed to align in the G-tail library is a candidate
//! carrier of the non-templated tail. The classifier inspects a fixed
//! window at the relevant end of the read and decides whether it
//! carries a forward signature (polyA then G-run, read-through into
//! the tail), a reverse signature (the complement seen from the other
//! mate orientation), or nothing.

/// Orientation of a detected tail signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tail {
    Forward,
    Reverse,
}

/// Window-anchored signature matcher
///
/// * `window` - number of bases inspected at the read end
/// * `min_tag` - minimum length of the G (or C) run inside the window
/// * `max_ambiguous` - maximum count of N bases tolerated in the window
#[derive(Debug, Clone, Copy)]
pub struct ReadClassifier {
    window: usize,
    min_tag: usize,
    max_ambiguous: usize,
}

impl ReadClassifier {
    pub fn new(window: usize, min_tag: usize, max_ambiguous: usize) -> Self {
        Self {
            window,
            min_tag,
            max_ambiguous,
        }
    }

    /// Classifies a read sequence; returns None when no signature is found
    ///
    /// The forward window must consist of zero-or-more A/N followed by at
    /// least `min_tag` G/N anchored at the window end; the reverse window
    /// of at least `min_tag` C/N followed by zero-or-more T/N anchored at
    /// the window start. N is a wildcard for the pattern, but the window
    /// is rejected outright when it holds more than `max_ambiguous` Ns.
    /// The two patterns attach to opposite read ends; a read whose head
    /// and tail windows both match is classified Forward, in check order.
    pub fn classify(&self, seq: &[u8]) -> Option<Tail> {
        if seq.len() < self.window {
            return None;
        }

        let head = &seq[..self.window];
        let tail = &seq[seq.len() - self.window..];

        if self.matches_forward(tail) && !self.too_ambiguous(tail) {
            return Some(Tail::Forward);
        }

        if self.matches_reverse(head) && !self.too_ambiguous(head) {
            return Some(Tail::Reverse);
        }

        None
    }

    /// window == [AN]* then >= min_tag of [GN], anchored at the end
    fn matches_forward(&self, window: &[u8]) -> bool {
        let run = window
            .iter()
            .rev()
            .take_while(|&&b| matches!(b, b'G' | b'N'))
            .count();

        if run < self.min_tag {
            return false;
        }

        window[..window.len() - run]
            .iter()
            .all(|&b| matches!(b, b'A' | b'N'))
    }

    /// window == >= min_tag of [CN] then [TN]*, anchored at the start
    fn matches_reverse(&self, window: &[u8]) -> bool {
        let run = window
            .iter()
            .take_while(|&&b| matches!(b, b'C' | b'N'))
            .count();

        if run < self.min_tag {
            return false;
        }

        window[run..].iter().all(|&b| matches!(b, b'T' | b'N'))
    }

    /// mandatory second pass: the pattern treats N as a wildcard, but a
    /// window drowning in Ns is unusable evidence either way
    fn too_ambiguous(&self, window: &[u8]) -> bool {
        window.iter().filter(|&&b| b == b'N').count() > self.max_ambiguous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_forward() {
        let classifier = ReadClassifier::new(14, 3, 0);
        let seq = b"TGCATGCATGCATGCAAAAAAGGGGGGGGGG";

        assert_eq!(classifier.classify(seq), Some(Tail::Forward));
    }

    #[test]
    fn test_classify_reverse() {
        let classifier = ReadClassifier::new(14, 3, 0);
        let seq = b"CCCCCCCCCCTTTTTTGCATGCATGCATGCA";

        assert_eq!(classifier.classify(seq), Some(Tail::Reverse));
    }

    #[test]
    fn test_classify_rejects_short_tag() {
        let classifier = ReadClassifier::new(14, 3, 0);
        let seq = b"TGCATGCATGCATGCAAAAAAAAAAAAAAGG";

        assert_eq!(classifier.classify(seq), None);
    }

    #[test]
    fn test_classify_rejects_non_tail_window() {
        let classifier = ReadClassifier::new(14, 3, 0);
        // G-run long enough, but the window prefix is not all A/N
        let seq = b"TGCATGCATGCATGCAAAAATGGGGGGGGGG";

        assert_eq!(classifier.classify(seq), None);
    }

    #[test]
    fn test_classify_n_is_wildcard_within_allowance() {
        let classifier = ReadClassifier::new(14, 3, 2);
        let seq = b"TGCATGCATGCATGCAAANAAGGGGNGGGGG";

        assert_eq!(classifier.classify(seq), Some(Tail::Forward));
    }

    #[test]
    fn test_classify_rejects_excess_ambiguity() {
        let classifier = ReadClassifier::new(14, 3, 0);
        // matches the forward pattern, but carries one N over the allowance
        let seq = b"TGCATGCATGCATGCAAAAANGGGGGGGGGG";

        assert_eq!(classifier.classify(seq), None);
    }

    #[test]
    fn test_classify_is_exclusive_and_idempotent() {
        let classifier = ReadClassifier::new(14, 3, 1);

        for seq in [
            b"TGCATGCATGCATGCAAAAAAGGGGGGGGGG".as_slice(),
            b"CCCCCCCCCCTTTTTTGCATGCATGCATGCA".as_slice(),
            b"ACGTACGTACGTACGTACGTACGTACGTACG".as_slice(),
            b"AAAA".as_slice(),
        ] {
            let first = classifier.classify(seq);
            let second = classifier.classify(seq);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_classify_prefers_forward_when_both_ends_match() {
        let classifier = ReadClassifier::new(14, 3, 0);
        // reverse-shaped head and forward-shaped tail on one read
        let seq = b"CCCCTTTTTTTTTTAAAAAAAAAAGGGG";

        assert_eq!(classifier.classify(seq), Some(Tail::Forward));
    }

    #[test]
    fn test_classify_too_short_is_none() {
        let classifier = ReadClassifier::new(14, 3, 0);
        assert_eq!(classifier.classify(b"GGGGGG"), None);
    }
}
