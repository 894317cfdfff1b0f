/// Sentence spans over a transcript, as character offsets.
///
/// A sentence runs through its terminator(s) and any following whitespace,
/// so consecutive spans tile the text exactly: no gaps, no overlaps, first
/// starts at 0, last ends at the character length. Text with no terminator
/// at all is one sentence.
pub(crate) fn sentence_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let n = chars.len();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < n {
        if matches!(chars[i], '.' | '!' | '?') {
            let mut j = i + 1;
            while j < n && matches!(chars[j], '.' | '!' | '?') {
                j += 1;
            }
            while j < n && chars[j].is_whitespace() {
                j += 1;
            }
            spans.push((start, j));
            start = j;
            i = j;
        } else {
            i += 1;
        }
    }

    if start < n {
        spans.push((start, n));
    }

    spans
}

/// Group consecutive sentence spans into chunk spans of `per_chunk`
/// sentences (the tail keeps whatever is left).
pub(crate) fn group_spans(sentences: &[(usize, usize)], per_chunk: usize) -> Vec<(usize, usize)> {
    sentences
        .chunks(per_chunk.max(1))
        .map(|group| (group[0].0, group[group.len() - 1].1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn two_sentences_tile_the_text() {
        let text = chars("Hello world. This is a test.");
        let spans = sentence_spans(&text);
        assert_eq!(spans, vec![(0, 13), (13, 28)]);
    }

    #[test]
    fn no_terminator_is_one_sentence() {
        let text = chars("no punctuation here");
        assert_eq!(sentence_spans(&text), vec![(0, 19)]);
    }

    #[test]
    fn repeated_terminators_stay_with_their_sentence() {
        let text = chars("Really?! Yes. Ok");
        let spans = sentence_spans(&text);
        assert_eq!(spans, vec![(0, 9), (9, 14), (14, 16)]);
    }

    #[test]
    fn spans_always_cover_without_gaps() {
        for text in [
            "One. Two. Three. Four. Five.",
            "Trailing space. ",
            "a.b.c",
            "?!",
        ] {
            let cs = chars(text);
            let spans = sentence_spans(&cs);
            assert_eq!(spans[0].0, 0);
            assert_eq!(spans[spans.len() - 1].1, cs.len());
            for pair in spans.windows(2) {
                assert_eq!(pair[0].1, pair[1].0, "gap/overlap in {text:?}");
            }
        }
    }

    #[test]
    fn grouping_merges_consecutive_sentences() {
        let sentences = vec![(0, 5), (5, 11), (11, 18), (18, 24), (24, 30)];
        assert_eq!(group_spans(&sentences, 2), vec![(0, 11), (11, 24), (24, 30)]);
        assert_eq!(group_spans(&sentences, 1), sentences);
        assert_eq!(group_spans(&sentences, 10), vec![(0, 30)]);
    }
}
