use murmur_job_interface::Segment;

/// Locate each segment's text inside the transcript, as char offsets.
///
/// Whisper-style transcripts are the segment texts joined together, so a
/// forward scan with a moving cursor resolves them in one pass. A segment
/// whose text cannot be found (or is blank) gets an empty range at the
/// cursor, which never overlaps any chunk span.
pub(crate) fn segment_char_ranges(transcript: &[char], segments: &[Segment]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::with_capacity(segments.len());
    let mut cursor = 0;

    for segment in segments {
        let needle: Vec<char> = segment.text.trim().chars().collect();
        if needle.is_empty() {
            ranges.push((cursor, cursor));
            continue;
        }
        match find_chars(transcript, &needle, cursor) {
            Some(pos) => {
                ranges.push((pos, pos + needle.len()));
                cursor = pos + needle.len();
            }
            None => ranges.push((cursor, cursor)),
        }
    }

    ranges
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Map a chunk's char span onto audio time: the start of the earliest
/// overlapping segment and the end of the latest one. `None` when no
/// segment overlaps the span; the caller inherits the previous chunk's end.
pub(crate) fn span_times(
    span: (usize, usize),
    ranges: &[(usize, usize)],
    segments: &[Segment],
) -> Option<(f64, f64)> {
    let (a, b) = span;
    let mut times: Option<(f64, f64)> = None;

    for (range, segment) in ranges.iter().zip(segments) {
        if range.0 < b && range.1 > a {
            times = Some(match times {
                None => (segment.start, segment.end),
                Some((start, end)) => (start.min(segment.start), end.max(segment.end)),
            });
        }
    }

    times
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn resolves_segments_left_to_right() {
        let transcript: Vec<char> = "Hello world. This is a test.".chars().collect();
        let segments = vec![seg(0.0, 1.0, "Hello world."), seg(1.0, 2.5, "This is a test.")];
        let ranges = segment_char_ranges(&transcript, &segments);
        assert_eq!(ranges, vec![(0, 12), (13, 28)]);
    }

    #[test]
    fn repeated_text_binds_to_the_next_occurrence() {
        let transcript: Vec<char> = "yes. yes. yes.".chars().collect();
        let segments = vec![seg(0.0, 1.0, "yes."), seg(1.0, 2.0, "yes."), seg(2.0, 3.0, "yes.")];
        let ranges = segment_char_ranges(&transcript, &segments);
        assert_eq!(ranges, vec![(0, 4), (5, 9), (10, 14)]);
    }

    #[test]
    fn span_takes_earliest_start_and_latest_end() {
        let transcript: Vec<char> = "Hello world. This is a test.".chars().collect();
        let segments = vec![seg(0.0, 1.0, "Hello world."), seg(1.0, 2.5, "This is a test.")];
        let ranges = segment_char_ranges(&transcript, &segments);

        assert_eq!(span_times((0, 13), &ranges, &segments), Some((0.0, 1.0)));
        assert_eq!(span_times((13, 28), &ranges, &segments), Some((1.0, 2.5)));
        assert_eq!(span_times((0, 28), &ranges, &segments), Some((0.0, 2.5)));
    }

    #[test]
    fn span_with_no_overlap_yields_none() {
        let transcript: Vec<char> = "abc xyz".chars().collect();
        let segments = vec![seg(0.0, 1.0, "nowhere")];
        let ranges = segment_char_ranges(&transcript, &segments);
        assert_eq!(span_times((0, 7), &ranges, &segments), None);
    }
}
