use murmur_job_interface::Segment;

/// Standard SubRip: 1-based sequence number, `HH:MM:SS,mmm` timecodes, the
/// segment text, a blank line. UTF-8, no BOM.
pub fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');
        out.push_str(&timecode(segment.start));
        out.push_str(" --> ");
        out.push_str(&timecode(segment.end));
        out.push('\n');
        out.push_str(segment.text.trim());
        out.push_str("\n\n");
    }
    out
}

fn timecode(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let s = (total_ms / 1_000) % 60;
    let m = (total_ms / 60_000) % 60;
    let h = total_ms / 3_600_000;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
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
    fn renders_the_subrip_shape_exactly() {
        let srt = render_srt(&[
            seg(0.0, 1.0, "Hello world."),
            seg(1.0, 2.5, "This is a test."),
        ]);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,000\nHello world.\n\n\
             2\n00:00:01,000 --> 00:00:02,500\nThis is a test.\n\n"
        );
    }

    #[test]
    fn timecodes_roll_over_minutes_and_hours() {
        assert_eq!(timecode(0.0), "00:00:00,000");
        assert_eq!(timecode(59.999), "00:00:59,999");
        assert_eq!(timecode(61.5), "00:01:01,500");
        assert_eq!(timecode(3_723.042), "01:02:03,042");
    }

    #[test]
    fn whisper_style_leading_spaces_are_trimmed() {
        let srt = render_srt(&[seg(0.0, 1.0, " leading space")]);
        assert!(srt.contains("\nleading space\n"));
    }

    #[test]
    fn no_segments_renders_empty() {
        assert_eq!(render_srt(&[]), "");
    }
}
