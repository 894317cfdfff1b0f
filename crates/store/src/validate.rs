use murmur_job_interface::{ChunkDraft, EMBEDDING_DIM};

use crate::Error;

/// What every committed chunk set must satisfy: dense 0-based indexes, char
/// ranges that tile the transcript exactly, monotone non-decreasing times,
/// confidences in [0, 1]. An empty set is always valid (a zero-length
/// transcript has no chunks).
pub(crate) fn validate_chunk_set(transcript: &str, drafts: &[ChunkDraft]) -> Result<(), Error> {
    let total_chars = transcript.chars().count();

    for (k, draft) in drafts.iter().enumerate() {
        if draft.chunk_index != k as i32 {
            return Err(Error::InvariantViolation(format!(
                "chunk_index {} at position {k} is not dense",
                draft.chunk_index
            )));
        }
        if draft.start_char_pos >= draft.end_char_pos {
            return Err(Error::InvariantViolation(format!(
                "chunk {k} has an empty char span"
            )));
        }
        if draft.end_char_pos > total_chars {
            return Err(Error::InvariantViolation(format!(
                "chunk {k} ends past the transcript ({} > {total_chars})",
                draft.end_char_pos
            )));
        }
        let expected_start = if k == 0 { 0 } else { drafts[k - 1].end_char_pos };
        if draft.start_char_pos != expected_start {
            return Err(Error::InvariantViolation(format!(
                "chunk {k} starts at {} instead of {expected_start}",
                draft.start_char_pos
            )));
        }
        if !(draft.start_time >= 0.0 && draft.start_time <= draft.end_time) {
            return Err(Error::InvariantViolation(format!(
                "chunk {k} has times {}..{}",
                draft.start_time, draft.end_time
            )));
        }
        if k > 0
            && (draft.start_time < drafts[k - 1].start_time
                || draft.end_time < drafts[k - 1].end_time)
        {
            return Err(Error::InvariantViolation(format!(
                "chunk {k} times run backwards"
            )));
        }
        if !(0.0..=1.0).contains(&draft.confidence) {
            return Err(Error::InvariantViolation(format!(
                "chunk {k} confidence {} out of range",
                draft.confidence
            )));
        }
    }

    if let Some(last) = drafts.last() {
        if last.end_char_pos != total_chars {
            return Err(Error::InvariantViolation(format!(
                "chunks cover {} of {total_chars} chars",
                last.end_char_pos
            )));
        }
    }

    Ok(())
}

/// Stored vectors are 384-dim and unit-length to within 1e-3.
pub(crate) fn validate_embedding(vec: &[f32]) -> Result<(), Error> {
    if vec.len() != EMBEDDING_DIM {
        return Err(Error::InvariantViolation(format!(
            "embedding has {} dims, expected {EMBEDDING_DIM}",
            vec.len()
        )));
    }
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if (norm - 1.0).abs() >= 1e-3 {
        return Err(Error::InvariantViolation(format!(
            "embedding norm {norm} is not unit"
        )));
    }
    Ok(())
}
