//! Turns a transcript into ordered, gap-free semantic chunks.
//!
//! The primary strategy asks an LLM topic oracle to partition the transcript
//! into topic-coherent spans; its output is validated (coverage, ordering,
//! ranges) and minor gaps are repaired by extending the preceding span. When
//! the oracle is unreachable or keeps returning garbage, the chunker falls
//! back to plain sentence grouping so the pipeline always makes progress.

mod oracle;
mod sentence;
mod timing;

pub use oracle::{
    LlmTopicOracle, LlmTopicOracleBuilder, NoOracle, OracleError, SuggestedSpan, TopicOracle,
};

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use murmur_job_interface::{ChunkDraft, Segment};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChunkingStrategy {
    #[default]
    Semantic,
    Sentence,
}

#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub strategy: ChunkingStrategy,
    /// Fallback grouping size, in sentences.
    pub sentences_per_chunk: usize,
    /// Oracle retries after the first failed attempt, before falling back.
    pub oracle_retries: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Semantic,
            sentences_per_chunk: 3,
            oracle_retries: 2,
        }
    }
}

pub struct Chunker<O = NoOracle> {
    oracle: Option<O>,
    config: ChunkerConfig,
}

impl Chunker<NoOracle> {
    /// A chunker with no LLM collaborator; every transcript takes the
    /// sentence path.
    pub fn sentence_only(config: ChunkerConfig) -> Self {
        Self {
            oracle: None,
            config,
        }
    }
}

impl<O: TopicOracle> Chunker<O> {
    pub fn new(oracle: O, config: ChunkerConfig) -> Self {
        Self {
            oracle: Some(oracle),
            config,
        }
    }

    /// Partition `transcript` into ordered chunk drafts.
    ///
    /// Infallible: a zero-length transcript yields zero chunks, and every
    /// oracle failure mode degrades to the sentence fallback. The returned
    /// drafts always tile the transcript and carry monotone times.
    pub async fn chunk(&self, transcript: &str, segments: &[Segment]) -> Vec<ChunkDraft> {
        let chars: Vec<char> = transcript.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let spans = match self.config.strategy {
            ChunkingStrategy::Semantic => {
                match self.semantic_spans(transcript, chars.len()).await {
                    Ok(spans) => spans,
                    Err(err) => {
                        tracing::warn!(error = %err, "topic_oracle_failed_using_sentence_fallback");
                        self.fallback_spans(&chars)
                    }
                }
            }
            ChunkingStrategy::Sentence => self.fallback_spans(&chars),
        };

        let ranges = timing::segment_char_ranges(&chars, segments);
        let mut prev_end = 0.0f64;

        spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let (start_time, end_time) = timing::span_times(
                    (span.start_char_pos, span.end_char_pos),
                    &ranges,
                    segments,
                )
                .unwrap_or((prev_end, prev_end));
                prev_end = end_time;

                ChunkDraft {
                    chunk_index: i as i32,
                    text: chars[span.start_char_pos..span.end_char_pos].iter().collect(),
                    topic_summary: span.topic_summary,
                    keywords: span.keywords,
                    confidence: span.confidence,
                    start_time,
                    end_time,
                    start_char_pos: span.start_char_pos,
                    end_char_pos: span.end_char_pos,
                }
            })
            .collect()
    }

    async fn semantic_spans(
        &self,
        transcript: &str,
        total_chars: usize,
    ) -> Result<Vec<SuggestedSpan>, OracleError> {
        let oracle = self
            .oracle
            .as_ref()
            .ok_or_else(|| OracleError::Malformed("no oracle configured".to_string()))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_times(self.config.oracle_retries);

        (|| async {
            let spans = oracle.suggest_chunks(transcript).await?;
            sanitize_spans(total_chars, spans)
        })
        .retry(backoff)
        .notify(|err, dur| {
            tracing::warn!(
                error = %err,
                retry_delay_ms = dur.as_millis() as u64,
                "topic_oracle_retrying"
            );
        })
        .await
    }

    fn fallback_spans(&self, chars: &[char]) -> Vec<SuggestedSpan> {
        let sentences = sentence::sentence_spans(chars);
        sentence::group_spans(&sentences, self.config.sentences_per_chunk)
            .into_iter()
            .map(|(start_char_pos, end_char_pos)| SuggestedSpan {
                start_char_pos,
                end_char_pos,
                topic_summary: String::new(),
                keywords: Vec::new(),
                confidence: 0.0,
            })
            .collect()
    }
}

/// Check an oracle partition and repair what is repairable.
///
/// Spans are clamped into range, empties dropped, and gaps closed by
/// extending the preceding span (the first span is pulled back to 0, the
/// last pushed out to the end). Overlaps are not repairable: the positions
/// are contradictory rather than merely incomplete, so the caller retries.
fn sanitize_spans(
    total_chars: usize,
    spans: Vec<SuggestedSpan>,
) -> Result<Vec<SuggestedSpan>, OracleError> {
    let mut spans: Vec<SuggestedSpan> = spans
        .into_iter()
        .map(|mut span| {
            span.start_char_pos = span.start_char_pos.min(total_chars);
            span.end_char_pos = span.end_char_pos.min(total_chars);
            span.confidence = span.confidence.clamp(0.0, 1.0);
            span
        })
        .filter(|span| span.start_char_pos < span.end_char_pos)
        .collect();

    if spans.is_empty() {
        return Err(OracleError::Malformed("no usable spans".to_string()));
    }

    spans.sort_by_key(|span| span.start_char_pos);

    for k in 1..spans.len() {
        let prev_end = spans[k - 1].end_char_pos;
        let cur_start = spans[k].start_char_pos;
        if cur_start < prev_end {
            return Err(OracleError::Malformed(format!(
                "spans overlap at char {cur_start}"
            )));
        }
        if cur_start > prev_end {
            spans[k - 1].end_char_pos = cur_start;
        }
    }

    spans[0].start_char_pos = 0;
    if let Some(last) = spans.last_mut() {
        last.end_char_pos = total_chars;
    }

    Ok(spans)
}
