use murmur_store::activity_names;

/// The fixed workflow: activities run in declaration order, each gated on
/// its completion marker. Retry policy lives in
/// [`EngineConfig`](crate::EngineConfig), keyed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Activity {
    Transcribe,
    Chunk,
    Embed,
}

impl Activity {
    pub const ALL: [Activity; 3] = [Activity::Transcribe, Activity::Chunk, Activity::Embed];

    /// The marker key in the store's `activity_completions` table.
    pub fn name(self) -> &'static str {
        match self {
            Activity::Transcribe => activity_names::TRANSCRIBE,
            Activity::Chunk => activity_names::CHUNK,
            Activity::Embed => activity_names::EMBED,
        }
    }

    /// Progress percentage reported once this activity has completed.
    pub(crate) fn milestone(self) -> u8 {
        match self {
            Activity::Transcribe => 60,
            Activity::Chunk => 80,
            Activity::Embed => 100,
        }
    }
}
