use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    /// Prior artifact read and merged.
    Merged,
    /// No prior artifact.
    Absent,
    /// Prior artifact could not be read; continued without it.
    Unreadable,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingOutcome {
    pub input_uri: String,
    pub artifact_uri: String,
    pub history: HistoryStatus,
    pub incoming_rows: usize,
    pub history_rows: usize,
    pub written_rows: usize,
    pub duplicates_removed: usize,
    pub pruned_objects: usize,
    pub artifact_sha256: String,
}
