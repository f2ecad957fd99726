use serde::Deserialize;

pub mod embedding;
pub mod ingest;
pub mod reconcile;

/// Cap on the error list carried by run reports; everything is still
/// logged, only the returned summary is bounded.
pub const MAX_REPORTED_ERRORS: usize = 5;

/// A job received on the worker socket.
#[derive(Deserialize, Debug)]
pub enum JobMessage {
    /// Ingest one upstream source by selector name.
    Collect(String),
    /// Fill missing vectors for one entity kind.
    Embed(EmbedTarget),
    /// Backfill stale notices from a fresh upstream snapshot.
    Reconcile,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTarget {
    Notices,
    Policies,
}

pub(crate) fn record_error(errors: &mut Vec<String>, message: String) {
    log::error!("{message}");
    if errors.len() < MAX_REPORTED_ERRORS {
        errors.push(message);
    }
}
