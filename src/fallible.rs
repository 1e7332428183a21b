use crate::errors::WibError;
use std::future::Future;
use tracing::{debug, warn};

/// Run a best-effort lookup and collapse every failure into "absent".
///
/// Service clients return `Ok(None)` for ordinary no-data conditions and `Err`
/// for anything unexpected. Callers that treat a source as optional wrap the
/// call here so both outcomes look the same, with the error logged once.
pub async fn best_effort<T, F>(source: &str, lookup: F) -> Option<T>
where
    F: Future<Output = Result<Option<T>, WibError>>,
{
    match lookup.await {
        Ok(Some(value)) => {
            debug!("{}: record found", source);
            Some(value)
        }
        Ok(None) => {
            debug!("{}: no data", source);
            None
        }
        Err(e) => {
            warn!("{}: lookup failed: {}", source, e);
            None
        }
    }
}
