//! Cancellation signal composition.
//!
//! A fetch attempt is governed by up to two independently-owned abort
//! signals: the caller's token and the attempt's internal timeout
//! token. [`merge`] derives a single token representing "abort if
//! either fires" without either owner knowing about the other.

use tokio_util::sync::CancellationToken;

/// Returns a token that is cancelled as soon as either input is.
///
/// If an input is already cancelled, a clone of it is returned directly
/// and nothing is allocated. Otherwise a forwarding task propagates the
/// first cancellation to the merged token; token semantics make the
/// propagation idempotent, so a source firing twice is harmless.
///
/// The forwarding task exits once any of the three tokens is cancelled.
/// Callers that discard a merged token without firing any source should
/// cancel one of them on their last exit path, which is what the fetch
/// loop does with its per-attempt timer token.
pub fn merge(a: &CancellationToken, b: &CancellationToken) -> CancellationToken {
    if a.is_cancelled() {
        return a.clone();
    }
    if b.is_cancelled() {
        return b.clone();
    }

    let merged = CancellationToken::new();
    let forward = merged.clone();
    let a = a.clone();
    let b = b.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = forward.cancelled() => {}
            _ = a.cancelled() => forward.cancel(),
            _ = b.cancelled() => forward.cancel(),
        }
    });

    merged
}
