//! Reconciliation: choose one text per image from the local and remote results.
//!
//! Remote text wins whenever it has visible content; otherwise the local
//! text is used. The two confidences come from different engines on different
//! scales, so they are never compared or blended: the reported confidence
//! is always the one belonging to the selected text.

use crate::backend::BackendOutcome;
use crate::output::{ProcessedWith, ReconciledResult, RecognitionResult};
use tracing::debug;

/// Merge the local result and the remote outcome for one image.
///
/// | remote outcome             | local text | result                                  |
/// |----------------------------|------------|-----------------------------------------|
/// | `Recognized`, non-empty    | any        | remote text, `remote+local`             |
/// | anything else              | non-empty  | local text, `local`                     |
/// | anything else              | empty      | empty text, confidence 0, `no_text`     |
pub fn reconcile(local: &RecognitionResult, remote: &BackendOutcome) -> ReconciledResult {
    if let BackendOutcome::Recognized(remote) = remote {
        if remote.has_text() {
            return ReconciledResult {
                text: remote.text.clone(),
                confidence: remote.confidence,
                processed_with: ProcessedWith::RemoteWithLocal,
                no_text: false,
            };
        }
        debug!("Remote result was empty, falling back to local text");
    }

    if local.has_text() {
        return ReconciledResult {
            text: local.text.clone(),
            confidence: local.confidence,
            processed_with: ProcessedWith::Local,
            no_text: false,
        };
    }

    debug!("No text from either backend ({})", remote.label());
    ReconciledResult {
        text: String::new(),
        confidence: 0.0,
        processed_with: ProcessedWith::Local,
        no_text: true,
    }
}
