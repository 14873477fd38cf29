use std::sync::Arc;

use libris_core::{Capability, Intent};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ClassificationError;

/// Labels the latest user utterance.
///
/// Fails closed: any error, cancellation or empty answer yields `[End]`,
/// never a content-generating intent.
pub struct IntentClassifier {
    capability: Arc<dyn Capability>,
}

impl IntentClassifier {
    #[must_use]
    pub fn new(capability: Arc<dyn Capability>) -> Self {
        Self { capability }
    }

    /// Always returns at least one intent, without duplicates, in the
    /// order the capability reported them.
    pub async fn classify(&self, text: &str, cancel: &CancellationToken) -> Vec<Intent> {
        match self.try_classify(text, cancel).await {
            Ok(intents) => {
                let intents = normalize(intents);
                info!("Detected intents: {intents:?}");
                intents
            }
            Err(e) => {
                warn!("Intent classification failed, falling back to end: {e}");
                vec![Intent::End]
            }
        }
    }

    async fn try_classify(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Intent>, ClassificationError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ClassificationError::Cancelled),
            result = self.capability.classify_intent(text) => Ok(result?),
        }
    }
}

/// Drop duplicates keeping first occurrence; empty becomes `[End]`.
#[must_use]
pub fn normalize(intents: Vec<Intent>) -> Vec<Intent> {
    let mut out: Vec<Intent> = Vec::with_capacity(intents.len());
    for intent in intents {
        if !out.contains(&intent) {
            out.push(intent);
        }
    }
    if out.is_empty() {
        out.push(Intent::End);
    }
    out
}
