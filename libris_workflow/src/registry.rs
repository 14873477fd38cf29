use std::sync::Arc;

use libris_core::{Capability, Intent};
use tracing::info;

use crate::handler::{
    ConverseHandler, Handler, HandlerKind, PreferencesHandler, ReadBooksHandler, RecommendHandler,
    RecommendPipeline,
};

/// Static routing table from intent to handler slot.
///
/// `End` has no handler: the turn goes straight to the summarizer.
#[must_use]
pub const fn route(intent: Intent) -> Option<HandlerKind> {
    match intent {
        Intent::Recommend => Some(HandlerKind::Recommend),
        Intent::SavePreferences => Some(HandlerKind::Preferences),
        Intent::SaveReadBooks => Some(HandlerKind::ReadBooks),
        Intent::Talk => Some(HandlerKind::Converse),
        Intent::End => None,
    }
}

/// One handler per [`HandlerKind`], always fully populated.
pub struct HandlerRegistry {
    recommend: Arc<dyn Handler>,
    preferences: Arc<dyn Handler>,
    read_books: Arc<dyn Handler>,
    converse: Arc<dyn Handler>,
}

impl HandlerRegistry {
    /// Build the default handlers over a shared capability.
    #[must_use]
    pub fn new(capability: &Arc<dyn Capability>, pipeline: RecommendPipeline) -> Self {
        Self {
            recommend: Arc::new(RecommendHandler::new(capability.clone(), pipeline)),
            preferences: Arc::new(PreferencesHandler::new(capability.clone())),
            read_books: Arc::new(ReadBooksHandler::new(capability.clone())),
            converse: Arc::new(ConverseHandler::new(capability.clone())),
        }
    }

    /// Replace the handler in the slot named by `handler.kind()`.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        let kind = handler.kind();
        info!("Registering handler: {kind}");
        match kind {
            HandlerKind::Recommend => self.recommend = handler,
            HandlerKind::Preferences => self.preferences = handler,
            HandlerKind::ReadBooks => self.read_books = handler,
            HandlerKind::Converse => self.converse = handler,
        }
    }

    #[must_use]
    pub fn get(&self, kind: HandlerKind) -> Arc<dyn Handler> {
        match kind {
            HandlerKind::Recommend => self.recommend.clone(),
            HandlerKind::Preferences => self.preferences.clone(),
            HandlerKind::ReadBooks => self.read_books.clone(),
            HandlerKind::Converse => self.converse.clone(),
        }
    }

    /// Handler slots for `intents`, in intent order, each at most once.
    #[must_use]
    pub fn plan(intents: &[Intent]) -> Vec<HandlerKind> {
        let mut plan = Vec::with_capacity(intents.len());
        for kind in intents.iter().filter_map(|&intent| route(intent)) {
            if !plan.contains(&kind) {
                plan.push(kind);
            }
        }
        plan
    }
}
