#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Turn-execution workflow for the book assistant.
//!
//! Every inbound message runs through one pass of
//! `Window -> Classify -> Dispatch -> Merge -> Summarize`:
//!
//! - the session history is trimmed to the first message plus the latest exchange,
//! - the message is labelled with zero or more [`Intent`](libris_core::Intent)s,
//! - each intent's handler runs as its own task against a shared read-only snapshot,
//! - a barrier waits for every branch, and the partial deltas are folded back in
//!   dispatch order so the result does not depend on which handler finished first,
//! - a final summarisation step writes the user-facing reply.
//!
//! Handler failures degrade the turn instead of aborting it. Only a missing
//! session or a failed summary is fatal, and in both cases nothing is persisted.

mod barrier;
mod classifier;
mod dispatcher;
mod engine;
mod error;
pub mod handler;
mod history;
mod merger;
pub mod prompts;
mod registry;
mod service;
mod state;
mod summarizer;

pub use barrier::{BranchOutcome, PendingBranches};
pub use classifier::IntentClassifier;
pub use dispatcher::Dispatcher;
pub use engine::{TurnOutcome, TurnPhase, TurnRequest, WorkflowConfig, WorkflowEngine};
pub use error::{ClassificationError, HandlerError, TurnError};
pub use handler::{Handler, HandlerKind, RecommendPipeline};
pub use history::{HistoryConfig, HistoryWindow};
pub use merger::StateMerger;
pub use registry::{HandlerRegistry, route};
pub use service::{ChatService, TurnReply};
pub use state::{StateDelta, TurnState};
pub use summarizer::Summarizer;
