// SPDX-FileCopyrightText: 2026 Ticketrail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle tracking for the Ticketrail session tracker.
//!
//! Groups per-contact events into sessions, detects closure, rebuilds
//! transfer chains, and assembles one attention per closed chain.

pub mod assembler;
pub mod chain;
pub mod closure;
pub mod registry;
pub mod session;
pub mod transcript;

pub use assembler::AttentionAssembler;
pub use chain::{ChainLink, TransferChain, TransferGraph, build_chain};
pub use closure::ClosureDetector;
pub use registry::{EventOutcome, MessageOutcome, NoticeOutcome, SessionRegistry};
pub use session::{OpenSessionInfo, Session, SessionState};
pub use transcript::TranscriptRenderer;
