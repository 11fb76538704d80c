//! Migration services: extraction, loading, id allocation, verification,
//! status bookkeeping and the phase orchestrator that drives them.

pub mod batch_writer;
pub mod extractor;
pub mod orchestrator;
pub mod phases;
pub mod pipeline;
pub mod sanity;
pub mod sequence;
pub mod status;
pub mod verification;

pub use batch_writer::{BatchOutcome, BatchWriter};
pub use extractor::Extractor;
pub use orchestrator::{PhaseOrchestrator, PhaseOutcome, PhaseReport, RunOptions};
pub use phases::PhaseName;
pub use pipeline::{EntityPipeline, EntityReport, Pipeline, PipelineContext};
pub use sanity::{run_checks, CheckReport, CheckResult};
pub use sequence::{DegradedSequence, SequenceAllocator, SequenceKind};
pub use status::{PhaseEvent, PhaseState, RunCounters, StatusReport, StatusStore, StatusView};
pub use verification::{VerificationGate, VerificationReport};
