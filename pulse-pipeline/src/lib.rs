//! # pulse-pipeline: live chat analysis on top of pulse-queue
//!
//! Chat lines arrive from a [`MessageSource`](source::MessageSource), get a
//! queue priority from [`PriorityRules`](priority::PriorityRules), and are
//! scored by an [`Analyzer`](analyzer::Analyzer) running inside the queue's
//! worker pool. Results accumulate in an [`AnalysisStore`](store::AnalysisStore).
//!
//! ```rust,no_run
//! use pulse_pipeline::{ChatPipeline, PipelineConfig, source::SimulatedSource};
//!
//! # async fn demo() -> pulse_pipeline::PipelineResult<()> {
//! let config = PipelineConfig::default();
//! let pipeline = ChatPipeline::with_lexicon(&config)?;
//! pipeline.start()?;
//!
//! let mut source = SimulatedSource::new("worlds", 42).with_count(100);
//! let report = pipeline.ingest(&mut source).await?;
//! pipeline.shutdown(config.drain_timeout).await?;
//!
//! println!("{} messages, {:?}", report.received, pipeline.summary());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod priority;
pub mod source;
pub mod store;

pub use analyzer::{Analysis, Analyzer, AnalyzerError, LexiconAnalyzer, SentimentLabel};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, SourceError};
pub use message::{ChatMessage, Platform};
pub use pipeline::{ChatPipeline, IngestReport};
pub use priority::PriorityRules;
pub use store::{AnalysisStore, AnalysisSummary, StoredAnalysis};
