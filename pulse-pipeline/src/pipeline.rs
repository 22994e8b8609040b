use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pulse_queue::{
    DeadLetter, EnqueueOptions, MessageQueue, Priority, ProcessError, Processor, QueueStats, QueuedItem,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::{
    analyzer::{Analyzer, AnalyzerError, LexiconAnalyzer},
    config::PipelineConfig,
    error::{PipelineResult, SourceError},
    message::ChatMessage,
    priority::PriorityRules,
    source::MessageSource,
    store::{AnalysisStore, AnalysisSummary},
};

/// Outcome of pumping one source into the queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub source: String,
    /// Messages read from the source
    pub received: u64,
    /// Lines the source could not parse
    pub malformed: u64,
    pub critical: u64,
    pub high: u64,
    pub normal: u64,
    pub low: u64,
    /// Ingest ended because of shutdown rather than end of stream
    pub interrupted: bool,
}

impl IngestReport {
    fn count(&mut self, priority: Priority) {
        match priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Normal => self.normal += 1,
            Priority::Low => self.low += 1,
        }
    }

    pub fn submitted(&self) -> u64 {
        self.critical + self.high + self.normal + self.low
    }
}

/// Queue processor: analyze, then store
struct AnalysisProcessor {
    analyzer: Arc<dyn Analyzer>,
    store: Arc<AnalysisStore>,
}

#[async_trait]
impl Processor<ChatMessage> for AnalysisProcessor {
    async fn process(&self, item: QueuedItem<ChatMessage>) -> Result<bool, ProcessError> {
        match self.analyzer.analyze(&item.payload).await {
            Ok(analysis) => {
                let message_id = item.payload.id.clone();
                let toxicity = analysis.toxicity;
                if self.store.record(item.payload, analysis, item.priority) {
                    warn!(%message_id, toxicity, "toxic message flagged");
                }
                Ok(true)
            }
            Err(AnalyzerError::Transient(reason)) => Err(ProcessError::Failed(reason)),
            Err(AnalyzerError::Invalid(reason)) => {
                debug!(message_id = %item.payload.id, %reason, "message rejected by analyzer");
                Ok(false)
            }
        }
    }
}

/// Chat ingestion front end over a [`MessageQueue`]
#[derive(Clone)]
pub struct ChatPipeline {
    queue: MessageQueue<ChatMessage>,
    analyzer: Arc<dyn Analyzer>,
    store: Arc<AnalysisStore>,
    rules: Arc<PriorityRules>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ChatPipeline {
    pub fn new(config: &PipelineConfig, analyzer: Arc<dyn Analyzer>) -> PipelineResult<Self> {
        let queue = MessageQueue::new(config.queue.clone())?;
        let rules = PriorityRules::new(config.alert_keywords.iter().cloned(), config.low_max_len);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            queue,
            analyzer,
            store: Arc::new(AnalysisStore::new(config.store_capacity, config.toxicity_threshold)),
            rules: Arc::new(rules),
            shutdown: Arc::new(shutdown),
        })
    }

    /// Pipeline scored by the built-in [`LexiconAnalyzer`]
    pub fn with_lexicon(config: &PipelineConfig) -> PipelineResult<Self> {
        Self::new(config, Arc::new(LexiconAnalyzer::default()))
    }

    /// Start the queue workers
    pub fn start(&self) -> PipelineResult<()> {
        let processor = AnalysisProcessor {
            analyzer: self.analyzer.clone(),
            store: self.store.clone(),
        };
        self.queue.start_workers_arc(Arc::new(processor))?;
        info!(workers = self.queue.worker_count(), "chat pipeline started");
        Ok(())
    }

    /// Pump `source` into the queue until it ends or shutdown is requested.
    ///
    /// Malformed records are counted and skipped; other source errors end
    /// the ingest.
    #[instrument(skip(self, source), fields(source = source.name()))]
    pub async fn ingest<S>(&self, source: &mut S) -> PipelineResult<IngestReport>
    where
        S: MessageSource + ?Sized,
    {
        let mut report = IngestReport {
            source: source.name().to_string(),
            ..IngestReport::default()
        };
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            report.interrupted = true;
            return Ok(report);
        }

        source.connect().await?;
        info!("ingest started");

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    report.interrupted = true;
                    break;
                }
                next = source.next_message() => next,
            };

            match next {
                Ok(Some(message)) => {
                    report.received += 1;
                    let priority = self.rules.classify(&message);
                    report.count(priority);

                    let options = EnqueueOptions::new(priority)
                        .with_max_retries(self.queue.config().default_max_retries)
                        .with_meta("platform", message.platform.name())
                        .with_meta("channel", message.channel.clone());
                    self.queue.enqueue_with(message, options).await;
                }
                Ok(None) => break,
                Err(SourceError::Malformed { line, reason }) => {
                    report.malformed += 1;
                    warn!(line, %reason, "skipping malformed record");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            received = report.received,
            submitted = report.submitted(),
            malformed = report.malformed,
            interrupted = report.interrupted,
            "ingest finished"
        );
        Ok(report)
    }

    /// Run [`ingest`](Self::ingest) on its own task
    pub fn spawn_ingest<S>(&self, mut source: S) -> JoinHandle<PipelineResult<IngestReport>>
    where
        S: MessageSource + 'static,
    {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.ingest(&mut source).await })
    }

    /// Stop ingest, let the queue drain for up to `drain_timeout`, then stop
    /// the workers. Items still queued afterwards are left in place.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, drain_timeout: Duration) -> PipelineResult<()> {
        self.shutdown.send_replace(true);

        if !self.queue.wait_idle(drain_timeout).await {
            warn!(pending = self.queue.len(), "queue not drained before shutdown deadline");
        }
        self.queue.stop_workers().await?;
        info!("chat pipeline stopped");
        Ok(())
    }

    pub fn stats(&self) -> QueueStats {
        self.queue.get_stats()
    }

    pub fn summary(&self) -> AnalysisSummary {
        self.store.summary()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter<ChatMessage>> {
        self.queue.get_dead_letter_queue()
    }

    pub fn queue(&self) -> &MessageQueue<ChatMessage> {
        &self.queue
    }

    pub fn store(&self) -> &AnalysisStore {
        &self.store
    }
}
