use std::future::Future;

use async_trait::async_trait;

use crate::{ProcessError, QueuedItem};

/// Work performed for each dequeued item.
///
/// Workers call `process` concurrently, so implementations must manage
/// their own shared state. `Ok(true)` is success; `Ok(false)` and `Err`
/// both send the item down the retry path.
#[async_trait]
pub trait Processor<P>: Send + Sync + 'static
where
    P: Send + 'static,
{
    async fn process(&self, item: QueuedItem<P>) -> Result<bool, ProcessError>;
}

/// Async closures are processors
#[async_trait]
impl<P, F, Fut> Processor<P> for F
where
    P: Send + 'static,
    F: Fn(QueuedItem<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, ProcessError>> + Send + 'static,
{
    async fn process(&self, item: QueuedItem<P>) -> Result<bool, ProcessError> {
        (self)(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnqueueOptions, Priority};
    use std::sync::Arc;

    struct EvenOnly;

    #[async_trait]
    impl Processor<u32> for EvenOnly {
        async fn process(&self, item: QueuedItem<u32>) -> Result<bool, ProcessError> {
            Ok(item.payload % 2 == 0)
        }
    }

    #[tokio::test]
    async fn struct_processor() {
        let processor: Arc<dyn Processor<u32>> = Arc::new(EvenOnly);
        let item = QueuedItem::new(4, EnqueueOptions::new(Priority::Normal));
        assert_eq!(processor.process(item).await, Ok(true));
    }

    #[tokio::test]
    async fn closure_processor() {
        let processor: Arc<dyn Processor<&'static str>> = Arc::new(|item: QueuedItem<&'static str>| async move {
            if item.payload.is_empty() {
                Err(ProcessError::failed("empty message"))
            } else {
                Ok(true)
            }
        });

        let empty = QueuedItem::new("", EnqueueOptions::default());
        assert!(processor.process(empty).await.is_err());
    }
}
