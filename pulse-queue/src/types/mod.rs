pub mod ids;
pub mod item;
pub mod priority;
pub mod events;

pub use ids::{ItemId, WorkerId};
pub use item::{EnqueueOptions, ItemState, Metadata, QueuedItem, DEFAULT_MAX_RETRIES};
pub use priority::Priority;
pub use events::QueueEvent;
