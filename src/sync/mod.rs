pub mod classifier;
pub mod reconciler;
pub mod service;

pub use classifier::{ClassifiedBatch, EventClassifier};
pub use reconciler::{DeletionPolicy, ReconcilePlan, Reconciler};
pub use service::SyncService;
