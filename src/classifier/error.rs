use thiserror::Error;

use crate::mx::Error as MxError;
use crate::smtp::ProbeError;

/// Failures building an [`EmailClassifier`](super::EmailClassifier).
/// Classification itself never fails; it yields a category.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error(transparent)]
    Resolver(#[from] MxError),
    #[error(transparent)]
    Prober(#[from] ProbeError),
}
