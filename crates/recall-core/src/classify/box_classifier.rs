//! BoxClassifier -- object-safe dynamic dispatch wrapper for Classifier.
//!
//! 1. Define an object-safe `ClassifierDyn` trait with boxed futures
//! 2. Blanket-impl `ClassifierDyn` for all `T: Classifier`
//! 3. `BoxClassifier` wraps `Box<dyn ClassifierDyn>` and implements `Classifier`

use std::future::Future;
use std::pin::Pin;

use recall_types::classification::ClassificationId;
use recall_types::error::ClassifierError;
use recall_types::turn::ConversationTurn;

use super::classifier::Classifier;

/// Object-safe version of [`Classifier`] with boxed futures.
///
/// A blanket implementation is provided for all types implementing `Classifier`.
pub trait ClassifierDyn: Send + Sync {
    fn classify_boxed<'a>(
        &'a self,
        turn: &'a ConversationTurn,
    ) -> Pin<Box<dyn Future<Output = Result<ClassificationId, ClassifierError>> + Send + 'a>>;

    fn name_dyn(&self) -> &str;
}

impl<T: Classifier> ClassifierDyn for T {
    fn classify_boxed<'a>(
        &'a self,
        turn: &'a ConversationTurn,
    ) -> Pin<Box<dyn Future<Output = Result<ClassificationId, ClassifierError>> + Send + 'a>> {
        Box::pin(self.classify(turn))
    }

    fn name_dyn(&self) -> &str {
        self.name()
    }
}

/// Type-erased classifier for runtime backend selection.
///
/// Since `Classifier` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxClassifier` delegates to the inner `ClassifierDyn` and
/// itself implements `Classifier`, so the pipeline can be pinned to it.
pub struct BoxClassifier {
    inner: Box<dyn ClassifierDyn + Send + Sync>,
}

impl BoxClassifier {
    /// Wrap a concrete `Classifier` in a type-erased box.
    pub fn new<T: Classifier + 'static>(classifier: T) -> Self {
        Self {
            inner: Box::new(classifier),
        }
    }
}

impl Classifier for BoxClassifier {
    async fn classify(&self, turn: &ConversationTurn) -> Result<ClassificationId, ClassifierError> {
        self.inner.classify_boxed(turn).await
    }

    fn name(&self) -> &str {
        self.inner.name_dyn()
    }
}
