//! Error types.

use thiserror::Error;

/// Construction of the guarded value failed.
///
/// The guard is left uninitialized in both cases, so a later call may try
/// again. Nothing is retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstructionFailed<E> {
   /// The factory run by this caller returned an error.
   #[error("factory failed: {0}")]
   Factory(E),

   /// This caller was waiting on another caller's construction attempt, and
   /// that attempt failed.
   #[error("concurrent construction attempt failed")]
   Concurrent,
}

impl<E> ConstructionFailed<E> {
   /// Returns the factory's own error, if this caller ran the factory.
   pub fn into_factory_error(self) -> Option<E> {
      match self {
         Self::Factory(e) => Some(e),
         Self::Concurrent => None,
      }
   }

   /// Returns `true` if the failure happened in another caller's attempt.
   pub fn is_concurrent(&self) -> bool {
      matches!(self, Self::Concurrent)
   }
}

/// A construction policy string was neither `eager` nor `lazy`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown construction policy `{0}`, expected `eager` or `lazy`")]
pub struct UnknownPolicy(pub String);
