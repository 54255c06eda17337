//! A guard bundled with its factory and construction policy.
//!
//! [`Instance<T, F>`] is the configured form of [`Guard<T>`]: the factory is
//! supplied once at creation and the [`Policy`] decides whether it runs right
//! away or on first access. Because the factory is stored and called by
//! reference, a failed lazy construction can be retried on the next access.

use core::fmt;
use core::ops::Deref;

use crate::error::ConstructionFailed;
use crate::guard::Guard;
use crate::policy::Policy;
use crate::state::Phase;

/// A single instance of `T` produced by the factory `F`.
///
/// ```rust
/// use instance_guard::Instance;
///
/// static REGISTRY: Instance<Vec<&'static str>> = Instance::lazy(|| vec!["default"]);
///
/// assert_eq!(REGISTRY.get(), &["default"]);
/// assert_eq!(REGISTRY.len(), 1);
/// ```
pub struct Instance<T, F = fn() -> T> {
   guard: Guard<T>,
   factory: F,
   policy: Policy,
}

impl<T, F> Instance<T, F> {
   /// Creates an instance that runs `factory` on first access.
   #[inline]
   #[must_use]
   pub const fn lazy(factory: F) -> Self {
      Self {
         guard: Guard::new(),
         factory,
         policy: Policy::Lazy,
      }
   }

   /// The policy this instance was created with.
   #[inline]
   pub fn policy(&self) -> Policy {
      self.policy
   }

   /// Current construction phase. Never blocks.
   #[inline]
   pub fn phase(&self) -> Phase {
      self.guard.phase()
   }

   /// Returns `true` once the value is constructed. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.guard.is_ready()
   }

   /// Returns the value if it is already constructed, without running the factory.
   #[inline]
   pub fn peek(&self) -> Option<&T> {
      self.guard.get()
   }

   /// Consumes the instance and returns the value, if it was constructed.
   pub fn into_inner(self) -> Option<T> {
      self.guard.into_inner()
   }
}

impl<T, F> Instance<T, F>
where
   F: Fn() -> T,
{
   /// Creates an instance and constructs its value immediately.
   pub fn eager(factory: F) -> Self {
      tracing::trace!(ty = core::any::type_name::<T>(), "constructing value eagerly");
      let value = factory();
      Self {
         guard: Guard::with_value(value),
         factory,
         policy: Policy::Eager,
      }
   }

   /// Creates an instance with the given construction policy.
   pub fn new(policy: Policy, factory: F) -> Self {
      match policy {
         Policy::Eager => Self::eager(factory),
         Policy::Lazy => Self::lazy(factory),
      }
   }

   /// Returns the instance, constructing it on first access.
   #[inline]
   pub fn get(&self) -> &T {
      self.guard.get_or_init(&self.factory)
   }
}

impl<T, E, F> Instance<T, F>
where
   F: Fn() -> Result<T, E>,
{
   /// Creates an instance and constructs its value immediately, returning the
   /// factory's error if that fails.
   pub fn try_eager(factory: F) -> Result<Self, ConstructionFailed<E>> {
      let guard = Guard::eager(&factory)?;
      Ok(Self {
         guard,
         factory,
         policy: Policy::Eager,
      })
   }

   /// Creates an instance with the given construction policy. Only the eager
   /// policy can fail here.
   pub fn try_new(policy: Policy, factory: F) -> Result<Self, ConstructionFailed<E>> {
      match policy {
         Policy::Eager => Self::try_eager(factory),
         Policy::Lazy => Ok(Self::lazy(factory)),
      }
   }

   /// Returns the instance, constructing it on first access.
   ///
   /// See [`Guard::get_or_create`] for the failure semantics.
   #[inline]
   pub fn try_get(&self) -> Result<&T, ConstructionFailed<E>> {
      self.guard.get_or_create(&self.factory)
   }
}

impl<T, F> Deref for Instance<T, F>
where
   F: Fn() -> T,
{
   type Target = T;

   #[inline]
   fn deref(&self) -> &T {
      self.get()
   }
}

impl<T: fmt::Debug, F> fmt::Debug for Instance<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Instance")
         .field("policy", &self.policy)
         .field("value", &self.guard)
         .finish_non_exhaustive()
   }
}
