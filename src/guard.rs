//! The single-instance guard.
//!
//! [`Guard<T>`] owns at most one value of type `T` and hands out shared
//! references to it. The value is built by a caller-supplied factory the first
//! time it is needed (or up front with [`Guard::eager`]), and a successful
//! factory runs at most once no matter how many threads race on the guard.
//!
//! Reads of a ready guard are a single acquire load. The cold path claims
//! construction through the atomic state in [`crate::state`], re-checking
//! readiness inside the claim loop before running the factory.

use core::any::type_name;
use core::cell::UnsafeCell;
use core::future::Future;
use core::{fmt, mem};

use crate::error::ConstructionFailed;
use crate::state::{Acquire, Claim, GuardState, Phase};

/// A thread-safe cell holding the one instance of `T`.
///
/// A guard is an ordinary value: put it in a `static` for process-wide scope,
/// or own it (directly or through an `Arc`) and pass it to the components that
/// need the instance.
///
/// # Factory contract
///
/// Factories should only build the value. A factory must not call a blocking
/// method (`get_or_create`, `get_or_init`, `set`, `wait`) on the guard that is
/// running it; that deadlocks. [`get`](Self::get), [`phase`](Self::phase) and
/// [`try_set`](Self::try_set) never block and are fine.
pub struct Guard<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   state: GuardState,
}

impl<T> Guard<T> {
   /// Creates an empty guard that constructs lazily.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         state: GuardState::uninit(),
      }
   }

   /// Creates a guard that is already ready with `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
         state: GuardState::ready(),
      }
   }

   /// Runs `factory` now and returns a ready guard.
   ///
   /// No guard is created if the factory fails.
   pub fn eager<F, E>(factory: F) -> Result<Self, ConstructionFailed<E>>
   where
      F: FnOnce() -> Result<T, E>,
   {
      tracing::trace!(ty = type_name::<T>(), "constructing value eagerly");
      match factory() {
         Ok(value) => Ok(Self::with_value(value)),
         Err(e) => {
            tracing::debug!(ty = type_name::<T>(), "eager factory failed");
            Err(ConstructionFailed::Factory(e))
         }
      }
   }

   /// Current construction phase. Never blocks.
   #[inline]
   pub fn phase(&self) -> Phase {
      self.state.phase()
   }

   /// Returns `true` once the value is constructed. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.state.is_ready()
   }

   /// Returns the value if it is constructed. Never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_ready() {
         // SAFETY: the acquire load in is_ready() synchronizes with the publish.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// # Safety
   ///
   /// The guard must be ready, as observed by an acquire load on this thread.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_ready(), "get_unchecked called on an empty Guard");
      // SAFETY: the caller guarantees the value is initialized and published.
      unsafe { (*self.value.get()).assume_init_ref() }
   }

   /// Blocks until another caller has constructed the value.
   ///
   /// This never runs a factory. If nobody ever constructs the value this
   /// blocks forever; failed attempts keep it waiting for the next one.
   pub fn wait(&self) -> &T {
      if !self.is_ready() {
         self.state.wait_ready();
      }
      // SAFETY: wait_ready only returns after an acquire load saw READY.
      unsafe { self.get_unchecked() }
   }

   /// Publishes `value` if the guard is empty, blocking while another caller
   /// is constructing.
   ///
   /// Returns `Err(value)` if the guard already holds a value.
   pub fn set(&self, value: T) -> Result<&T, T> {
      loop {
         match self.state.claim() {
            Acquire::Ready => return Err(value),
            Acquire::Abandoned => continue,
            Acquire::Claimed(claim) => return Ok(self.publish(claim, value)),
         }
      }
   }

   /// Publishes `value` only if the guard is empty and nobody is constructing.
   /// Never blocks.
   pub fn try_set(&self, value: T) -> Result<&T, T> {
      match self.state.try_claim() {
         Some(claim) => Ok(self.publish(claim, value)),
         None => Err(value),
      }
   }

   /// Returns the instance, constructing it with `factory` on first access.
   ///
   /// Concurrent callers block until construction finishes, and exactly one
   /// factory runs to completion. If a factory panics, the guard resets and a
   /// caller that was waiting on it runs its own factory instead.
   #[inline]
   pub fn get_or_init<F>(&self, factory: F) -> &T
   where
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value;
      }
      self.init(factory);
      // SAFETY: init only returns once the guard is ready.
      unsafe { self.get_unchecked() }
   }

   /// Returns the instance, constructing it with a fallible `factory` on first
   /// access.
   ///
   /// - Ready: returns the value without running `factory`.
   /// - Empty: claims construction and runs `factory`. `Ok` publishes the value;
   ///   `Err(e)` leaves the guard empty and returns
   ///   [`ConstructionFailed::Factory`].
   /// - In progress elsewhere: blocks. If that attempt fails, returns
   ///   [`ConstructionFailed::Concurrent`] without running `factory`.
   ///
   /// Nothing is retried automatically; the next call may try again.
   pub fn get_or_create<F, E>(&self, factory: F) -> Result<&T, ConstructionFailed<E>>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.create(factory)?;
      debug_assert!(self.is_ready());
      // SAFETY: create returned Ok, so the guard is ready.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Async version of [`get_or_init`](Self::get_or_init).
   ///
   /// Waiting tasks yield to the runtime first. With the `async-tokio-mt`
   /// feature, long waits move to `block_in_place`, which requires a
   /// multi-threaded runtime.
   #[inline]
   pub async fn get_or_init_async<F, Fut>(&self, factory: F) -> &T
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      if let Some(value) = self.get() {
         return value;
      }
      self.init_async(factory).await;
      // SAFETY: init_async only returns once the guard is ready.
      unsafe { self.get_unchecked() }
   }

   /// Async version of [`get_or_create`](Self::get_or_create).
   ///
   /// Dropping the future while its factory is pending abandons the attempt:
   /// the guard returns to uninitialized and waiters see
   /// [`ConstructionFailed::Concurrent`].
   pub async fn get_or_create_async<F, Fut, E>(
      &self,
      factory: F,
   ) -> Result<&T, ConstructionFailed<E>>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.create_async(factory).await?;
      debug_assert!(self.is_ready());
      // SAFETY: create_async returned Ok, so the guard is ready.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Consumes the guard and returns the value, if it was constructed.
   pub fn into_inner(mut self) -> Option<T> {
      let value = if self.is_ready() {
         // SAFETY: ready and exclusively owned; `self` is forgotten below so the
         // value is not dropped twice.
         Some(unsafe { self.value.get_mut().assume_init_read() })
      } else {
         None
      };
      mem::forget(self);
      value
   }

   // --- Cold paths ---

   /// Writes `value` under `claim` and publishes it.
   #[inline]
   fn publish(&self, claim: Claim<'_>, value: T) -> &T {
      // SAFETY: holding the claim gives exclusive access to the slot.
      let value = unsafe { (*self.value.get()).write(value) };
      claim.commit();
      tracing::trace!(ty = type_name::<T>(), "value published");
      value
   }

   #[cold]
   fn init<F>(&self, factory: F)
   where
      F: FnOnce() -> T,
   {
      loop {
         match self.state.claim() {
            Acquire::Ready => return,
            Acquire::Abandoned => continue,
            Acquire::Claimed(claim) => {
               tracing::trace!(ty = type_name::<T>(), "constructing value");
               self.publish(claim, factory());
               return;
            }
         }
      }
   }

   #[cold]
   fn create<F, E>(&self, factory: F) -> Result<(), ConstructionFailed<E>>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let claim = match self.state.claim() {
         Acquire::Ready => return Ok(()),
         Acquire::Abandoned => return Err(ConstructionFailed::Concurrent),
         Acquire::Claimed(claim) => claim,
      };
      tracing::trace!(ty = type_name::<T>(), "constructing value");
      self.finish(claim, factory())
   }

   #[cold]
   async fn init_async<F, Fut>(&self, factory: F)
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      loop {
         match self.state.claim_async().await {
            Acquire::Ready => return,
            Acquire::Abandoned => continue,
            Acquire::Claimed(claim) => {
               tracing::trace!(ty = type_name::<T>(), "constructing value");
               self.publish(claim, factory().await);
               return;
            }
         }
      }
   }

   #[cold]
   async fn create_async<F, Fut, E>(&self, factory: F) -> Result<(), ConstructionFailed<E>>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      let claim = match self.state.claim_async().await {
         Acquire::Ready => return Ok(()),
         Acquire::Abandoned => return Err(ConstructionFailed::Concurrent),
         Acquire::Claimed(claim) => claim,
      };
      tracing::trace!(ty = type_name::<T>(), "constructing value");
      self.finish(claim, factory().await)
   }

   /// Publishes a successful factory result, or abandons the claim on error.
   fn finish<E>(&self, claim: Claim<'_>, result: Result<T, E>) -> Result<(), ConstructionFailed<E>> {
      match result {
         Ok(value) => {
            self.publish(claim, value);
            Ok(())
         }
         Err(e) => {
            tracing::debug!(ty = type_name::<T>(), "factory failed");
            drop(claim);
            Err(ConstructionFailed::Factory(e))
         }
      }
   }
}

// SAFETY: shared access only ever hands out `&T`, and the value may be built on
// one thread and dropped on another.
unsafe impl<T: Sync + Send> Sync for Guard<T> {}
// SAFETY: moving the guard moves the `T` it owns.
unsafe impl<T: Send> Send for Guard<T> {}

impl<T> Default for Guard<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Debug> fmt::Debug for Guard<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Guard");
      match self.get() {
         Some(v) => d.field(v),
         None if self.phase() == Phase::InProgress => d.field(&format_args!("<in progress>")),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}

impl<T> Drop for Guard<T> {
   #[inline]
   fn drop(&mut self) {
      if self.is_ready() {
         // SAFETY: exclusive access, the value is initialized and never read again.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
