//! Construction state machine shared by [`Guard`](crate::Guard) and
//! [`Instance`](crate::Instance).
//!
//! The state is packed into a single `AtomicU8`:
//! - Bit 0: READY - the value is constructed and published
//! - Bit 1: IN_PROGRESS - a caller holds the construction claim
//! - Bit 2: WAITING - at least one caller is parked on the state word
//! - Bits 3-7: EPOCH - bumped on every transition out of IN_PROGRESS
//!
//! Readers only ever need an acquire load of the word. Callers that find
//! construction in progress park on the word's address via `parking_lot_core`
//! and are woken when the claim is committed or abandoned. The epoch lets a
//! woken waiter tell an abandoned attempt apart from a spurious wake-up.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Observable construction phase of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
   /// No value and nobody constructing one.
   Uninitialized,
   /// A factory is running.
   InProgress,
   /// The value is constructed and will not change.
   Ready,
}

/// Outcome of trying to claim construction.
pub(crate) enum Acquire<'a> {
   /// The guard is already ready.
   Ready,
   /// The caller now owns construction.
   Claimed(Claim<'a>),
   /// The caller waited on an attempt that was abandoned without publishing.
   Abandoned,
}

/// Atomic construction state.
#[repr(transparent)]
pub(crate) struct GuardState(AtomicU8);

impl GuardState {
   const READY: u8 = 1;
   const IN_PROGRESS: u8 = 2;
   const WAITING: u8 = 4;
   const EPOCH_1: u8 = 8;
   const EPOCH_MASK: u8 = !(Self::READY | Self::IN_PROGRESS | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(state: u8) -> u8 {
      (state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   #[inline(always)]
   const fn epoch(state: u8) -> u8 {
      state & Self::EPOCH_MASK
   }

   #[inline]
   pub(crate) const fn uninit() -> Self {
      Self(AtomicU8::new(0))
   }

   #[inline]
   pub(crate) const fn ready() -> Self {
      Self(AtomicU8::new(Self::READY))
   }

   #[inline]
   pub(crate) fn phase(&self) -> Phase {
      let state = self.0.load(Ordering::Acquire);
      if state & Self::READY != 0 {
         Phase::Ready
      } else if state & Self::IN_PROGRESS != 0 {
         Phase::InProgress
      } else {
         Phase::Uninitialized
      }
   }

   /// Acquire load of the READY bit; pairs with the release in `publish`.
   #[inline]
   pub(crate) fn is_ready(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::READY != 0
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: the key is the state word's address, the same one `park` uses.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks until the state word differs from `expected`. May wake spuriously.
   #[inline]
   fn park(&self, expected: u8) {
      // SAFETY: see `notify_all`.
      unsafe {
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Marks the guard ready and wakes waiters. Only the claim holder calls this.
   #[inline]
   fn publish(&self) {
      let current = self.0.load(Ordering::Relaxed);
      let next = Self::READY | Self::next_epoch(current);
      let prev = self.0.swap(next, Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Returns the guard to uninitialized and wakes waiters.
   #[inline]
   fn reset(&self) {
      let current = self.0.load(Ordering::Relaxed);
      let prev = self.0.swap(Self::next_epoch(current), Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// One attempt at claiming construction.
   ///
   /// - `Ok(Acquire::Ready)`: already ready.
   /// - `Ok(Acquire::Claimed(_))`: claim taken.
   /// - `Err(state)`: claim held elsewhere; `state` is what a waiter should park on.
   ///   With `nowait` the WAITING bit is left alone.
   #[inline]
   fn claim_step(&self, nowait: bool) -> Result<Acquire<'_>, u8> {
      loop {
         let current = self.0.load(Ordering::Acquire);
         if current & Self::READY != 0 {
            return Ok(Acquire::Ready);
         }

         if current & Self::IN_PROGRESS == 0 {
            match self.0.compare_exchange_weak(
               current,
               current | Self::IN_PROGRESS,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Acquire::Claimed(Claim::new(self))),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && current & Self::WAITING == 0 {
            let flagged = current | Self::WAITING;
            match self.0.compare_exchange_weak(
               current,
               flagged,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(flagged),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current);
      }
   }

   /// Re-checks the attempt a waiter parked on, never claiming construction.
   ///
   /// - `Ok(Acquire::Ready)`: the attempt published.
   /// - `Ok(Acquire::Abandoned)`: the epoch moved without READY, so the attempt
   ///   failed. This holds even if the guard is now free to claim.
   /// - `Err(state)`: the same attempt is still running; park on `state`, with
   ///   WAITING re-armed.
   #[inline]
   fn recheck(&self, observed: u8) -> Result<Acquire<'_>, u8> {
      loop {
         let current = self.0.load(Ordering::Acquire);
         if current & Self::READY != 0 {
            return Ok(Acquire::Ready);
         }
         if Self::epoch(current) != Self::epoch(observed) {
            tracing::debug!("concurrent construction was abandoned");
            return Ok(Acquire::Abandoned);
         }
         // Same epoch without READY: the claim is still held.
         if current & Self::WAITING != 0 {
            return Err(current);
         }
         let flagged = current | Self::WAITING;
         match self.0.compare_exchange_weak(
            current,
            flagged,
            Ordering::Relaxed,
            Ordering::Relaxed,
         ) {
            Ok(_) => return Err(flagged),
            Err(_) => core::hint::spin_loop(),
         }
      }
   }

   /// Blocking wait for an attempt whose in-progress state was `observed`.
   fn wait_on(&self, mut observed: u8) -> Acquire<'_> {
      loop {
         self.park(observed);
         match self.recheck(observed) {
            Ok(outcome) => return outcome,
            Err(state) => observed = state,
         }
      }
   }

   /// Claims construction, blocking while another caller holds the claim.
   #[inline]
   pub(crate) fn claim(&self) -> Acquire<'_> {
      match self.claim_step(false) {
         Ok(outcome) => outcome,
         Err(observed) => self.wait_on(observed),
      }
   }

   /// Async flavor of [`claim`](Self::claim).
   ///
   /// Yields to the runtime first and falls back to `block_in_place` when the
   /// construction outlasts the yield budget.
   #[inline]
   pub(crate) async fn claim_async(&self) -> Acquire<'_> {
      let mut observed = match self.claim_step(false) {
         Ok(outcome) => return outcome,
         Err(state) => state,
      };
      #[allow(clippy::never_loop)]
      loop {
         for _ in 0..16 {
            for _ in 0..32 {
               #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
               tokio::task::yield_now().await;
               if self.0.load(Ordering::Relaxed) != observed {
                  break;
               }
            }
            match self.recheck(observed) {
               Ok(outcome) => return outcome,
               Err(state) => observed = state,
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            return tokio::task::block_in_place(|| self.wait_on(observed));
         }
      }
   }

   /// Claims construction only if nobody holds it. Never blocks.
   #[inline]
   pub(crate) fn try_claim(&self) -> Option<Claim<'_>> {
      match self.claim_step(true) {
         Ok(Acquire::Claimed(claim)) => Some(claim),
         _ => None,
      }
   }

   /// Blocks until the guard is ready, without ever claiming construction.
   pub(crate) fn wait_ready(&self) {
      loop {
         let current = self.0.load(Ordering::Acquire);
         if current & Self::READY != 0 {
            return;
         }
         if current & Self::WAITING == 0 {
            if self
               .0
               .compare_exchange_weak(
                  current,
                  current | Self::WAITING,
                  Ordering::Relaxed,
                  Ordering::Relaxed,
               )
               .is_err()
            {
               core::hint::spin_loop();
               continue;
            }
            self.park(current | Self::WAITING);
         } else {
            self.park(current);
         }
      }
   }
}

/// RAII claim on construction, held by exactly one caller at a time.
///
/// Dropping it without [`commit`](Self::commit) (factory error or panic)
/// returns the guard to uninitialized and wakes every waiter.
pub(crate) struct Claim<'a> {
   state: &'a GuardState,
}

impl<'a> Claim<'a> {
   #[inline(always)]
   const fn new(state: &'a GuardState) -> Self {
      Self { state }
   }

   /// Publishes the value written under this claim.
   #[inline(always)]
   pub(crate) fn commit(self) {
      self.state.publish();
      mem::forget(self);
   }
}

impl Drop for Claim<'_> {
   #[inline]
   fn drop(&mut self) {
      tracing::debug!("construction claim abandoned; guard reset to uninitialized");
      self.state.reset();
   }
}
