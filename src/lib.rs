//! Thread-safe single-instance guards.
//!
//! This crate provides the building blocks for the "exactly one instance"
//! pattern without ambient global lookup:
//!
//! - [`Guard<T>`]: owns at most one `T`, builds it from a caller-supplied factory
//!   on first need, and hands every caller the same shared reference.
//! - [`Instance<T, F>`]: a guard bundled with its factory and a [`Policy`]
//!   (`Eager` or `Lazy`) chosen at creation, typically from configuration.
//!
//! Both are plain values. Put them in a `static` for process-wide scope, or own
//! them and inject them where needed, so tests can use a fresh guard each.
//!
//! # Guarantees
//!
//! - **Single construction**: exactly one factory invocation succeeds in
//!   populating a guard, however many threads race on it.
//! - **Safe publication**: every caller sees the fully-constructed value; the
//!   ready transition is a release store paired with acquire loads on every read.
//! - **Lock-free reads**: once ready, access is a single atomic load.
//! - **Retryable failure**: a failed or panicking factory leaves the guard empty.
//!   Callers that were waiting on it get [`ConstructionFailed::Concurrent`].
//! - **Async support**: `*_async` variants cooperate with tokio.
//!
//! # Examples
//!
//! ## Lazy guard
//!
//! ```rust
//! use instance_guard::Guard;
//!
//! static CONFIG: Guard<String> = Guard::new();
//!
//! let value = CONFIG.get_or_init(|| "production".to_string());
//! assert_eq!(value, "production");
//!
//! // Later calls return the same value without running the factory again.
//! assert!(std::ptr::eq(value, CONFIG.get_or_init(|| unreachable!())));
//! ```
//!
//! ## Fallible construction
//!
//! ```rust
//! use instance_guard::{ConstructionFailed, Guard};
//!
//! let guard: Guard<u32> = Guard::new();
//!
//! assert_eq!(
//!    guard.get_or_create(|| Err::<u32, _>("not yet")),
//!    Err(ConstructionFailed::Factory("not yet"))
//! );
//! assert_eq!(guard.get_or_create(|| Ok::<_, &str>(42)), Ok(&42));
//! ```
//!
//! ## Policy from configuration
//!
//! ```rust
//! use instance_guard::{Instance, Policy};
//!
//! let policy: Policy = "eager".parse().unwrap();
//! let pool = Instance::new(policy, || vec![0u8; 4]);
//! assert!(pool.is_ready());
//! ```

mod error;
mod guard;
mod instance;
mod policy;

/// Construction state machine.
mod state;

pub use error::{ConstructionFailed, UnknownPolicy};
pub use guard::Guard;
pub use instance::Instance;
pub use policy::Policy;
pub use state::Phase;
