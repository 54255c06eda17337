use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use instance_guard::{ConstructionFailed, Instance, Phase, Policy, UnknownPolicy};

#[test]
fn test_lazy_never_constructs_without_access() {
   let calls = AtomicUsize::new(0);
   {
      let instance: Instance<String, _> = Instance::lazy(|| {
         calls.fetch_add(1, Ordering::SeqCst);
         String::from("unused")
      });
      assert_eq!(instance.policy(), Policy::Lazy);
      assert_eq!(instance.phase(), Phase::Uninitialized);
      assert_eq!(instance.peek(), None);
   }
   // Dropped without ever being read, so the factory never ran.
   assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_lazy_constructs_once_on_access() {
   let calls = AtomicUsize::new(0);
   let instance = Instance::lazy(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      vec![1, 2, 3]
   });

   assert_eq!(instance.get(), &vec![1, 2, 3]);
   assert_eq!(instance.len(), 3); // Through Deref
   assert!(std::ptr::eq(instance.get(), &*instance));
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_eager_constructs_at_creation() {
   let calls = AtomicUsize::new(0);
   let instance = Instance::eager(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      42
   });

   // Constructed before anyone asked for it.
   assert_eq!(calls.load(Ordering::SeqCst), 1);
   assert!(instance.is_ready());
   assert_eq!(instance.policy(), Policy::Eager);
   assert_eq!(instance.peek(), Some(&42));
   assert_eq!(*instance.get(), 42);
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_new_follows_policy() {
   let eager = Instance::new(Policy::Eager, || 1);
   assert!(eager.is_ready());

   let lazy = Instance::new(Policy::Lazy, || 1);
   assert!(!lazy.is_ready());
   assert_eq!(*lazy, 1);
   assert!(lazy.is_ready());
}

#[test]
fn test_try_get_retries_after_failure() {
   let attempts = AtomicUsize::new(0);
   let instance = Instance::lazy(|| {
      if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
         Err("warming up")
      } else {
         Ok(42)
      }
   });

   assert_eq!(
      instance.try_get(),
      Err(ConstructionFailed::Factory("warming up"))
   );
   assert!(!instance.is_ready());
   // The stored factory is called again on the next access.
   assert_eq!(instance.try_get(), Ok(&42));
   assert_eq!(instance.try_get(), Ok(&42));
   assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_try_eager_surfaces_failure() {
   let failed = Instance::try_eager(|| Err::<u32, _>("unreachable host"));
   assert_eq!(
      failed.err(),
      Some(ConstructionFailed::Factory("unreachable host"))
   );

   let ok = Instance::try_new(Policy::Eager, || Ok::<_, &str>(5u32)).unwrap();
   assert_eq!(ok.peek(), Some(&5));

   // Lazy creation cannot fail; the factory has not run yet.
   let deferred = Instance::try_new(Policy::Lazy, || Err::<u32, _>("never run")).unwrap();
   assert_eq!(deferred.phase(), Phase::Uninitialized);
}

#[test]
fn test_shared_instance_across_threads() {
   let calls = Arc::new(AtomicUsize::new(0));
   let instance = {
      let calls = Arc::clone(&calls);
      Arc::new(Instance::lazy(move || {
         calls.fetch_add(1, Ordering::SeqCst);
         String::from("pool")
      }))
   };

   let threads: Vec<_> = (0..16)
      .map(|_| {
         let instance = Arc::clone(&instance);
         thread::spawn(move || instance.get() as *const String as usize)
      })
      .collect();

   let addr = instance.get() as *const String as usize;
   for t in threads {
      assert_eq!(t.join().unwrap(), addr);
   }
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_static_instance() {
   fn build() -> Vec<&'static str> {
      vec!["alpha", "beta"]
   }
   static NAMES: Instance<Vec<&'static str>> = Instance::lazy(build);

   assert_eq!(NAMES.first(), Some(&"alpha"));
   assert_eq!(NAMES.policy(), Policy::Lazy);
}

#[test]
fn test_into_inner() {
   let instance = Instance::eager(|| String::from("owned"));
   assert_eq!(instance.into_inner(), Some(String::from("owned")));

   let untouched: Instance<String, _> = Instance::lazy(|| String::from("never"));
   assert_eq!(untouched.into_inner(), None);
}

#[test]
fn test_policy_parsing() {
   assert_eq!("eager".parse::<Policy>(), Ok(Policy::Eager));
   assert_eq!(" LAZY \n".parse::<Policy>(), Ok(Policy::Lazy));
   assert_eq!(
      "sometimes".parse::<Policy>(),
      Err(UnknownPolicy(String::from("sometimes")))
   );
   assert_eq!(Policy::default(), Policy::Lazy);
   assert_eq!(Policy::Eager.to_string(), "eager");
   assert_eq!(
      UnknownPolicy(String::from("x")).to_string(),
      "unknown construction policy `x`, expected `eager` or `lazy`"
   );
}
