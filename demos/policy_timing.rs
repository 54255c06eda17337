//! Eager and lazy instances side by side: when does the factory run?

use std::thread;
use std::time::{Duration, Instant};

use instance_guard::{Instance, Phase, Policy};
use tracing_subscriber::EnvFilter;

struct Catalog {
   built_at: Instant,
   entries: Vec<&'static str>,
}

fn load_catalog() -> Catalog {
   thread::sleep(Duration::from_millis(30));
   Catalog {
      built_at: Instant::now(),
      entries: vec!["widgets", "gadgets", "sprockets"],
   }
}

fn report(name: &str, catalog: &Instance<Catalog>) {
   println!("{name}: policy={} phase={:?}", catalog.policy(), catalog.phase());
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let start = Instant::now();
   let eager: Instance<Catalog> = Instance::new(Policy::Eager, load_catalog as fn() -> Catalog);
   let lazy: Instance<Catalog> = Instance::new(Policy::Lazy, load_catalog as fn() -> Catalog);

   report("eager", &eager);
   report("lazy", &lazy);
   assert_eq!(eager.phase(), Phase::Ready);
   assert_eq!(lazy.phase(), Phase::Uninitialized);

   thread::sleep(Duration::from_millis(50));
   let first_access = Instant::now();

   for (name, instance) in [("eager", &eager), ("lazy", &lazy)] {
      let catalog = instance.get();
      let built = catalog.built_at.duration_since(start);
      println!(
         "{name}: {} entries, built {:?} after start ({})",
         catalog.entries.len(),
         built,
         if catalog.built_at < first_access {
            "before first access"
         } else {
            "on first access"
         }
      );
   }
}
