//! Passing one instance to the components that need it instead of reaching
//! for a global.

use std::env;
use std::sync::Arc;
use std::thread;

use instance_guard::{Instance, Policy};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Pool {
   connections: Vec<u32>,
}

fn build_pool() -> Pool {
   tracing::info!("opening pool");
   Pool {
      connections: (0..4).collect(),
   }
}

struct Worker {
   id: usize,
   pool: Arc<Instance<Pool>>,
}

impl Worker {
   fn run(&self) -> usize {
      let pool = self.pool.get();
      println!(
         "worker {} sees pool at {:p} with {} connections",
         self.id,
         pool,
         pool.connections.len()
      );
      pool.connections.len()
   }
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let policy = match env::var("POOL_POLICY") {
      Ok(raw) => match raw.parse::<Policy>() {
         Ok(policy) => policy,
         Err(e) => {
            eprintln!("{e}; falling back to lazy");
            Policy::Lazy
         }
      },
      Err(_) => Policy::default(),
   };

   let pool: Arc<Instance<Pool>> = Arc::new(Instance::new(policy, build_pool as fn() -> Pool));
   println!("policy {} -> phase {:?}", pool.policy(), pool.phase());

   let handles: Vec<_> = (0..4)
      .map(|id| {
         let worker = Worker {
            id,
            pool: Arc::clone(&pool),
         };
         thread::spawn(move || worker.run())
      })
      .collect();

   for handle in handles {
      assert_eq!(handle.join().unwrap(), 4);
   }
}
