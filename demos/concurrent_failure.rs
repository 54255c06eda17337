//! Callers queued behind a failing construction are told it failed; they do
//! not silently start their own attempt.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use instance_guard::{ConstructionFailed, Guard};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Connection {
   endpoint: String,
}

fn connect(endpoint: &str, reachable: bool) -> Result<Connection, String> {
   thread::sleep(Duration::from_millis(100));
   if reachable {
      Ok(Connection {
         endpoint: endpoint.to_string(),
      })
   } else {
      Err(format!("{endpoint} refused the connection"))
   }
}

fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let conn: Arc<Guard<Connection>> = Arc::new(Guard::new());

   let first = {
      let conn = Arc::clone(&conn);
      thread::spawn(move || {
         let outcome = conn.get_or_create(|| connect("db:5432", false)).map(|_| ());
         outcome
      })
   };
   thread::sleep(Duration::from_millis(20));

   let queued: Vec<_> = (0..3)
      .map(|id| {
         let conn = Arc::clone(&conn);
         thread::spawn(move || {
            let outcome = conn
               .get_or_create(|| connect("db-replica:5432", true))
               .map(|_| ());
            (id, outcome)
         })
      })
      .collect();

   match first.join().unwrap() {
      Err(ConstructionFailed::Factory(reason)) => println!("first caller: {reason}"),
      other => println!("first caller: {other:?}"),
   }
   for handle in queued {
      let (id, outcome) = handle.join().unwrap();
      match outcome {
         Err(e) if e.is_concurrent() => println!("queued caller {id}: {e}"),
         other => println!("queued caller {id}: {other:?}"),
      }
   }

   // Retrying is up to the caller.
   match conn.get_or_create(|| connect("db-replica:5432", true)) {
      Ok(c) => println!("retry connected to {}", c.endpoint),
      Err(e) => println!("retry failed: {e}"),
   }
}
