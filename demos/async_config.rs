//! Async construction with a caller-side retry loop.

use std::sync::atomic::{AtomicU32, Ordering};

use instance_guard::{ConstructionFailed, Guard};
use tokio::time::{sleep, Duration};
use tracing_subscriber::EnvFilter;

static SETTINGS: Guard<Settings> = Guard::new();
static FETCHES: AtomicU32 = AtomicU32::new(0);

#[derive(Debug)]
struct Settings {
   region: String,
   replicas: u8,
}

async fn fetch_settings() -> Result<Settings, &'static str> {
   sleep(Duration::from_millis(25)).await;
   // The remote store comes up on the third request.
   if FETCHES.fetch_add(1, Ordering::SeqCst) < 2 {
      Err("settings store not ready")
   } else {
      Ok(Settings {
         region: "eu-west".to_string(),
         replicas: 3,
      })
   }
}

async fn settings() -> Result<&'static Settings, ConstructionFailed<&'static str>> {
   let mut backoff = Duration::from_millis(10);
   loop {
      match SETTINGS.get_or_create_async(fetch_settings).await {
         Ok(settings) => return Ok(settings),
         Err(e) if backoff < Duration::from_millis(200) => {
            tracing::warn!(error = %e, "settings unavailable, retrying");
            sleep(backoff).await;
            backoff *= 2;
         }
         Err(e) => return Err(e),
      }
   }
}

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::from_default_env())
      .init();

   let tasks: Vec<_> = (0..4)
      .map(|id| {
         tokio::spawn(async move {
            match settings().await {
               Ok(s) => println!("task {id}: region={} replicas={}", s.region, s.replicas),
               Err(e) => println!("task {id}: gave up: {e}"),
            }
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }
   println!("remote fetches: {}", FETCHES.load(Ordering::SeqCst));
}
