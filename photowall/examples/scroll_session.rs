//! Simulates a user scrolling through a grid of remote images.
//!
//! ```sh
//! RUST_LOG=photowall=debug cargo run --example scroll_session -- https://example.com/a.png ...
//! ```

use photowall::{Image, ScrollState, WallBuilder};

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

const CELLS_ON_SCREEN: usize = 6;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let mut urls: Vec<String> = std::env::args().skip(1).collect();
  if urls.is_empty() {
    urls = (0..30)
      .map(|i| format!("https://picsum.photos/id/{}/200/200", i))
      .collect();
  }

  let binder = |url: &String, image: Arc<Image>| {
    println!("showing {} ({}x{})", url, image.width(), image.height());
  };

  let mut wall = WallBuilder::<String>::new()
    .memory_budget(256 * 1024 * 1024)
    .connect_timeout(Duration::from_secs(3))
    .build_http(urls, binder)
    .expect("Failed to build the wall");

  println!("First screen.");
  wall.on_visible_range_changed(0, CELLS_ON_SCREEN);
  wall.wait_for_completions(Duration::from_millis(300));

  println!("\nFlinging down; unfinished fetches are cancelled.");
  wall.on_scroll_state_changed(ScrollState::Scrolling);
  for first in (0..18).step_by(3) {
    wall.on_visible_range_changed(first, CELLS_ON_SCREEN);
  }
  wall.on_scroll_state_changed(ScrollState::Idle);

  // Keep pumping completions the way a UI event loop would.
  let mut idle_rounds = 0;
  while idle_rounds < 20 && !wall.registry().is_empty() {
    if wall.wait_for_completions(Duration::from_millis(250)) == 0 {
      idle_rounds += 1;
    }
  }

  println!("\nScrolling back up; the first screen comes from the cache.");
  wall.on_scroll_state_changed(ScrollState::Scrolling);
  wall.on_visible_range_changed(0, CELLS_ON_SCREEN);
  wall.on_scroll_state_changed(ScrollState::Idle);

  wall.on_shutdown();
  println!("\nMetrics: {:#?}", wall.metrics());
}
