//! Configuration and profile state for the RGB daemon
//!
//! - **store**: per-game RGB profiles plus the per-game enable flag
//! - **resolver**: picks the active profile and mutates its zones
//! - **settings**: daemon settings file (sockets, log level, debounce)

pub mod resolver;
pub mod settings;
pub mod store;

pub use settings::Settings;
pub use store::RgbSnapshot;
