pub mod badge;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod image_source;
pub mod network;
pub mod pledge;
pub mod proxy;
pub mod resolver;
pub mod store;
pub mod text;
pub mod text_metrics;
pub mod theme;

pub use badge::{Badge, BadgeCompositor, BadgeScene, HeaderKind, ProfileFill};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config, parse_config};
pub use error::{BadgeError, FormError, LoadError, StoreError, SubmitError};
pub use image_source::{ImageSource, LoadedImage, NetImageSource};
pub use network::{NetworkLayout, layout_network};
pub use pledge::{BadgeSpec, NewPledge, Pledge};
pub use resolver::{PreviewDebouncer, ProfileResolver, Resolution};
pub use store::{MemoryStore, PledgeService, PledgeStore, Subscription};
pub use theme::Theme;
