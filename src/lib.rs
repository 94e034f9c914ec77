pub mod autosize;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dump;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod validate;

pub use config::{EngineConfig, ViewFlags, load_config};
pub use layout::{LevelLayout, compute_level_layout};
pub use model::{Diagram, Edge, Level, Node, NodeKind, RouteMode};
pub use validate::{Finding, RuleCode, Severity, filter_for_display, validate};

#[cfg(feature = "cli")]
pub use cli::run;
