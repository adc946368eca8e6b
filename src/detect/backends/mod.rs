pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::{ScriptedDetector, ScriptedFactory};

#[cfg(feature = "backend-tract")]
pub use tract::{TractDetector, TractFactory};
