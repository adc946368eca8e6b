mod backend;
pub mod backends;
mod registry;
mod result;

pub use backend::{
    resolve_delegate, Delegate, Detector, DetectorFactory, DetectorOptions, DeviceCapabilities,
    ModelKind,
};
pub use backends::{ScriptedDetector, ScriptedFactory};
pub use registry::DetectorRegistry;
pub use result::{BoundingBox, Category, Detection};

