//! Async capability gateway: operations that run off the control task.
//!
//! `scene` covers immersive street-level scenes, `snapshot` covers
//! rasterized captures. Both are gated through `capability::Capabilities`.

pub mod capability;
pub mod scene;
pub mod snapshot;

pub use capability::{Capabilities, PlatformVersion, VersionGate};
pub use scene::{PoiCategory, PoiFilter, Scene, SceneError, SceneGateway, SceneProvider, ScenePresenter};
pub use snapshot::{Rasterizer, SnapshotError, SnapshotGateway, SnapshotOptions};
