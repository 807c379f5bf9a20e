#![doc = include_str!("../../../readme.md")]

mod events;
mod handle;
mod owner;
mod path;
mod registry;
pub mod scheduler;

pub use events::{NavmeshEvent, ObserverId};
pub use handle::{NavMeshHandle, NavMeshReadGuard, PublishedMesh};
pub use owner::NavigationMesh;
pub use path::{PathQuery, PathQueryError};
pub use registry::{NavmeshId, NavmeshRegistry};
pub use scheduler::{BuildKind, BuildReport, BuildRequest, SchedulerState, UpdateScheduler};

pub use tilenav;
