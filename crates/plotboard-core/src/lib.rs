//! Plotboard Core Library
//!
//! Scene graph and geometry engine for an anchored-connection diagramming
//! surface: nodes, connections that keep lines glued to shapes, resize and
//! move transforms, snapshot undo/redo, and the JSON interchange format.

pub mod config;
pub mod connection;
pub mod geometry;
pub mod history;
pub mod interchange;
pub mod node;
pub mod scene;
pub mod session;
pub mod snap;
pub mod storage;
pub mod transform;
pub mod viewport;

pub use config::{ConfigError, SessionConfig};
pub use connection::{normalize_all_lines, refresh_all, refresh_connections_for, refresh_line};
pub use geometry::{BoundingBox, LINE_PADDING, anchor_point, bounding_box_of};
pub use history::{History, HistoryEntry};
pub use interchange::{FORMAT_VERSION, ImportError, InterchangeDocument};
pub use node::{AnchorRef, Attributes, Connection, Direction, LineType, Node, NodeId, NodeKind};
pub use scene::SceneStore;
pub use session::Session;
pub use snap::{GRID_SIZE, GridConfig, snap_point, snap_value};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageResult};
pub use transform::{MIN_SIZE, move_line_point, resize};
pub use viewport::Viewport;
