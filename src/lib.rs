pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod history;
pub mod input;
pub mod logging;
pub mod selection;
pub mod state;
pub mod storage;
pub mod workspace;

pub use compose::{AuxiliaryImage, EditRequest, EditRequestComposer};
pub use error::{AppError, AppResult};
pub use selection::{Mask, SelectionError, SelectionSession};
pub use workspace::Workspace;
