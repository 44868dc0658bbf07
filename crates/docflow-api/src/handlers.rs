//! Request handlers.

pub mod health;
pub mod process;
pub mod processed_files;
pub mod upload;

pub use health::*;
pub use process::*;
pub use processed_files::*;
pub use upload::*;
