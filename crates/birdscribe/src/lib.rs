//! `birdscribe` - Upload bird photos and show what they are.
//!
//! An image is captured from a picked or dropped file or from a screenshot
//! of a rendered surface, written to an object-storage bucket, recorded in
//! an `uploads` table, and shown with a species description and analysis
//! drawn from two annotation tables.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod annotation;
pub mod backend;
pub mod bucket;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod hosted;
pub mod logging;
pub mod records;
pub mod session;
pub mod storage;
pub mod upload;

pub use annotation::{Annotation, AnnotationProvider};
pub use backend::Backend;
pub use capture::{CaptureSource, CapturedImage};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use records::UploadRecord;
pub use session::{Session, SessionState};
pub use storage::{Storage, StorageStats};
pub use upload::UploadPipeline;
