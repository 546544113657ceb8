pub mod errors;
pub mod version;

pub use errors::PlainTextErrors;
pub use version::{VersionHeader, VERSION, VERSION_HEADER};
