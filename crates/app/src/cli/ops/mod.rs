pub mod apply;
pub mod import;
pub mod init;
pub mod plan;
pub mod version;

pub use apply::Apply;
pub use import::Import;
pub use init::Init;
pub use plan::Plan;
pub use version::Version;
