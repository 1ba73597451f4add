mod constants;
mod fake;
mod objs;
mod pods;
mod snapshot;

pub use constants::*;
pub use fake::*;
pub use objs::*;
pub use pods::*;
pub use rstest::fixture;
pub use rstest_log::rstest;
pub use snapshot::*;
