//! Typed endpoint wrappers
//!
//! Each module reshapes one resource family's JSON:API documents into flat
//! result types. The heavy lifting (auth, retry, pagination, uploads) lives
//! in the client; these are deliberately thin.

mod apps;
mod builds;
mod pricing;
mod reviews;
mod screenshots;
mod subscriptions;
mod testflight;
mod versions;

pub use apps::*;
pub use builds::*;
pub use pricing::*;
pub use reviews::*;
pub use screenshots::*;
pub use subscriptions::*;
pub use testflight::*;
pub use versions::*;
