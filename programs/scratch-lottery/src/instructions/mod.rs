pub mod admin;
pub mod purchase;
pub mod scratch;
pub mod verify;

pub use admin::*;
pub use purchase::*;
pub use scratch::*;
pub use verify::*;
