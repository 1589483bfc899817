pub mod decoder;
pub mod encoder;
pub mod error;
pub mod job;
pub mod queue;
pub mod session;
pub mod shared;
pub mod source;
pub mod worker;

pub use error::{Error, Result};

#[doc(hidden)]
pub mod prelude {
    pub use crate::decoder::*;
    pub use crate::encoder::*;
    pub use crate::job::*;
    pub use crate::queue::*;
    pub use crate::session::*;
    pub use crate::shared::*;
    pub use crate::worker::*;
}
