//! External service integrations.

pub mod credentials {
    pub use crate::credentials::*;
}

pub mod transport {
    pub use crate::transport::*;
}
