// Domain-layer modules and shared errors/models
pub mod client {
    pub use crate::client::*;
}

pub mod field_mapping {
    pub use crate::field_mapping::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod workflow {
    pub use crate::workflow::*;
}

pub mod errors {
    pub use crate::errors::*;
}
