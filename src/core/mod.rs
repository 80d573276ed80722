// Domain-layer modules and shared errors/models
pub mod batch {
    pub use crate::batch::*;
}

pub mod scorer {
    pub use crate::scorer::*;
}

pub mod generator {
    pub use crate::generator::*;
}

pub mod prompts {
    pub use crate::prompts::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
