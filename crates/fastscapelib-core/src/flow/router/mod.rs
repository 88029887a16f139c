//! Flow routers: operators that populate receiver edges from elevation.

pub mod multi;
pub mod single;

pub use multi::MultiFlowRouter;
pub use single::SingleFlowRouter;
