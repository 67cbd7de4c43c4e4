pub mod liveness;
pub mod read;
pub mod readiness;
pub mod setup;
