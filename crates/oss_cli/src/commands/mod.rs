pub mod crop;
pub mod delays;
pub mod media;
pub mod setup;
pub mod sync;
