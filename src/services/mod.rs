pub mod api;
pub mod bell;
pub mod composer;
pub mod preview;
pub mod role;
pub mod topics;

#[cfg(test)]
pub(crate) mod mock;
