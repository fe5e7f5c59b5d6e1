pub mod common;
pub mod notification;
pub mod role;
pub mod student;
pub mod template;
pub mod topic;
