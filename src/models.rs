pub mod invites;
pub mod sessions;
