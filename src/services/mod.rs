pub mod auth;
pub mod friends;
pub mod init;
pub mod schedules;
pub mod sharing;
pub mod users;

#[cfg(test)]
pub mod testing;
