pub mod friendship;
pub mod schedule;
pub mod shared_schedule;
pub mod user;

pub use friendship::FriendshipRepository;
pub use schedule::ScheduleRepository;
pub use shared_schedule::SharedScheduleRepository;
pub use user::UserRepository;
