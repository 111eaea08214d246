pub mod chats;
pub mod groups;
pub mod messages;
pub mod presence;
pub mod uploads;
pub mod wsroute;
