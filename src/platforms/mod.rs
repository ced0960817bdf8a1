pub mod twitch;

pub use twitch::TwitchResourceFetcher;
