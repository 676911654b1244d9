pub mod combat;
pub mod command;
pub mod job;
pub mod logger;
pub mod machine;
pub mod map;
pub mod navigator;
pub mod platform;
pub mod rune;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod strategy;
pub mod summon;
pub mod timing;
pub mod types;
pub mod worker;
