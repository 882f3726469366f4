pub mod agenda;
pub mod attendance;
pub mod member;
pub mod settings;
pub mod storage;
