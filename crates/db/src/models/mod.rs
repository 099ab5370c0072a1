pub mod notification;
pub mod preferences;
