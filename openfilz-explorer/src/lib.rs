pub mod config;
pub mod credentials;
pub mod explorer;
pub mod notify;
pub mod ops;
pub mod prefs;
pub mod theme;
pub mod view;
