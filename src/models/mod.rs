pub mod api;
pub mod blacklist;
pub mod download;
pub mod history;
pub mod search;
