pub mod blacklist;
pub mod history;
pub mod registry;
