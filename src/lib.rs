pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod render;
pub mod tasks {
    pub mod catalog;
    pub mod loader;
    pub mod viewer;
}
