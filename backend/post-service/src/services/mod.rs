pub mod post_manager;

pub use post_manager::PostManager;
