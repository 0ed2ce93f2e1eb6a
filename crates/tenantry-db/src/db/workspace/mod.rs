pub mod project;
pub mod task;

pub use project::ProjectRepository;
pub use task::TaskRepository;
