pub mod config;
pub mod instance;
pub mod policy;
pub mod render;

pub use config::init_tracing;
pub use config::LogLevel;
pub use config::LoggingConfig;
pub use instance::load_instance;
pub use instance::InstanceError;
pub use policy::Policy;
pub use policy::PolicyError;
pub use policy::PolicyLoadError;
pub use render::format_diagnostics;
pub use render::format_json;
pub use render::format_load_error;
pub use render::format_policy_errors;
pub use render::Format;
