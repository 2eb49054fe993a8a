// Infrastructure layer module
// Contains adapters for external systems (database, etc.)

pub mod repositories;
