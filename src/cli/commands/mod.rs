mod admin;
mod import;
mod migrate;

pub use admin::cmd_create_admin;
pub use import::cmd_import;
pub use migrate::cmd_migrate;
