//! Composite assembly and the stdio/TCP serving loops.
mod server_info;
mod startup;

pub use server_info::build_instructions;
pub use startup::{
    build_composite, mount_failure_exit, run_server, RuntimeExit, COMPOSE_MOUNT_FAILED_EXIT_CODE,
};
