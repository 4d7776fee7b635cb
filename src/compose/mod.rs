//! Composite MCP server assembled from an `mcpServers` configuration.

pub mod composite;
pub mod errors;
pub mod mount;
pub mod namespace;
pub mod report;
pub mod upstream;
pub mod uri_template;

pub use composite::{CompositeServer, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_NAME};
pub use mount::{
    composite_server_from_config, composite_server_from_config_concurrent,
    mount_config_into_server, mount_config_into_server_concurrent, MountOptions,
    DEFAULT_MAX_CONCURRENT, DEFAULT_MOUNT_TIMEOUT,
};
pub use namespace::Namespace;
pub use report::{MountOutcome, MountReport, MountStatus};
pub use upstream::{Catalog, CatalogCounts, UpstreamServer};
