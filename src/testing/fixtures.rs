//! Fixed identifiers and fixture names for a run
//!
//! The scope identifiers are placeholders: set them to the target project,
//! network area and organization before running against a live backend.

/// CLI binary used when `--cli` is not given
pub const DEFAULT_CLI: &str = "./bin/stackit";

pub const PROJECT_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const NETWORK_AREA_ID: &str = "00000000-0000-0000-0000-000000000002";
pub const ORGANIZATION_ID: &str = "00000000-0000-0000-0000-000000000003";

/// Routing table created first and kept until cleanup
pub const ROUTING_TABLE_NAME: &str = "rt_test";
/// Routing table the network is rebound to, then deleted
pub const SECOND_ROUTING_TABLE_NAME: &str = "rt_test_2";
pub const NETWORK_NAME: &str = "network-rt";

/// Default route destination shared by every route the suite creates
pub const DEFAULT_DESTINATION: &str = "0.0.0.0/0";
pub const NEXT_HOP_ADDRESS: &str = "10.1.1.0";

pub const ROUTING_TABLE_DESCRIPTION: &str = "Test desc";
pub const ROUTING_TABLE_LABELS: &str = "xxx=yyy,zzz=bbb";
pub const ROUTE_LABELS: &str = "key=value,foo=bar";

/// Flags scoping routing-table commands to the fixture network area
pub fn area_scope() -> Vec<String> {
    vec![
        "--network-area-id".to_string(),
        NETWORK_AREA_ID.to_string(),
        "--organization-id".to_string(),
        ORGANIZATION_ID.to_string(),
    ]
}
