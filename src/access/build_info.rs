//! Build information slice
//!
//! Combines the server's `buildInfo` reply with what the connection's hosts
//! say about where the cluster runs.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};

use crate::mql::{
    CommandType, HasCollectionReference, HasFieldReference, HasFilter, HasLimit, HasRunCommand,
    HasValueReference, IsCommand, Name, Named, Namespace, Node,
};

use super::driver::{self, ConnectionString, MongoDbDriver, QueryContext};
use super::slice::{Slice, SliceFuture};

/// Version reported when the server does not answer `buildInfo`
pub const DEFAULT_VERSION: &str = "8.0.0";

const LOCAL_ATLAS_CLUSTER_TYPE: &str = "atlasCliLocalDevCluster";

/// What is known about the connected server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub git_version: Option<String>,
    pub modules: Vec<String>,
    pub is_localhost: bool,
    pub is_data_lake: bool,
    pub is_enterprise: bool,
    pub is_atlas: bool,
    pub is_local_atlas: bool,
    pub is_atlas_stream: bool,
    pub is_digital_ocean: bool,
    pub is_genuine_mongodb: bool,
    /// `cosmosdb` or `documentdb` for API-compatible services
    pub non_genuine_variant: Option<&'static str>,
    pub server_url: ConnectionString,
}

impl BuildInfo {
    /// First host without its port, only for Atlas clusters
    pub fn atlas_host(&self) -> Option<String> {
        if !self.is_atlas {
            return None;
        }
        let host = self.server_url.hosts.first()?;
        Some(port_suffix().map_or_else(|| host.clone(), |re| re.replace_all(host, "").into_owned()))
    }
}

/// Server version and hosting environment
#[derive(Debug, Clone, Copy, Default)]
pub struct GetBuildInfo;

impl Slice for GetBuildInfo {
    type Output = BuildInfo;

    fn id(&self) -> String {
        "GetBuildInfo".to_string()
    }

    fn query_using_driver<'a>(
        &'a self,
        driver: &'a dyn MongoDbDriver,
        timeout: Duration,
    ) -> SliceFuture<'a, BuildInfo> {
        Box::pin(async move {
            let server_url = driver.connection_string();
            let hosts = &server_url.hosts;

            let is_atlas = all_hosts_match(hosts, HostPattern::Atlas);
            let is_atlas_stream = is_atlas && all_hosts_match(hosts, HostPattern::AtlasStream);
            let non_genuine_variant = if all_hosts_match(hosts, HostPattern::CosmosDb) {
                Some("cosmosdb")
            } else if all_hosts_match(hosts, HostPattern::DocumentDb) {
                Some("documentdb")
            } else {
                None
            };

            let reply = if driver.connected() {
                driver::run_command(driver, HasRunCommand::new("admin", "buildInfo"), timeout)
                    .await
                    .unwrap_or(Value::Null)
            } else {
                Value::Null
            };
            let is_local_atlas = driver.connected() && is_local_atlas(driver, timeout).await;

            let git_version = reply
                .get("gitVersion")
                .and_then(Value::as_str)
                .map(str::to_string);
            let modules: Vec<String> = reply
                .get("modules")
                .and_then(Value::as_array)
                .map(|modules| {
                    modules
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let is_enterprise = git_version
                .as_deref()
                .is_some_and(|v| v.contains("enterprise"))
                || modules.iter().any(|m| m == "enterprise");

            Ok(BuildInfo {
                version: reply
                    .get("version")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_VERSION)
                    .to_string(),
                git_version,
                modules,
                is_localhost: all_hosts_match(hosts, HostPattern::Localhost),
                is_data_lake: reply.get("dataLake").is_some(),
                is_enterprise,
                is_atlas,
                is_local_atlas,
                is_atlas_stream,
                is_digital_ocean: all_hosts_match(hosts, HostPattern::DigitalOcean),
                is_genuine_mongodb: non_genuine_variant.is_none(),
                non_genuine_variant,
                server_url,
            })
        })
    }
}

/// Local Atlas deployments created by the Atlas CLI leave a marker document
async fn is_local_atlas(driver: &dyn MongoDbDriver, timeout: Duration) -> bool {
    let marker = Node::new(
        (),
        vec![
            Named(Name::Eq).into(),
            HasFieldReference::from_schema((), "managedClusterType").into(),
            HasValueReference::constant((), json!(LOCAL_ATLAS_CLUSTER_TYPE)).into(),
        ],
    );
    let query = Node::new(
        (),
        vec![
            HasCollectionReference::Known {
                database_source: Some(()),
                collection_source: (),
                namespace: Namespace::new("admin", "atlascli"),
                schema: None,
            }
            .into(),
            IsCommand(CommandType::CountDocuments).into(),
            HasFilter::new(vec![marker]).into(),
            HasLimit(1).into(),
        ],
    );

    match driver::run(driver, &query, QueryContext::empty(), timeout).await {
        Ok(count) => count.as_u64().is_some_and(|count| count > 0),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy)]
enum HostPattern {
    Atlas,
    AtlasStream,
    Localhost,
    DigitalOcean,
    CosmosDb,
    DocumentDb,
}

impl HostPattern {
    fn source(&self) -> &'static str {
        match self {
            HostPattern::Atlas => r".*\.mongodb(-dev|-qa|-stage)?\.net(:\d+)?",
            HostPattern::AtlasStream => r"atlas-stream-.+",
            HostPattern::Localhost => {
                r"(localhost|127.([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5]).([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5]).([01]?[0-9][0-9]?|2[0-4][0-9]|25[0-5])|0.0.0.0|\[(?:0*:)*?:?0*1\])(:[0-9]+)?"
            }
            HostPattern::DigitalOcean => r".*\.mongo\.ondigitalocean\.com",
            HostPattern::CosmosDb => r".*\.cosmos\.azure\.com",
            HostPattern::DocumentDb => r".*docdb(-elastic)?\.amazonaws\.com",
        }
    }

    fn regex(&self) -> Option<&'static Regex> {
        static PATTERNS: OnceLock<Vec<Option<Regex>>> = OnceLock::new();
        let patterns = PATTERNS.get_or_init(|| {
            [
                HostPattern::Atlas,
                HostPattern::AtlasStream,
                HostPattern::Localhost,
                HostPattern::DigitalOcean,
                HostPattern::CosmosDb,
                HostPattern::DocumentDb,
            ]
            .iter()
            .map(|pattern| Regex::new(&format!("^(?:{})$", pattern.source())).ok())
            .collect()
        });
        patterns.get(*self as usize)?.as_ref()
    }
}

fn port_suffix() -> Option<&'static Regex> {
    static PORT: OnceLock<Option<Regex>> = OnceLock::new();
    PORT.get_or_init(|| Regex::new(r":\d+").ok()).as_ref()
}

/// Every host matches; an empty host list matches nothing
fn all_hosts_match(hosts: &[String], pattern: HostPattern) -> bool {
    match pattern.regex() {
        Some(re) => !hosts.is_empty() && hosts.iter().all(|host| re.is_match(host)),
        None => false,
    }
}
