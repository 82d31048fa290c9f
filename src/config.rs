//! CLI configuration and argument parsing.

use std::fmt;
use std::time::Duration;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::gke::ClusterRef;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// GKE control plane and node pool upgrade and scaling CLI tool.
///
/// Each subcommand inspects the cluster once, acts at most once, and exits.
/// Long-running operations continue server-side; run the command again to
/// take the next step.
#[derive(Parser, Debug, Clone)]
#[command(name = "gkup")]
#[command(about = "GKE upgrade and node pool scaling CLI tool")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// Kubernetes context to use for node lookups
    #[arg(long, global = true, env = "KUBECONFIG_CONTEXT")]
    pub context: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "GKUP_LOG_LEVEL")]
    pub log_level: String,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty, env = "GKUP_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// GKE API endpoint
    #[arg(long, global = true, default_value = crate::gke::client::DEFAULT_ENDPOINT, env = "GKUP_CONTAINER_ENDPOINT")]
    pub container_endpoint: String,

    /// Compute Engine API endpoint
    #[arg(long, global = true, default_value = crate::compute::client::DEFAULT_ENDPOINT, env = "GKUP_COMPUTE_ENDPOINT")]
    pub compute_endpoint: String,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value = "60", env = "GKUP_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Target cluster.
#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct ClusterArgs {
    /// GCP project ID
    #[arg(long, env = "GKE_PROJECT_ID")]
    pub project: String,

    /// Cluster zone (e.g., us-central1-a)
    #[arg(long, env = "GKE_ZONE")]
    pub zone: String,

    /// Cluster name
    #[arg(long, env = "GKE_CLUSTER_ID")]
    pub cluster: String,
}

impl From<&ClusterArgs> for ClusterRef {
    fn from(args: &ClusterArgs) -> Self {
        ClusterRef::new(&args.project, &args.zone, &args.cluster)
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upgrade the control plane by at most one minor version
    #[command(after_help = r#"Examples:
  gkup upgrade-master --project my-project --zone us-central1-a --cluster prod
  GKE_FORCE_UPDATE=true gkup upgrade-master   Apply the upgrade instead of reporting it"#)]
    UpgradeMaster {
        #[command(flatten)]
        cluster: ClusterArgs,

        /// Apply an available upgrade (otherwise only report it)
        #[arg(long, env = "GKE_FORCE_UPDATE", action = ArgAction::SetTrue, value_parser = FalseyValueParser::new())]
        force: bool,
    },

    /// Report node pool versions and upgrade one pool toward the control plane
    UpgradeNodePool {
        #[command(flatten)]
        cluster: ClusterArgs,

        /// Node pool to upgrade; report only when omitted
        #[arg(long, env = "GKE_NODE_POOL_ID")]
        node_pool: Option<String>,
    },

    /// Add one node to a node pool
    Grow {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[arg(long, env = "GKE_NODE_POOL_ID")]
        node_pool: String,
    },

    /// Remove the cordoned nodes of a node pool
    Shrink {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[arg(long, env = "GKE_NODE_POOL_ID")]
        node_pool: String,
    },

    /// Create a one-node pool on the newest version
    CreateNodePool {
        #[command(flatten)]
        cluster: ClusterArgs,

        #[arg(long, env = "GKE_NODE_POOL_ID")]
        node_pool: String,

        /// Machine type (e.g., e2-standard-4) [default: service default]
        #[arg(long, env = "GKE_MACHINE_TYPE")]
        machine_type: Option<String>,
    },

    /// Print a node's external IP address
    NodeIp {
        /// GCP project ID
        #[arg(long, env = "GKE_PROJECT_ID")]
        project: String,

        /// Zone of the node's instance
        #[arg(long, env = "GKE_ZONE")]
        zone: String,

        /// Node hostname (instance name)
        #[arg(long, env = "HOSTNAME")]
        hostname: String,
    },
}

/// Remote API settings derived from CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub container_endpoint: String,
    pub compute_endpoint: String,
    pub request_timeout: Duration,
    pub context: Option<String>,
}

impl ApiConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            container_endpoint: args.container_endpoint.clone(),
            compute_endpoint: args.compute_endpoint.clone(),
            request_timeout: Duration::from_secs(args.request_timeout),
            context: args.context.clone(),
        }
    }
}
