//! Typed Compose document model shared by the parser, validator, suggestion
//! engine, and serializer.
//!
//! Loosely-typed Compose shorthand (list-or-map fields, `K=V` lists, port
//! strings) is coerced into these canonical shapes once, at the parse
//! boundary (see `normalize`); nothing deeper in the pipeline branches on
//! input shape. Keys the model does not understand are carried in `extra`
//! maps so they survive a parse/serialize round trip.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Order-preserving pass-through map for keys the typed model does not cover.
pub type ExtraMap = IndexMap<String, JsonValue>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Root of a normalized Compose project.
///
/// Every resource map is always present (possibly empty); this is guaranteed
/// by construction rather than checked.
pub struct ComposeDocument {
    /// Logical project identifier (the top-level `name` key).
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub services: IndexMap<String, Service>,
    #[serde(default)]
    pub networks: IndexMap<String, Resource>,
    #[serde(default)]
    pub volumes: IndexMap<String, Resource>,
    #[serde(default)]
    pub secrets: IndexMap<String, Resource>,
    #[serde(default)]
    pub configs: IndexMap<String, Resource>,
    /// Unmodeled top-level keys (`version`, `x-*` extensions, ...).
    #[serde(default)]
    pub extra: ExtraMap,
}

impl ComposeDocument {
    /// Creates an empty project with all resource maps present.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to one of the four named-resource maps.
    pub fn resources(&self, kind: ResourceKind) -> &IndexMap<String, Resource> {
        match kind {
            ResourceKind::Network => &self.networks,
            ResourceKind::Volume => &self.volumes,
            ResourceKind::Secret => &self.secrets,
            ResourceKind::Config => &self.configs,
        }
    }

    /// Mutable access to one of the four named-resource maps.
    pub fn resources_mut(&mut self, kind: ResourceKind) -> &mut IndexMap<String, Resource> {
        match kind {
            ResourceKind::Network => &mut self.networks,
            ResourceKind::Volume => &mut self.volumes,
            ResourceKind::Secret => &mut self.secrets,
            ResourceKind::Config => &mut self.configs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// One container definition. Identity is its key in `ComposeDocument::services`.
pub struct Service {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub build: Option<BuildSpec>,
    #[serde(default)]
    pub container_name: Option<String>,
    /// String or list form, kept as parsed.
    #[serde(default)]
    pub command: Option<JsonValue>,
    /// String or list form, kept as parsed.
    #[serde(default)]
    pub entrypoint: Option<JsonValue>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub restart: Option<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Canonical map form; `K=V` list input is converted, last write wins.
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub env_file: Vec<String>,
    /// Canonical map form; list input implies `service_started`.
    #[serde(default)]
    pub depends_on: IndexMap<String, DependsOn>,
    #[serde(default)]
    pub networks: Vec<NetworkAttachment>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    #[serde(default)]
    pub healthcheck: Option<HealthCheck>,
    #[serde(default)]
    pub deploy: Option<Deploy>,
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Layout hint for graph views, read from the `_position` bookkeeping
    /// key. Never serialized to YAML.
    #[serde(default)]
    pub position: Option<Position>,
    /// Unmodeled service keys (`cap_add`, `dns`, `secrets`, ...).
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Service `build` block. Scalar string input becomes `context`.
pub struct BuildSpec {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub dockerfile: Option<String>,
    #[serde(default)]
    pub args: IndexMap<String, String>,
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Transport protocol of a published port.
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl Protocol {
    /// Parses a protocol suffix, defaulting to TCP on unknown input.
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "udp" => Protocol::Udp,
            "sctp" => Protocol::Sctp,
            _ => Protocol::Tcp,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// One port mapping. `published` is the host side and may be absent for
/// container-only exposure; both sides stay strings so ranges round-trip.
pub struct PortMapping {
    #[serde(default)]
    pub host_ip: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    pub target: String,
    #[serde(default)]
    pub protocol: Protocol,
}

impl PortMapping {
    /// Renders the canonical short syntax `[ip:]published:target[/proto]`.
    pub fn shorthand(&self) -> String {
        let mut out = String::new();
        if let Some(ip) = &self.host_ip {
            out.push_str(ip);
            out.push(':');
        }
        if let Some(published) = &self.published {
            out.push_str(published);
            out.push(':');
        }
        out.push_str(&self.target);
        if self.protocol != Protocol::Tcp {
            out.push('/');
            out.push_str(self.protocol.as_str());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Startup condition of a `depends_on` entry.
pub enum Condition {
    #[default]
    ServiceStarted,
    ServiceHealthy,
    ServiceCompletedSuccessfully,
}

impl Condition {
    /// Parses a condition string, falling back to `service_started`.
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "service_healthy" => Condition::ServiceHealthy,
            "service_completed_successfully" => Condition::ServiceCompletedSuccessfully,
            _ => Condition::ServiceStarted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::ServiceStarted => "service_started",
            Condition::ServiceHealthy => "service_healthy",
            Condition::ServiceCompletedSuccessfully => "service_completed_successfully",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Canonical `depends_on` entry. Unrecognized long-form keys land in `extra`
/// (they are not part of the Compose spec and the suggestion engine flags
/// them).
pub struct DependsOn {
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub extra: ExtraMap,
}

impl DependsOn {
    /// True when the entry can be expressed as a bare name in list form.
    pub fn is_shorthand(&self) -> bool {
        self.condition == Condition::ServiceStarted && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Service-side network reference. `aliases` and `extra` only exist for
/// map-form input and force map-form output so they round-trip.
pub struct NetworkAttachment {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// One volume mount. `source: None` is an anonymous volume.
pub struct VolumeMount {
    #[serde(default)]
    pub source: Option<String>,
    pub target: String,
    #[serde(default)]
    pub mode: Option<String>,
}

impl VolumeMount {
    /// True when the source is a host path rather than a named volume.
    pub fn source_is_path(&self) -> bool {
        match &self.source {
            Some(source) => {
                source.starts_with('/')
                    || source.starts_with('.')
                    || source.starts_with('~')
                    || source.starts_with('$')
                    || source.contains('/')
                    || source.contains('\\')
            }
            None => false,
        }
    }

    /// Renders the canonical short syntax `[source:]target[:mode]`.
    pub fn shorthand(&self) -> String {
        let mut out = String::new();
        if let Some(source) = &self.source {
            out.push_str(source);
            out.push(':');
        }
        out.push_str(&self.target);
        if let Some(mode) = &self.mode {
            out.push(':');
            out.push_str(mode);
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Container health probe. `test` keeps its string-or-list input shape.
pub struct HealthCheck {
    #[serde(default)]
    pub test: Option<JsonValue>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub retries: Option<u64>,
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Deployment settings; only the resource envelope is modeled.
pub struct Deploy {
    #[serde(default)]
    pub resources: DeployResources,
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployResources {
    #[serde(default)]
    pub limits: Option<ResourceSpec>,
    #[serde(default)]
    pub reservations: Option<ResourceSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default)]
    pub cpus: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Canvas layout hint. Internal bookkeeping only; excluded from YAML output.
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Named resource declaration shared by networks, volumes, secrets, and
/// configs. Kind-specific fields stay `None`/empty for the other kinds.
///
/// When several of `file`/`content`/`external` are set on a secret or config,
/// consumers resolve them with precedence `content` > `file` > `external`;
/// the parser does not reject the combination.
pub struct Resource {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub external: bool,
    /// External resource name used when `external` is set.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: IndexMap<String, String>,
    /// Volume driver options.
    #[serde(default)]
    pub driver_opts: IndexMap<String, String>,
    /// Network address management block.
    #[serde(default)]
    pub ipam: Option<Ipam>,
    /// Secret/config source file.
    #[serde(default)]
    pub file: Option<String>,
    /// Inline secret/config content.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ipam {
    #[serde(default)]
    pub config: Vec<IpamPool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpamPool {
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub extra: ExtraMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// One of the four named-resource maps on a document.
pub enum ResourceKind {
    Network,
    Volume,
    Secret,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Entity an issue or suggestion is attributed to.
pub enum EntityKind {
    Service,
    Network,
    Volume,
    Secret,
    Config,
    /// Pipeline-level issues not tied to a declared entity.
    Parser,
}

impl From<ResourceKind> for EntityKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Network => EntityKind::Network,
            ResourceKind::Volume => EntityKind::Volume,
            ResourceKind::Secret => EntityKind::Secret,
            ResourceKind::Config => EntityKind::Config,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Service => "service",
            EntityKind::Network => "network",
            EntityKind::Volume => "volume",
            EntityKind::Secret => "secret",
            EntityKind::Config => "config",
            EntityKind::Parser => "parser",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Severity of a validation issue.
pub enum IssueSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Structural or cross-reference defect in an otherwise usable document.
/// Recomputed from scratch on every document change; never blocks export.
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub entity_kind: EntityKind,
    pub entity_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Advisory severity, ordered ascending for aggregation.
pub enum SuggestionSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionCategory {
    Security,
    Performance,
    Architecture,
    BestPractice,
    SpecCompliance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Non-blocking best-practice finding with an optional remediation hint.
pub struct Suggestion {
    /// Stable kebab-case rule identifier.
    pub id: String,
    pub category: SuggestionCategory,
    pub severity: SuggestionSeverity,
    pub entity_kind: EntityKind,
    pub entity_name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Remediation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Structured remediation hint: set `field` on the entity to `value`.
pub struct Remediation {
    pub field: String,
    pub value: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_shorthand_renders_all_segments() {
        let mapping = PortMapping {
            host_ip: Some("127.0.0.1".to_string()),
            published: Some("8080".to_string()),
            target: "80".to_string(),
            protocol: Protocol::Udp,
        };
        assert_eq!(mapping.shorthand(), "127.0.0.1:8080:80/udp");
    }

    #[test]
    fn port_shorthand_omits_default_protocol_and_host() {
        let mapping = PortMapping {
            host_ip: None,
            published: None,
            target: "9000".to_string(),
            protocol: Protocol::Tcp,
        };
        assert_eq!(mapping.shorthand(), "9000");
    }

    #[test]
    fn path_sources_are_distinguished_from_named_volumes() {
        let named = VolumeMount {
            source: Some("pgdata".to_string()),
            target: "/var/lib/postgresql/data".to_string(),
            mode: None,
        };
        let relative = VolumeMount {
            source: Some("./src".to_string()),
            target: "/app".to_string(),
            mode: Some("ro".to_string()),
        };
        let anonymous = VolumeMount {
            source: None,
            target: "/tmp/cache".to_string(),
            mode: None,
        };
        assert!(!named.source_is_path());
        assert!(relative.source_is_path());
        assert!(!anonymous.source_is_path());
        assert_eq!(relative.shorthand(), "./src:/app:ro");
    }

    #[test]
    fn suggestion_severities_rank_ascending() {
        assert!(SuggestionSeverity::Info < SuggestionSeverity::Low);
        assert!(SuggestionSeverity::Medium < SuggestionSeverity::High);
        assert!(SuggestionSeverity::High < SuggestionSeverity::Critical);
    }

    #[test]
    fn unknown_condition_falls_back_to_started() {
        assert_eq!(Condition::parse("service_healthy"), Condition::ServiceHealthy);
        assert_eq!(Condition::parse("restarted"), Condition::ServiceStarted);
    }
}
