//! Shape normalization: coerces loosely-typed Compose shorthand into the
//! canonical typed model, and renders the model back to a canonical tree.
//!
//! Every function here is total on loosely-typed input: unexpected shapes
//! degrade to empty/default values instead of failing. The parser calls
//! [`document_from_tree`] as its final stage; the codec calls
//! [`document_to_tree`] before emission.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::model::{
    BuildSpec, ComposeDocument, Condition, Deploy, DeployResources, DependsOn, HealthCheck, Ipam,
    IpamPool, NetworkAttachment, PortMapping, Position, Protocol, Resource, ResourceSpec, Service,
    VolumeMount,
};

/// Service keys consumed by the typed model; everything else is pass-through.
const SERVICE_KEYS: &[&str] = &[
    "image",
    "build",
    "container_name",
    "command",
    "entrypoint",
    "user",
    "working_dir",
    "restart",
    "privileged",
    "ports",
    "environment",
    "env_file",
    "depends_on",
    "networks",
    "volumes",
    "labels",
    "healthcheck",
    "deploy",
    "profiles",
];

const RESOURCE_KEYS: &[&str] = &[
    "driver",
    "external",
    "name",
    "labels",
    "driver_opts",
    "ipam",
    "file",
    "content",
];

const DOCUMENT_KEYS: &[&str] = &["name", "services", "networks", "volumes", "secrets", "configs"];

/// Coerces a scalar-or-list value into a list of strings.
///
/// `null`/missing and unrecognized shapes become the empty list; a bare
/// scalar becomes a one-element list.
pub fn normalize_string_list(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(other).map(|s| vec![s]).unwrap_or_default(),
        None => Vec::new(),
    }
}

/// Coerces a map-or-`K=V`-list value into an ordered string map.
///
/// List entries without `=` get an empty value; duplicate keys keep the last
/// occurrence (last write wins).
pub fn normalize_string_map(value: Option<&JsonValue>) -> IndexMap<String, String> {
    let mut out = IndexMap::new();
    match value {
        Some(JsonValue::Object(map)) => {
            for (key, entry) in map {
                out.insert(key.clone(), scalar_to_string(entry).unwrap_or_default());
            }
        }
        Some(JsonValue::Array(items)) => {
            for item in items {
                let Some(text) = scalar_to_string(item) else {
                    continue;
                };
                match text.split_once('=') {
                    Some((key, val)) => out.insert(key.to_string(), val.to_string()),
                    None => out.insert(text, String::new()),
                };
            }
        }
        _ => {}
    }
    out
}

/// Coerces `depends_on` shorthand into the canonical condition map.
///
/// List form implies `service_started`; map form reads `condition` and keeps
/// unrecognized keys in `extra`. Key order gives the UI-facing name list.
pub fn normalize_depends_on(value: Option<&JsonValue>) -> IndexMap<String, DependsOn> {
    let mut out = IndexMap::new();
    match value {
        Some(JsonValue::Array(items)) => {
            for item in items {
                if let Some(name) = scalar_to_string(item) {
                    out.insert(name, DependsOn::default());
                }
            }
        }
        Some(JsonValue::Object(map)) => {
            for (name, entry) in map {
                let mut spec = DependsOn::default();
                if let Some(entry_map) = entry.as_object() {
                    for (key, val) in entry_map {
                        if key == "condition" {
                            spec.condition = val.as_str().map(Condition::parse).unwrap_or_default();
                        } else {
                            spec.extra.insert(key.clone(), val.clone());
                        }
                    }
                }
                out.insert(name.clone(), spec);
            }
        }
        _ => {}
    }
    out
}

/// Coerces service `networks` shorthand into attachment records.
pub fn normalize_network_attachments(value: Option<&JsonValue>) -> Vec<NetworkAttachment> {
    let mut out = Vec::new();
    match value {
        Some(JsonValue::Array(items)) => {
            for item in items {
                if let Some(name) = scalar_to_string(item) {
                    out.push(NetworkAttachment {
                        name,
                        ..Default::default()
                    });
                }
            }
        }
        Some(JsonValue::Object(map)) => {
            for (name, entry) in map {
                let mut attachment = NetworkAttachment {
                    name: name.clone(),
                    ..Default::default()
                };
                if let Some(entry_map) = entry.as_object() {
                    for (key, val) in entry_map {
                        if key == "aliases" {
                            attachment.aliases = normalize_string_list(Some(val));
                        } else {
                            attachment.extra.insert(key.clone(), val.clone());
                        }
                    }
                }
                out.push(attachment);
            }
        }
        _ => {}
    }
    out
}

/// Parses one port entry: number, `[ip:]published:target[/proto]` string, or
/// long-form map. Returns `None` for shapes with no usable target.
pub fn normalize_port(value: &JsonValue) -> Option<PortMapping> {
    match value {
        JsonValue::Number(n) => Some(PortMapping {
            target: n.to_string(),
            ..Default::default()
        }),
        JsonValue::String(text) => parse_port_shorthand(text),
        JsonValue::Object(map) => {
            let target = map.get("target").and_then(scalar_to_string)?;
            Some(PortMapping {
                host_ip: map.get("host_ip").and_then(scalar_to_string),
                published: map.get("published").and_then(scalar_to_string),
                target,
                protocol: map
                    .get("protocol")
                    .and_then(|v| v.as_str())
                    .map(Protocol::parse)
                    .unwrap_or_default(),
            })
        }
        _ => None,
    }
}

fn parse_port_shorthand(text: &str) -> Option<PortMapping> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (spec, protocol) = match text.rsplit_once('/') {
        Some((spec, proto)) => (spec, Protocol::parse(proto)),
        None => (text, Protocol::Tcp),
    };

    let parts: Vec<&str> = spec.split(':').collect();
    let mapping = match parts.as_slice() {
        [target] => PortMapping {
            target: (*target).to_string(),
            protocol,
            ..Default::default()
        },
        [published, target] => PortMapping {
            published: Some((*published).to_string()),
            target: (*target).to_string(),
            protocol,
            ..Default::default()
        },
        // Three or more segments: the last two are published:target, the
        // rest is the host interface (possibly an IPv6 literal).
        [..] => {
            let target = parts[parts.len() - 1].to_string();
            let published = parts[parts.len() - 2].to_string();
            let host_ip = parts[..parts.len() - 2].join(":");
            PortMapping {
                host_ip: Some(host_ip),
                published: Some(published),
                target,
                protocol,
            }
        }
    };

    if mapping.target.is_empty() {
        return None;
    }
    Some(mapping)
}

/// Parses one volume entry: `[source:]target[:mode]` string or long-form map.
pub fn normalize_volume_mount(value: &JsonValue) -> Option<VolumeMount> {
    match value {
        JsonValue::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let parts: Vec<&str> = text.split(':').collect();
            let mount = match parts.as_slice() {
                [target] => VolumeMount {
                    source: None,
                    target: (*target).to_string(),
                    mode: None,
                },
                [source, target] => VolumeMount {
                    source: Some((*source).to_string()),
                    target: (*target).to_string(),
                    mode: None,
                },
                [source, target, mode, ..] => VolumeMount {
                    source: Some((*source).to_string()),
                    target: (*target).to_string(),
                    mode: Some((*mode).to_string()),
                },
                [] => return None,
            };
            if mount.target.is_empty() {
                return None;
            }
            Some(mount)
        }
        JsonValue::Object(map) => {
            let target = map.get("target").and_then(scalar_to_string)?;
            let mode = if map.get("read_only").and_then(|v| v.as_bool()).unwrap_or(false) {
                Some("ro".to_string())
            } else {
                None
            };
            Some(VolumeMount {
                source: map.get("source").and_then(scalar_to_string),
                target,
                mode,
            })
        }
        _ => None,
    }
}

/// Builds a normalized service from its raw tree. Total: non-mapping input
/// yields the default service.
pub fn normalize_service(value: &JsonValue) -> Service {
    let Some(map) = value.as_object() else {
        return Service::default();
    };

    let mut service = Service {
        image: map.get("image").and_then(scalar_to_string),
        build: map.get("build").map(normalize_build),
        container_name: map.get("container_name").and_then(scalar_to_string),
        command: map.get("command").cloned(),
        entrypoint: map.get("entrypoint").cloned(),
        user: map.get("user").and_then(scalar_to_string),
        working_dir: map.get("working_dir").and_then(scalar_to_string),
        restart: map.get("restart").and_then(scalar_to_string),
        privileged: map.get("privileged").and_then(|v| v.as_bool()).unwrap_or(false),
        environment: normalize_string_map(map.get("environment")),
        env_file: normalize_string_list(map.get("env_file")),
        depends_on: normalize_depends_on(map.get("depends_on")),
        networks: normalize_network_attachments(map.get("networks")),
        labels: normalize_string_map(map.get("labels")),
        healthcheck: map.get("healthcheck").and_then(normalize_healthcheck),
        deploy: map.get("deploy").and_then(normalize_deploy),
        profiles: normalize_string_list(map.get("profiles")),
        position: map.get("_position").and_then(normalize_position),
        ..Default::default()
    };

    if let Some(JsonValue::Array(items)) = map.get("ports") {
        service.ports = items.iter().filter_map(normalize_port).collect();
    }
    if let Some(JsonValue::Array(items)) = map.get("volumes") {
        service.volumes = items.iter().filter_map(normalize_volume_mount).collect();
    }

    for (key, val) in map {
        if SERVICE_KEYS.contains(&key.as_str()) || key.starts_with('_') {
            continue;
        }
        service.extra.insert(key.clone(), val.clone());
    }

    service
}

fn normalize_build(value: &JsonValue) -> BuildSpec {
    match value {
        JsonValue::String(context) => BuildSpec {
            context: Some(context.clone()),
            ..Default::default()
        },
        JsonValue::Object(map) => {
            let mut build = BuildSpec {
                context: map.get("context").and_then(scalar_to_string),
                dockerfile: map.get("dockerfile").and_then(scalar_to_string),
                args: normalize_string_map(map.get("args")),
                ..Default::default()
            };
            for (key, val) in map {
                if !matches!(key.as_str(), "context" | "dockerfile" | "args") {
                    build.extra.insert(key.clone(), val.clone());
                }
            }
            build
        }
        _ => BuildSpec::default(),
    }
}

fn normalize_healthcheck(value: &JsonValue) -> Option<HealthCheck> {
    let map = value.as_object()?;
    let mut check = HealthCheck {
        test: map.get("test").cloned(),
        interval: map.get("interval").and_then(scalar_to_string),
        timeout: map.get("timeout").and_then(scalar_to_string),
        retries: map.get("retries").and_then(|v| v.as_u64()),
        ..Default::default()
    };
    for (key, val) in map {
        if !matches!(key.as_str(), "test" | "interval" | "timeout" | "retries") {
            check.extra.insert(key.clone(), val.clone());
        }
    }
    Some(check)
}

fn normalize_deploy(value: &JsonValue) -> Option<Deploy> {
    let map = value.as_object()?;
    let resources = map
        .get("resources")
        .and_then(|v| v.as_object())
        .map(|res| DeployResources {
            limits: res.get("limits").and_then(normalize_resource_spec),
            reservations: res.get("reservations").and_then(normalize_resource_spec),
        })
        .unwrap_or_default();

    let mut deploy = Deploy {
        resources,
        ..Default::default()
    };
    for (key, val) in map {
        if key != "resources" {
            deploy.extra.insert(key.clone(), val.clone());
        }
    }
    Some(deploy)
}

fn normalize_resource_spec(value: &JsonValue) -> Option<ResourceSpec> {
    let map = value.as_object()?;
    Some(ResourceSpec {
        cpus: map.get("cpus").and_then(scalar_to_string),
        memory: map.get("memory").and_then(scalar_to_string),
    })
}

fn normalize_position(value: &JsonValue) -> Option<Position> {
    let map = value.as_object()?;
    Some(Position {
        x: map.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0),
        y: map.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0),
    })
}

/// Builds a normalized resource declaration. Non-mapping entries (a common
/// shorthand is a bare `null` under `volumes:`) become the empty declaration.
pub fn normalize_resource(value: &JsonValue) -> Resource {
    let Some(map) = value.as_object() else {
        return Resource::default();
    };

    let external = match map.get("external") {
        Some(JsonValue::Bool(flag)) => *flag,
        // Legacy long form: `external: {name: ...}`.
        Some(JsonValue::Object(_)) => true,
        _ => false,
    };
    let name = map
        .get("name")
        .and_then(scalar_to_string)
        .or_else(|| match map.get("external") {
            Some(JsonValue::Object(ext)) => ext.get("name").and_then(scalar_to_string),
            _ => None,
        });

    let mut resource = Resource {
        driver: map.get("driver").and_then(scalar_to_string),
        external,
        name,
        labels: normalize_string_map(map.get("labels")),
        driver_opts: normalize_string_map(map.get("driver_opts")),
        ipam: map.get("ipam").and_then(normalize_ipam),
        file: map.get("file").and_then(scalar_to_string),
        content: map.get("content").and_then(scalar_to_string),
        ..Default::default()
    };
    for (key, val) in map {
        if !RESOURCE_KEYS.contains(&key.as_str()) {
            resource.extra.insert(key.clone(), val.clone());
        }
    }
    resource
}

fn normalize_ipam(value: &JsonValue) -> Option<Ipam> {
    let map = value.as_object()?;
    let config = match map.get("config") {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let pool = item.as_object()?;
                let mut out = IpamPool {
                    subnet: pool.get("subnet").and_then(scalar_to_string),
                    ..Default::default()
                };
                for (key, val) in pool {
                    if key != "subnet" {
                        out.extra.insert(key.clone(), val.clone());
                    }
                }
                Some(out)
            })
            .collect(),
        _ => Vec::new(),
    };
    Some(Ipam { config })
}

/// Builds the normalized document from a raw tree. This is the document-level
/// normalize: every resource map exists afterward, and every entry is a
/// well-formed record.
pub fn document_from_tree(tree: &JsonValue) -> ComposeDocument {
    let mut document = ComposeDocument::new();
    let Some(map) = tree.as_object() else {
        return document;
    };

    document.project_name = map.get("name").and_then(scalar_to_string);
    if let Some(JsonValue::Object(services)) = map.get("services") {
        for (name, entry) in services {
            document.services.insert(name.clone(), normalize_service(entry));
        }
    }
    for (key, target) in [
        ("networks", &mut document.networks),
        ("volumes", &mut document.volumes),
        ("secrets", &mut document.secrets),
        ("configs", &mut document.configs),
    ] {
        if let Some(JsonValue::Object(entries)) = map.get(key) {
            for (name, entry) in entries {
                target.insert(name.clone(), normalize_resource(entry));
            }
        }
    }
    for (key, val) in map {
        if DOCUMENT_KEYS.contains(&key.as_str()) || key.starts_with('_') {
            continue;
        }
        document.extra.insert(key.clone(), val.clone());
    }

    document
}

// ---------------------------------------------------------------------------
// Canonical tree emission
// ---------------------------------------------------------------------------

/// Renders a document to its canonical tree: fixed top-level key order,
/// shorthand forms where nothing forces long form, no bookkeeping fields.
pub fn document_to_tree(document: &ComposeDocument) -> JsonValue {
    let mut root = JsonMap::new();
    if let Some(name) = &document.project_name {
        root.insert("name".to_string(), JsonValue::String(name.clone()));
    }

    let mut services = JsonMap::new();
    for (name, service) in &document.services {
        services.insert(name.clone(), service_to_tree(service));
    }
    root.insert("services".to_string(), JsonValue::Object(services));

    for (key, entries) in [
        ("networks", &document.networks),
        ("volumes", &document.volumes),
        ("secrets", &document.secrets),
        ("configs", &document.configs),
    ] {
        let mut out = JsonMap::new();
        for (name, resource) in entries {
            out.insert(name.clone(), resource_to_tree(resource));
        }
        root.insert(key.to_string(), JsonValue::Object(out));
    }

    for (key, val) in &document.extra {
        root.insert(key.clone(), val.clone());
    }

    JsonValue::Object(root)
}

fn service_to_tree(service: &Service) -> JsonValue {
    let mut out = JsonMap::new();

    if let Some(image) = &service.image {
        out.insert("image".to_string(), JsonValue::String(image.clone()));
    }
    if let Some(build) = &service.build {
        out.insert("build".to_string(), build_to_tree(build));
    }
    if let Some(name) = &service.container_name {
        out.insert("container_name".to_string(), JsonValue::String(name.clone()));
    }
    if let Some(command) = &service.command {
        out.insert("command".to_string(), command.clone());
    }
    if let Some(entrypoint) = &service.entrypoint {
        out.insert("entrypoint".to_string(), entrypoint.clone());
    }
    if let Some(user) = &service.user {
        out.insert("user".to_string(), JsonValue::String(user.clone()));
    }
    if let Some(dir) = &service.working_dir {
        out.insert("working_dir".to_string(), JsonValue::String(dir.clone()));
    }
    if let Some(restart) = &service.restart {
        out.insert("restart".to_string(), JsonValue::String(restart.clone()));
    }
    if service.privileged {
        out.insert("privileged".to_string(), JsonValue::Bool(true));
    }
    if !service.ports.is_empty() {
        let ports = service
            .ports
            .iter()
            .map(|p| JsonValue::String(p.shorthand()))
            .collect();
        out.insert("ports".to_string(), JsonValue::Array(ports));
    }
    if !service.environment.is_empty() {
        out.insert("environment".to_string(), string_map_to_tree(&service.environment));
    }
    if !service.env_file.is_empty() {
        out.insert("env_file".to_string(), string_list_to_tree(&service.env_file));
    }
    if !service.depends_on.is_empty() {
        out.insert("depends_on".to_string(), depends_on_to_tree(&service.depends_on));
    }
    if !service.networks.is_empty() {
        out.insert("networks".to_string(), attachments_to_tree(&service.networks));
    }
    if !service.volumes.is_empty() {
        let volumes = service
            .volumes
            .iter()
            .map(|m| JsonValue::String(m.shorthand()))
            .collect();
        out.insert("volumes".to_string(), JsonValue::Array(volumes));
    }
    if !service.labels.is_empty() {
        out.insert("labels".to_string(), string_map_to_tree(&service.labels));
    }
    if let Some(check) = &service.healthcheck {
        out.insert("healthcheck".to_string(), healthcheck_to_tree(check));
    }
    if let Some(deploy) = &service.deploy {
        out.insert("deploy".to_string(), deploy_to_tree(deploy));
    }
    if !service.profiles.is_empty() {
        out.insert("profiles".to_string(), string_list_to_tree(&service.profiles));
    }
    for (key, val) in &service.extra {
        out.insert(key.clone(), val.clone());
    }

    JsonValue::Object(out)
}

fn build_to_tree(build: &BuildSpec) -> JsonValue {
    let long_form = build.dockerfile.is_some() || !build.args.is_empty() || !build.extra.is_empty();
    if !long_form {
        if let Some(context) = &build.context {
            return JsonValue::String(context.clone());
        }
    }

    let mut out = JsonMap::new();
    if let Some(context) = &build.context {
        out.insert("context".to_string(), JsonValue::String(context.clone()));
    }
    if let Some(dockerfile) = &build.dockerfile {
        out.insert("dockerfile".to_string(), JsonValue::String(dockerfile.clone()));
    }
    if !build.args.is_empty() {
        out.insert("args".to_string(), string_map_to_tree(&build.args));
    }
    for (key, val) in &build.extra {
        out.insert(key.clone(), val.clone());
    }
    JsonValue::Object(out)
}

fn depends_on_to_tree(entries: &IndexMap<String, DependsOn>) -> JsonValue {
    if entries.values().all(DependsOn::is_shorthand) {
        let names = entries
            .keys()
            .map(|name| JsonValue::String(name.clone()))
            .collect();
        return JsonValue::Array(names);
    }

    let mut out = JsonMap::new();
    for (name, spec) in entries {
        let mut entry = JsonMap::new();
        entry.insert(
            "condition".to_string(),
            JsonValue::String(spec.condition.as_str().to_string()),
        );
        for (key, val) in &spec.extra {
            entry.insert(key.clone(), val.clone());
        }
        out.insert(name.clone(), JsonValue::Object(entry));
    }
    JsonValue::Object(out)
}

fn attachments_to_tree(attachments: &[NetworkAttachment]) -> JsonValue {
    let plain = attachments
        .iter()
        .all(|a| a.aliases.is_empty() && a.extra.is_empty());
    if plain {
        let names = attachments
            .iter()
            .map(|a| JsonValue::String(a.name.clone()))
            .collect();
        return JsonValue::Array(names);
    }

    let mut out = JsonMap::new();
    for attachment in attachments {
        let mut entry = JsonMap::new();
        if !attachment.aliases.is_empty() {
            entry.insert("aliases".to_string(), string_list_to_tree(&attachment.aliases));
        }
        for (key, val) in &attachment.extra {
            entry.insert(key.clone(), val.clone());
        }
        out.insert(attachment.name.clone(), JsonValue::Object(entry));
    }
    JsonValue::Object(out)
}

fn healthcheck_to_tree(check: &HealthCheck) -> JsonValue {
    let mut out = JsonMap::new();
    if let Some(test) = &check.test {
        out.insert("test".to_string(), test.clone());
    }
    if let Some(interval) = &check.interval {
        out.insert("interval".to_string(), JsonValue::String(interval.clone()));
    }
    if let Some(timeout) = &check.timeout {
        out.insert("timeout".to_string(), JsonValue::String(timeout.clone()));
    }
    if let Some(retries) = check.retries {
        out.insert("retries".to_string(), JsonValue::from(retries));
    }
    for (key, val) in &check.extra {
        out.insert(key.clone(), val.clone());
    }
    JsonValue::Object(out)
}

fn deploy_to_tree(deploy: &Deploy) -> JsonValue {
    let mut out = JsonMap::new();
    let mut resources = JsonMap::new();
    if let Some(limits) = &deploy.resources.limits {
        resources.insert("limits".to_string(), resource_spec_to_tree(limits));
    }
    if let Some(reservations) = &deploy.resources.reservations {
        resources.insert("reservations".to_string(), resource_spec_to_tree(reservations));
    }
    if !resources.is_empty() {
        out.insert("resources".to_string(), JsonValue::Object(resources));
    }
    for (key, val) in &deploy.extra {
        out.insert(key.clone(), val.clone());
    }
    JsonValue::Object(out)
}

fn resource_spec_to_tree(spec: &ResourceSpec) -> JsonValue {
    let mut out = JsonMap::new();
    if let Some(cpus) = &spec.cpus {
        out.insert("cpus".to_string(), JsonValue::String(cpus.clone()));
    }
    if let Some(memory) = &spec.memory {
        out.insert("memory".to_string(), JsonValue::String(memory.clone()));
    }
    JsonValue::Object(out)
}

fn resource_to_tree(resource: &Resource) -> JsonValue {
    let mut out = JsonMap::new();
    if let Some(driver) = &resource.driver {
        out.insert("driver".to_string(), JsonValue::String(driver.clone()));
    }
    if resource.external {
        out.insert("external".to_string(), JsonValue::Bool(true));
    }
    if let Some(name) = &resource.name {
        out.insert("name".to_string(), JsonValue::String(name.clone()));
    }
    if !resource.labels.is_empty() {
        out.insert("labels".to_string(), string_map_to_tree(&resource.labels));
    }
    if !resource.driver_opts.is_empty() {
        out.insert("driver_opts".to_string(), string_map_to_tree(&resource.driver_opts));
    }
    if let Some(ipam) = &resource.ipam {
        out.insert("ipam".to_string(), ipam_to_tree(ipam));
    }
    if let Some(file) = &resource.file {
        out.insert("file".to_string(), JsonValue::String(file.clone()));
    }
    if let Some(content) = &resource.content {
        out.insert("content".to_string(), JsonValue::String(content.clone()));
    }
    for (key, val) in &resource.extra {
        out.insert(key.clone(), val.clone());
    }
    JsonValue::Object(out)
}

fn ipam_to_tree(ipam: &Ipam) -> JsonValue {
    let mut out = JsonMap::new();
    if !ipam.config.is_empty() {
        let pools = ipam
            .config
            .iter()
            .map(|pool| {
                let mut entry = JsonMap::new();
                if let Some(subnet) = &pool.subnet {
                    entry.insert("subnet".to_string(), JsonValue::String(subnet.clone()));
                }
                for (key, val) in &pool.extra {
                    entry.insert(key.clone(), val.clone());
                }
                JsonValue::Object(entry)
            })
            .collect();
        out.insert("config".to_string(), JsonValue::Array(pools));
    }
    JsonValue::Object(out)
}

fn string_list_to_tree(items: &[String]) -> JsonValue {
    JsonValue::Array(items.iter().map(|s| JsonValue::String(s.clone())).collect())
}

fn string_map_to_tree(map: &IndexMap<String, String>) -> JsonValue {
    let mut out = JsonMap::new();
    for (key, val) in map {
        out.insert(key.clone(), JsonValue::String(val.clone()));
    }
    JsonValue::Object(out)
}

/// Converts a scalar tree node to a string. Objects and arrays yield `None`.
pub fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
