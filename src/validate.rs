//! Structural and cross-reference validation of a normalized document.
//!
//! Pure and total: validation never fails and never blocks serialization.
//! Issues come back in discovery order (services in map order, rules in a
//! fixed order per service) with no de-duplication across rules.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{
    ComposeDocument, EntityKind, IssueSeverity, PortMapping, Service, ValidationIssue,
};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("name pattern is valid"))
}

/// Runs every validation rule against the document.
pub fn validate(document: &ComposeDocument) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (name, service) in &document.services {
        check_name(name, &mut issues);
        check_image_or_build(name, service, &mut issues);
        check_container_name(name, service, document, &mut issues);
        check_port_conflicts(name, service, document, &mut issues);
        check_network_references(name, service, document, &mut issues);
        check_volume_references(name, service, document, &mut issues);
        check_depends_on(name, service, document, &mut issues);
    }

    issues
}

fn service_error(name: &str, message: String) -> ValidationIssue {
    ValidationIssue {
        severity: IssueSeverity::Error,
        entity_kind: EntityKind::Service,
        entity_name: name.to_string(),
        message,
    }
}

fn service_warning(name: &str, message: String) -> ValidationIssue {
    ValidationIssue {
        severity: IssueSeverity::Warning,
        entity_kind: EntityKind::Service,
        entity_name: name.to_string(),
        message,
    }
}

fn check_name(name: &str, issues: &mut Vec<ValidationIssue>) {
    if !name_pattern().is_match(name) {
        issues.push(service_error(
            name,
            format!("Service name '{name}' contains characters outside [A-Za-z0-9._-]"),
        ));
    }
}

fn check_image_or_build(name: &str, service: &Service, issues: &mut Vec<ValidationIssue>) {
    if service.image.is_none() && service.build.is_none() {
        issues.push(service_error(name, "Missing image or build context".to_string()));
    }
}

fn check_container_name(
    name: &str,
    service: &Service,
    document: &ComposeDocument,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(container_name) = &service.container_name else {
        return;
    };
    let shared = document
        .services
        .iter()
        .any(|(other_name, other)| {
            other_name != name && other.container_name.as_deref() == Some(container_name)
        });
    if shared {
        issues.push(service_error(
            name,
            format!("Container name '{container_name}' is used by more than one service"),
        ));
    }
}

fn check_port_conflicts(
    name: &str,
    service: &Service,
    document: &ComposeDocument,
    issues: &mut Vec<ValidationIssue>,
) {
    // Comparison is host-side only; container-side collisions are fine.
    let mut reported: Vec<&str> = Vec::new();
    for mapping in &service.ports {
        let Some(published) = mapping.published.as_deref() else {
            continue;
        };
        if reported.contains(&published) {
            continue;
        }
        let conflict = document.services.iter().any(|(other_name, other)| {
            other_name != name && publishes(other, published, mapping)
        });
        if conflict {
            reported.push(published);
            issues.push(service_error(
                name,
                format!("Host port {published} is already used by another service"),
            ));
        }
    }
}

fn publishes(service: &Service, published: &str, reference: &PortMapping) -> bool {
    service.ports.iter().any(|mapping| {
        mapping.published.as_deref() == Some(published) && mapping.protocol == reference.protocol
    })
}

fn check_network_references(
    name: &str,
    service: &Service,
    document: &ComposeDocument,
    issues: &mut Vec<ValidationIssue>,
) {
    for attachment in &service.networks {
        if !document.networks.contains_key(&attachment.name) {
            issues.push(service_warning(
                name,
                format!(
                    "Network '{}' is not declared in the networks section",
                    attachment.name
                ),
            ));
        }
    }
}

fn check_volume_references(
    name: &str,
    service: &Service,
    document: &ComposeDocument,
    issues: &mut Vec<ValidationIssue>,
) {
    for mount in &service.volumes {
        let Some(source) = &mount.source else {
            continue; // anonymous volume
        };
        if mount.source_is_path() {
            continue;
        }
        if !document.volumes.contains_key(source) {
            issues.push(service_warning(
                name,
                format!("Volume '{source}' is not declared in the volumes section"),
            ));
        }
    }
}

fn check_depends_on(
    name: &str,
    service: &Service,
    document: &ComposeDocument,
    issues: &mut Vec<ValidationIssue>,
) {
    for dependency in service.depends_on.keys() {
        if !document.services.contains_key(dependency) {
            issues.push(service_error(
                name,
                format!("Dependency '{dependency}' not found among declared services"),
            ));
        }
    }
}
