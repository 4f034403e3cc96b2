//! Heuristic best-practice and security review of a normalized document.
//!
//! Advisory only: suggestions never block validation or export. Rules are
//! independent and may fire several times per entity; aggregation helpers
//! summarize per-entity counts and worst severity for UI badges.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::model::{
    ComposeDocument, Condition, EntityKind, Remediation, Service, Suggestion, SuggestionCategory,
    SuggestionSeverity,
};

const SENSITIVE_KEYWORDS: &[&str] = &["PASSWORD", "SECRET", "KEY", "TOKEN", "CREDENTIAL"];

/// Runs every suggestion rule against the document.
pub fn suggest(document: &ComposeDocument) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for (name, service) in &document.services {
        check_restart_policy(name, service, &mut suggestions);
        check_depends_on_keys(name, service, &mut suggestions);
        check_image_tag(name, service, &mut suggestions);
        check_healthcheck(name, service, &mut suggestions);
        check_user(name, service, &mut suggestions);
        check_privileged(name, service, &mut suggestions);
        check_resource_limits(name, service, &mut suggestions);
        check_dependency_health(name, service, document, &mut suggestions);
        check_sensitive_environment(name, service, &mut suggestions);
    }
    check_orphaned_volumes(document, &mut suggestions);

    suggestions
}

/// Suggestions per entity, in first-seen entity order.
pub fn count_by_entity(suggestions: &[Suggestion]) -> IndexMap<(EntityKind, String), usize> {
    let mut counts = IndexMap::new();
    for suggestion in suggestions {
        *counts
            .entry((suggestion.entity_kind, suggestion.entity_name.clone()))
            .or_insert(0) += 1;
    }
    counts
}

/// Worst severity per entity, in first-seen entity order.
pub fn highest_severity_by_entity(
    suggestions: &[Suggestion],
) -> IndexMap<(EntityKind, String), SuggestionSeverity> {
    let mut worst: IndexMap<(EntityKind, String), SuggestionSeverity> = IndexMap::new();
    for suggestion in suggestions {
        let key = (suggestion.entity_kind, suggestion.entity_name.clone());
        match worst.get_mut(&key) {
            Some(current) => {
                if suggestion.severity > *current {
                    *current = suggestion.severity;
                }
            }
            None => {
                worst.insert(key, suggestion.severity);
            }
        }
    }
    worst
}

fn service_suggestion(
    id: &str,
    category: SuggestionCategory,
    severity: SuggestionSeverity,
    name: &str,
    message: String,
) -> Suggestion {
    Suggestion {
        id: id.to_string(),
        category,
        severity,
        entity_kind: EntityKind::Service,
        entity_name: name.to_string(),
        message,
        action: None,
    }
}

/// One-off services are expected to exit; missing probes and restart
/// policies are normal for them.
fn is_one_off(service: &Service) -> bool {
    match service.restart.as_deref() {
        Some("no") => true,
        None => service.command.is_some(),
        Some(_) => false,
    }
}

fn check_restart_policy(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    if service.restart.is_none() {
        let mut suggestion = service_suggestion(
            "missing-restart-policy",
            SuggestionCategory::Architecture,
            SuggestionSeverity::Critical,
            name,
            format!("Service '{name}' has no restart policy; it will stay down after a crash"),
        );
        suggestion.action = Some(Remediation {
            field: "restart".to_string(),
            value: JsonValue::String("unless-stopped".to_string()),
        });
        suggestions.push(suggestion);
    }
}

fn check_depends_on_keys(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    for (dependency, spec) in &service.depends_on {
        if spec.extra.is_empty() {
            continue;
        }
        let keys: Vec<&str> = spec.extra.keys().map(String::as_str).collect();
        suggestions.push(service_suggestion(
            "depends-on-unknown-keys",
            SuggestionCategory::SpecCompliance,
            SuggestionSeverity::Medium,
            name,
            format!(
                "depends_on entry '{dependency}' carries keys not in the Compose spec: {}",
                keys.join(", ")
            ),
        ));
    }
}

fn check_image_tag(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    let Some(image) = &service.image else {
        return;
    };
    // The tag lives after the last path segment; a colon earlier in the
    // reference may belong to a registry port.
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    let tag = last_segment.split_once(':').map(|(_, tag)| tag);
    if matches!(tag, None | Some("latest")) {
        suggestions.push(service_suggestion(
            "latest-image-tag",
            SuggestionCategory::BestPractice,
            SuggestionSeverity::Low,
            name,
            format!("Image '{image}' floats on the latest tag; pin a version for reproducible deploys"),
        ));
    }
}

fn check_healthcheck(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    if service.healthcheck.is_some() || service.restart.is_none() || is_one_off(service) {
        return;
    }
    suggestions.push(service_suggestion(
        "missing-healthcheck",
        SuggestionCategory::Performance,
        SuggestionSeverity::Low,
        name,
        format!("Service '{name}' restarts automatically but has no healthcheck to detect hangs"),
    ));
}

fn check_user(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    if service.user.is_none() && !service.privileged {
        suggestions.push(service_suggestion(
            "missing-user",
            SuggestionCategory::Security,
            SuggestionSeverity::Medium,
            name,
            format!("Service '{name}' runs as the image default (likely root); set a user"),
        ));
    }
}

fn check_privileged(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    if service.privileged {
        suggestions.push(service_suggestion(
            "privileged-container",
            SuggestionCategory::Security,
            SuggestionSeverity::High,
            name,
            format!("Service '{name}' is privileged and has full access to the host"),
        ));
    }
}

fn check_resource_limits(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    let has_limits = service
        .deploy
        .as_ref()
        .is_some_and(|deploy| deploy.resources.limits.is_some());
    if !has_limits {
        suggestions.push(service_suggestion(
            "missing-resource-limits",
            SuggestionCategory::Performance,
            SuggestionSeverity::Low,
            name,
            format!("Service '{name}' has no resource limits and can starve its neighbors"),
        ));
    }
}

fn check_dependency_health(
    name: &str,
    service: &Service,
    document: &ComposeDocument,
    suggestions: &mut Vec<Suggestion>,
) {
    for (dependency, spec) in &service.depends_on {
        if spec.condition != Condition::ServiceStarted {
            continue;
        }
        let Some(target) = document.services.get(dependency) else {
            continue; // the validator reports the missing service
        };
        if target.healthcheck.is_none() {
            suggestions.push(service_suggestion(
                "depends-on-unhealthy-target",
                SuggestionCategory::Architecture,
                SuggestionSeverity::Low,
                name,
                format!(
                    "'{name}' waits only for '{dependency}' to start, and '{dependency}' has no \
                     healthcheck; consider service_healthy with a probe"
                ),
            ));
        }
    }
}

fn check_sensitive_environment(name: &str, service: &Service, suggestions: &mut Vec<Suggestion>) {
    let hit = service.environment.iter().find(|(key, value)| {
        let key = key.to_ascii_uppercase();
        let value = value.to_ascii_uppercase();
        SENSITIVE_KEYWORDS
            .iter()
            .any(|keyword| key.contains(keyword) || value.contains(keyword))
    });
    // Fires once per service, however many variables match.
    if let Some((key, _)) = hit {
        suggestions.push(service_suggestion(
            "sensitive-env-value",
            SuggestionCategory::Security,
            SuggestionSeverity::Medium,
            name,
            format!(
                "Service '{name}' keeps sensitive-looking data in plain environment \
                 variables (e.g. '{key}'); use secrets instead"
            ),
        ));
    }
}

fn check_orphaned_volumes(document: &ComposeDocument, suggestions: &mut Vec<Suggestion>) {
    for volume_name in document.volumes.keys() {
        let referenced = document.services.values().any(|service| {
            service
                .volumes
                .iter()
                .any(|mount| mount.source.as_deref() == Some(volume_name.as_str()))
        });
        if !referenced {
            suggestions.push(Suggestion {
                id: "orphaned-volume".to_string(),
                category: SuggestionCategory::BestPractice,
                severity: SuggestionSeverity::Low,
                entity_kind: EntityKind::Volume,
                entity_name: volume_name.clone(),
                message: format!("Volume '{volume_name}' is declared but no service mounts it"),
                action: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{count_by_entity, highest_severity_by_entity, suggest};
    use crate::model::{EntityKind, SuggestionSeverity};
    use crate::normalize::document_from_tree;

    fn doc(tree: serde_json::Value) -> crate::model::ComposeDocument {
        document_from_tree(&tree)
    }

    #[test]
    fn missing_restart_is_the_only_critical_finding() {
        let document = doc(json!({"services": {"web": {"image": "nginx:1.25"}}}));
        let suggestions = suggest(&document);
        let critical: Vec<_> = suggestions
            .iter()
            .filter(|s| s.severity == SuggestionSeverity::Critical)
            .collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, "missing-restart-policy");
        assert_eq!(critical[0].entity_name, "web");
        assert!(critical[0].action.is_some());
    }

    #[test]
    fn latest_tag_fires_for_explicit_and_implicit_latest() {
        let document = doc(json!({
            "services": {
                "a": {"image": "nginx:latest"},
                "b": {"image": "nginx"},
                "c": {"image": "registry:5000/team/app:2.1"}
            }
        }));
        let suggestions = suggest(&document);
        let offenders: Vec<&str> = suggestions
            .iter()
            .filter(|s| s.id == "latest-image-tag")
            .map(|s| s.entity_name.as_str())
            .collect();
        assert_eq!(offenders, vec!["a", "b"]);
    }

    #[test]
    fn privileged_service_skips_user_rule_but_gets_flagged() {
        let document = doc(json!({
            "services": {"agent": {"image": "agent:1", "privileged": true, "restart": "always"}}
        }));
        let suggestions = suggest(&document);
        assert!(suggestions.iter().any(|s| s.id == "privileged-container"
            && s.severity == SuggestionSeverity::High));
        assert!(!suggestions.iter().any(|s| s.id == "missing-user"));
    }

    #[test]
    fn one_off_services_are_not_asked_for_healthchecks() {
        let document = doc(json!({
            "services": {
                "migrate": {"image": "app:1", "restart": "no", "command": "rake db:migrate"},
                "web": {"image": "app:1", "restart": "always"}
            }
        }));
        let suggestions = suggest(&document);
        let offenders: Vec<&str> = suggestions
            .iter()
            .filter(|s| s.id == "missing-healthcheck")
            .map(|s| s.entity_name.as_str())
            .collect();
        assert_eq!(offenders, vec!["web"]);
    }

    #[test]
    fn sensitive_environment_fires_once_per_service() {
        let document = doc(json!({
            "services": {
                "db": {
                    "image": "postgres:16",
                    "environment": {
                        "POSTGRES_PASSWORD": "hunter2",
                        "API_TOKEN": "abc",
                        "PGDATA": "/data"
                    }
                }
            }
        }));
        let hits: Vec<_> = suggest(&document)
            .into_iter()
            .filter(|s| s.id == "sensitive-env-value")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_name, "db");
    }

    #[test]
    fn started_condition_on_probeless_target_is_flagged() {
        let document = doc(json!({
            "services": {
                "web": {"image": "app:1", "depends_on": ["db"]},
                "db": {"image": "postgres:16"}
            }
        }));
        assert!(suggest(&document)
            .iter()
            .any(|s| s.id == "depends-on-unhealthy-target" && s.entity_name == "web"));
    }

    #[test]
    fn unused_volume_is_reported_as_volume_entity() {
        let document = doc(json!({
            "services": {"web": {"image": "nginx:1.25", "volumes": ["data:/var/lib"]}},
            "volumes": {"data": {}, "stale": {}}
        }));
        let orphans: Vec<_> = suggest(&document)
            .into_iter()
            .filter(|s| s.id == "orphaned-volume")
            .collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].entity_name, "stale");
        assert_eq!(orphans[0].entity_kind, EntityKind::Volume);
    }

    #[test]
    fn aggregation_helpers_count_and_rank() {
        let document = doc(json!({"services": {"web": {"image": "nginx"}}}));
        let suggestions = suggest(&document);
        let key = (EntityKind::Service, "web".to_string());

        let counts = count_by_entity(&suggestions);
        assert!(counts[&key] >= 2);

        let worst = highest_severity_by_entity(&suggestions);
        assert_eq!(worst[&key], SuggestionSeverity::Critical);
    }
}
