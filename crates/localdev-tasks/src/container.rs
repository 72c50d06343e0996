//! Locating a project's container

use regex::Regex;
use tracing::{debug, warn};

use localdev_core::Project;
use localdev_docker::{Container, ContainerRuntime, DockerError};

/// Result of looking for a project's container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerLookup {
    /// Exactly one running container matches
    Found(Container),
    /// No running container matches
    Missing,
    /// Several containers match; none is picked
    Ambiguous(Vec<String>),
}

/// Name pattern for compose-managed containers of `name`
///
/// Matches `<prefix>_<name>_<n>` and `<prefix>-<name>-<n>`, with an optional
/// leading slash as reported by the engine API.
pub fn container_name_pattern(name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^/?([A-Za-z0-9\-]+)?[_-]{}[_-]\d+$",
        regex::escape(name)
    ))
}

/// Find the single running container belonging to `project`
pub async fn find_project_container(
    runtime: &dyn ContainerRuntime,
    project: &Project,
) -> Result<ContainerLookup, DockerError> {
    let name = project.display_name();
    let pattern = container_name_pattern(name).map_err(|e| DockerError::Parse {
        what: format!("container name pattern for '{}'", name),
        message: e.to_string(),
    })?;

    let mut matches: Vec<Container> = runtime
        .list_containers()
        .await?
        .into_iter()
        .filter(|c| c.names.iter().any(|n| pattern.is_match(n)))
        .collect();

    debug!(project = %project.key, count = matches.len(), "container lookup");

    match matches.len() {
        0 => Ok(ContainerLookup::Missing),
        1 => Ok(matches.pop().map_or(ContainerLookup::Missing, ContainerLookup::Found)),
        _ => {
            let ids: Vec<String> = matches.iter().map(|c| c.short_id().to_string()).collect();
            warn!(project = %project.key, ?ids, "multiple containers match, skipping health check");
            Ok(ContainerLookup::Ambiguous(ids))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localdev_docker::MockRuntime;

    #[test]
    fn test_pattern_matches_compose_names() {
        let re = container_name_pattern("api").unwrap();
        assert!(re.is_match("backend_api_1"));
        assert!(re.is_match("/backend_api_1"));
        assert!(re.is_match("backend-api-2"));
        assert!(re.is_match("my-stack-api-10"));
        assert!(!re.is_match("backend_api"));
        assert!(!re.is_match("backend_apix_1"));
        assert!(!re.is_match("api_1"));
    }

    #[test]
    fn test_pattern_escapes_name() {
        let re = container_name_pattern("a.b").unwrap();
        assert!(re.is_match("x_a.b_1"));
        assert!(!re.is_match("x_aXb_1"));
    }

    #[tokio::test]
    async fn test_find_single_container() {
        let runtime = MockRuntime::new()
            .with_container(Container::new("111", "backend_db_1"))
            .with_container(Container::new("222", "backend_api_1"));
        let project = Project::new("api", "api");

        let found = find_project_container(&runtime, &project).await.unwrap();
        assert_eq!(found, ContainerLookup::Found(Container::new("222", "backend_api_1")));
    }

    #[tokio::test]
    async fn test_missing_and_ambiguous() {
        let runtime = MockRuntime::new()
            .with_container(Container::new("111", "one_web_1"))
            .with_container(Container::new("222", "two-web-1"));

        let web = Project::new("web", "web");
        assert!(matches!(
            find_project_container(&runtime, &web).await.unwrap(),
            ContainerLookup::Ambiguous(ids) if ids.len() == 2
        ));

        let db = Project::new("db", "db");
        assert_eq!(
            find_project_container(&runtime, &db).await.unwrap(),
            ContainerLookup::Missing
        );
    }
}
