use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexSet;
use log::debug;

use crate::error::{Result, RunCostError};

/// A GitHub repository identified as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    owner: String,
    name: String,
}

impl Repository {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File-system safe form, `owner_name`.
    pub fn slug(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl FromStr for Repository {
    type Err = RunCostError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        match trimmed.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(RunCostError::Repository(trimmed.to_string())),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Ordered set of repositories to fetch.
///
/// Order is the order of first appearance: command-line arguments first, then
/// the list file. Repeats are dropped.
#[derive(Debug, Default)]
pub struct Worklist {
    repos: IndexSet<Repository>,
}

impl Worklist {
    pub fn build(args: &[String], list_file: Option<&Path>) -> Result<Self> {
        let mut worklist = Self::default();

        for arg in args {
            worklist.push(arg.parse()?);
        }

        if let Some(path) = list_file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                RunCostError::Config(format!(
                    "Failed to read repository list {}: {e}",
                    path.display()
                ))
            })?;
            for repo in parse_list(&contents)? {
                worklist.push(repo);
            }
        }

        if worklist.is_empty() {
            return Err(RunCostError::Config(
                "no repositories given; pass --repo or --repos-file".into(),
            ));
        }

        Ok(worklist)
    }

    fn push(&mut self, repo: Repository) {
        if !self.repos.insert(repo.clone()) {
            debug!("Ignoring duplicate repository {repo}");
        }
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Repository> {
        self.repos.iter().cloned().collect()
    }
}

/// Parses a repository list: one per line, blank lines and `#` comments ignored.
pub fn parse_list(contents: &str) -> Result<Vec<Repository>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::parse::<Repository>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_repository() {
        let repo: Repository = "octo-org/hello-world".parse().unwrap();

        assert_eq!(repo.owner(), "octo-org");
        assert_eq!(repo.name(), "hello-world");
        assert_eq!(repo.to_string(), "octo-org/hello-world");
        assert_eq!(repo.slug(), "octo-org_hello-world");
    }

    #[test]
    fn test_invalid_repository_paths() {
        for bad in ["invalid-path", "owner/", "/repo", "owner/repo/extra", ""] {
            let result = bad.parse::<Repository>();
            assert!(result.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_parse_list_skips_comments_and_blanks() {
        let repos = parse_list("# platform\nacme/api\n\n   acme/web  \n# acme/old\n").unwrap();

        let names: Vec<String> = repos.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["acme/api", "acme/web"]);
    }

    #[test]
    fn test_worklist_keeps_first_occurrence_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "acme/web\nacme/api\nacme/infra").unwrap();

        let args = vec!["acme/api".to_string(), "acme/cli".to_string()];
        let worklist = Worklist::build(&args, Some(file.path())).unwrap();

        let names: Vec<String> = worklist.to_vec().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["acme/api", "acme/cli", "acme/web", "acme/infra"]);
    }

    #[test]
    fn test_empty_worklist_is_config_error() {
        let file = NamedTempFile::new().unwrap();

        let result = Worklist::build(&[], Some(file.path()));

        assert!(matches!(result, Err(RunCostError::Config(_))));
    }

    #[test]
    fn test_missing_list_file_is_config_error() {
        let result = Worklist::build(&[], Some(Path::new("/nonexistent/repos.txt")));

        assert!(matches!(result, Err(RunCostError::Config(_))));
    }
}
