//! Owner/repo discovery for GitHub-hosted build sources.
//!
//! Build repository descriptors coming from Azure DevOps service connections
//! are inconsistent about where the `owner/repo` identity lives, so several
//! places are probed in a fixed order.

use url::Url;

use crate::providers::azure::types::Repository;

const FULL_NAME_KEYS: [&str; 4] = ["fullName", "full_name", "repoFullName", "repositoryFullName"];

/// Resolves `owner/repo` for a repository descriptor.
///
/// Probes, in order: full-name style properties, a `/repos/<owner>/<repo>`
/// segment of `apiUrl` (or the descriptor URL when there is no `apiUrl`), the
/// path of `cloneUrl` without its `.git` suffix, and finally a `name` or `id`
/// that already contains a slash.
pub fn extract_owner_repo(repo: &Repository) -> Option<String> {
    if let Some(full_name) = FULL_NAME_KEYS
        .iter()
        .filter_map(|key| repo.property(key))
        .find(|value| value.contains('/'))
    {
        return Some(full_name.to_string());
    }

    let api_url = repo
        .property("apiUrl")
        .or_else(|| repo.url.as_deref().filter(|u| !u.trim().is_empty()));
    if let Some(owner_repo) = api_url.and_then(repos_segment) {
        return Some(owner_repo);
    }

    if let Some(path) = repo.property("cloneUrl").and_then(clone_path) {
        return Some(path);
    }

    [repo.name.as_deref(), repo.id.as_deref()]
        .into_iter()
        .flatten()
        .find(|value| value.contains('/'))
        .map(str::to_string)
}

/// First `/repos/<owner>/<repo>` occurrence in `url`, as `owner/repo`.
fn repos_segment(url: &str) -> Option<String> {
    url.match_indices("/repos/").find_map(|(idx, marker)| {
        let mut parts = url[idx + marker.len()..].splitn(3, '/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let name = parts.next().filter(|s| !s.is_empty())?;
        Some(format!("{owner}/{name}"))
    })
}

/// `owner/repo` from a clone URL such as `https://github.com/acme/app.git`.
fn clone_path(clone_url: &str) -> Option<String> {
    let raw_path = match Url::parse(clone_url) {
        Ok(url) => url.path().to_string(),
        // scp-like `git@github.com:acme/app.git`
        Err(_) => clone_url
            .split_once(':')
            .map_or(clone_url, |(_, path)| path)
            .to_string(),
    };

    let path = raw_path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    path.contains('/').then(|| path.to_string())
}

/// Commit lookup URL for `sha`.
///
/// A provider-supplied `apiUrl` is reused when it either ends in
/// `/repos/<owner>/<repo>` or starts with `<scheme>://<host>/repos/<owner>/<repo>`.
/// Otherwise the URL is built from `api_base` and `owner_repo`.
pub fn commit_api_url(owner_repo: &str, sha: &str, api_url: Option<&str>, api_base: &str) -> String {
    if let Some(base) = api_url.map(|u| u.trim().trim_end_matches('/')) {
        if ends_with_repo_path(base) {
            return format!("{base}/commits/{sha}");
        }
        if let Some((host, repo_path)) = host_and_repo_path(base) {
            return format!("{host}/repos/{repo_path}/commits/{sha}");
        }
    }

    format!(
        "{}/repos/{owner_repo}/commits/{sha}",
        api_base.trim_end_matches('/')
    )
}

fn ends_with_repo_path(base: &str) -> bool {
    let parts: Vec<&str> = base.rsplitn(4, '/').collect();
    matches!(
        parts.as_slice(),
        [name, owner, "repos", _] if !name.is_empty() && !owner.is_empty()
    )
}

/// Splits `https://host/repos/<owner>/<repo>...` into the origin and `owner/repo`.
fn host_and_repo_path(base: &str) -> Option<(&str, String)> {
    let scheme_len = if base.starts_with("https://") {
        "https://".len()
    } else if base.starts_with("http://") {
        "http://".len()
    } else {
        return None;
    };

    let host_end = base[scheme_len..]
        .find('/')
        .map(|i| scheme_len + i)
        .filter(|end| *end > scheme_len)?;
    let rest = base[host_end..].strip_prefix("/repos/")?;

    let mut parts = rest.splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;

    Some((&base[..host_end], format!("{owner}/{name}")))
}
