use super::error::RepoRefError;

/// Splits a GitHub reference into `(owner, repo)`.
///
/// Accepts `owner/repo`, `https://github.com/owner/repo[.git]` and
/// `git@github.com:owner/repo.git`.
pub fn parse_github_repo(reference: &str) -> Result<(String, String), RepoRefError> {
    let malformed = || RepoRefError::Malformed(reference.to_string());

    let trimmed = reference.trim().trim_end_matches('/');
    let path = ["https://github.com/", "http://github.com/", "git@github.com:", "github.com/"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if is_name(owner) && is_name(repo) => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(malformed()),
    }
}

fn is_name(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

pub fn training_file_url(owner: &str, repo: &str, branch: &str, file_path: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{}",
        file_path.trim_start_matches('/')
    )
}
