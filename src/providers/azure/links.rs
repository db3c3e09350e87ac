use url::Url;

/// Builds clickable run URLs for an Azure DevOps project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLinks {
    project_url: String,
}

impl RunLinks {
    /// `project_url` is the project root, e.g. <https://dev.azure.com/org/project/>.
    pub fn new(project_url: &Url) -> Self {
        let mut project_url = project_url.as_str().to_string();
        if !project_url.ends_with('/') {
            project_url.push('/');
        }
        Self { project_url }
    }

    /// Converts a build id to its results page
    /// (e.g. <https://dev.azure.com/org/project/_build/results?buildId=42>).
    pub fn run_url(&self, build_id: u64) -> String {
        format!("{}_build/results?buildId={build_id}", self.project_url)
    }
}
