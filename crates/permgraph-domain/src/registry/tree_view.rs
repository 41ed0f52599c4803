//! Readable rendering of a registry branch for paste/export.

use std::fmt::Write;

use super::{is_whole_tree, PermissionRegistry, TreeSnapshot};
use crate::error::{DomainError, DomainResult};
use crate::model::Tristate;

const BRANCH_PADDING: &str = "│  ";
const NODE_MARKER: &str = "├── ";

/// A captured branch of the registry, limited to `max_level` levels.
#[derive(Debug, Clone)]
pub struct TreeView {
    root: String,
    max_level: usize,
    view: Option<TreeSnapshot>,
}

impl TreeView {
    /// Captures the branch at `root` (whole registry for `""`, `"*"`, `"."`).
    pub fn new(registry: &PermissionRegistry, root: &str, max_level: usize) -> Self {
        let root = if is_whole_tree(root) {
            ".".to_string()
        } else {
            root.trim().to_lowercase()
        };
        let view = registry.snapshot(&root);
        Self {
            root,
            max_level,
            view,
        }
    }

    /// Returns true if the root path existed when the view was captured.
    pub fn has_data(&self) -> bool {
        self.view.is_some()
    }

    /// Returns the captured snapshot.
    pub fn snapshot(&self) -> Option<&TreeSnapshot> {
        self.view.as_ref()
    }

    /// Returns `(padding, permission)` pairs in display order.
    ///
    /// Permissions are absolute: the root path is prepended unless the view
    /// covers the whole registry.
    pub fn as_tree_list(&self) -> Vec<(String, String)> {
        let Some(view) = &self.view else {
            return Vec::new();
        };
        let prefix = if self.root == "." {
            String::new()
        } else {
            format!("{}.", self.root)
        };

        view.node_endings()
            .into_iter()
            .filter(|(depth, _)| *depth < self.max_level)
            .map(|(depth, path)| {
                let padding = format!("{}{NODE_MARKER}", BRANCH_PADDING.repeat(depth));
                (padding, format!("{prefix}{path}"))
            })
            .collect()
    }

    /// Renders the view as a markdown document.
    pub fn render_markdown(&self, version: &str) -> DomainResult<String> {
        let lines = self.require_lines()?;
        let mut out = self.header(version, "none", lines.len());
        out.push_str("```\n");
        for (padding, permission) in &lines {
            let _ = writeln!(out, "{padding}{permission}");
        }
        out.push_str("```\n");
        Ok(out)
    }

    /// Renders the view, marking each permission with the reference's value.
    ///
    /// Lines are prefixed with `+ ` (granted), `- ` (denied) or `# ` (unset)
    /// inside a `diff` block.
    pub fn render_markdown_checked<F>(
        &self,
        version: &str,
        reference: &str,
        checker: F,
    ) -> DomainResult<String>
    where
        F: Fn(&str) -> Tristate,
    {
        let lines = self.require_lines()?;
        let mut out = self.header(version, reference, lines.len());
        out.push_str("```diff\n");
        for (padding, permission) in &lines {
            let marker = match checker(permission) {
                Tristate::Granted => "+ ",
                Tristate::Denied => "- ",
                Tristate::Unset => "# ",
            };
            let _ = writeln!(out, "{marker}{padding}{permission}");
        }
        out.push_str("```\n");
        Ok(out)
    }

    fn require_lines(&self) -> DomainResult<Vec<(String, String)>> {
        if !self.has_data() {
            return Err(DomainError::EmptyTreeView {
                root: self.root.clone(),
            });
        }
        Ok(self.as_tree_list())
    }

    fn header(&self, version: &str, reference: &str, size: usize) -> String {
        let produced_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let selection = if self.root == "." {
            "any".to_string()
        } else {
            format!("`{}`", self.root)
        };

        let mut out = String::new();
        out.push_str("## Permission Tree\n");
        let _ = writeln!(out, "#### Generated by permgraph v{version}");
        out.push('\n');
        out.push_str("### Metadata\n");
        out.push_str("| Selection | Max Recursion | Reference User | Size | Produced at |\n");
        out.push_str("|-----------|---------------|----------------|------|-------------|\n");
        let _ = writeln!(
            out,
            "| {selection} | {} | {reference} | **{size}** | {produced_at} |",
            self.max_level
        );
        out.push('\n');
        out.push_str("### Output\n");
        out
    }
}
