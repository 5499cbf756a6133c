use crate::disks::node::DiskNode;

const BRANCH: &str = "├─ ";
const LAST_BRANCH: &str = "└─ ";
const CONTINUATION: &str = "│  ";
const BLANK: &str = "   ";
const PLACEHOLDER: &str = "-";

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Format a byte count with binary (1024) units and one decimal place.
///
/// Values past the petabyte range stay in `PB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// The text between the brackets: volume name and content type, name first
fn bracket_field(node: &DiskNode) -> String {
    let label = (!node.volume_name.is_empty()).then_some(node.volume_name.as_str());
    match (label, node.content_type()) {
        (Some(label), Some(content)) => format!("{label} | {content}"),
        (Some(label), None) => label.to_string(),
        (None, Some(content)) => content.to_string(),
        (None, None) => PLACEHOLDER.to_string(),
    }
}

/// Render the line for `node` followed by its whole subtree.
///
/// `prefix` holds the guides inherited from the ancestors and `is_last` tells whether the node is
/// the last of its siblings. Top-level disks are rendered with an empty prefix as last siblings.
#[must_use]
pub fn render(node: &DiskNode, prefix: &str, is_last: bool) -> Vec<String> {
    let mut lines = Vec::new();
    render_into(&mut lines, node, prefix, is_last);
    lines
}

fn render_into(lines: &mut Vec<String>, node: &DiskNode, prefix: &str, is_last: bool) {
    let connector = if is_last { LAST_BRANCH } else { BRANCH };
    let mut line = format!(
        "{prefix}{connector}{} [{}]",
        node.device_path(),
        bracket_field(node)
    );
    if node.size > 0 {
        line.push_str(&format!(" ({})", human_size(node.size)));
    }
    lines.push(line);

    let child_prefix = format!("{prefix}{}", if is_last { BLANK } else { CONTINUATION });
    let count = node.partitions.len() + node.apfs_volumes.len();
    for (i, child) in node.children().enumerate() {
        render_into(lines, child, &child_prefix, i + 1 == count);
    }
}

/// Render every top-level disk, separating the trees with one blank line.
#[must_use]
pub fn render_forest(disks: &[DiskNode]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, disk) in disks.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        render_into(&mut lines, disk, "", true);
    }
    lines
}
