//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::domain::{Keywords, Link, Message, MessageLevel, Node, Path, ProgramTree};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print messages by severity.
pub fn messages(messages: &[Message]) {
    for message in messages {
        match message.level {
            MessageLevel::Error => error(message),
            MessageLevel::Warning => warning(message),
            MessageLevel::Success => success(message),
            MessageLevel::Info => info(message),
        }
    }
}

fn link_label(link: &Link) -> String {
    let mut parts = Vec::new();
    if link.is_reference() {
        parts.push("REF".to_string());
    }
    if !link.is_mandatory {
        parts.push("optional".to_string());
    }
    if let Some(block) = link.block {
        parts.push(format!("bloc {block}"));
    }
    if let Some(credits) = link.relative_credits {
        parts.push(format!("{credits} cr"));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

fn node_label(node: &Node, path: &Path, link: Option<&Link>, keywords: Keywords) -> String {
    let mut label = format!(
        "{} {} {}{}",
        node.code.bold(),
        node.title,
        format!("({})", node.node_type()).dimmed(),
        link.map(link_label).unwrap_or_default()
    );
    if let Some(prerequisite) = node.prerequisite().filter(|p| !p.is_empty()) {
        label.push_str(&format!(" {} {}", "requires".yellow(), prerequisite.expression(keywords)));
    }
    label.push_str(&format!(" {}", path.to_string().dimmed()));
    label
}

fn subtree(tree: &ProgramTree, path: Path, link: Option<&Link>, keywords: Keywords) -> Tree<String> {
    let Some(node) = tree.node(path.last()) else {
        return Tree::new(path.to_string());
    };
    let leaves = node
        .children()
        .iter()
        .filter(|child| !path.contains(child.child))
        .map(|child| subtree(tree, path.join(child.child), Some(child), keywords));
    Tree::new(node_label(node, &path, link, keywords)).with_leaves(leaves)
}

/// Render the whole tree, one line per occurrence.
pub fn render_tree(tree: &ProgramTree, keywords: Keywords) -> String {
    subtree(tree, tree.root_path(), None, keywords).to_string()
}
