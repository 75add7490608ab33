//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::domain::{LinkParams, LinkType, NodeIdentity, Path};

/// Curriculum program trees: attach, detach and move nodes, edit prerequisites, all validated
#[derive(Parser, Debug)]
#[command(name = "progtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// TOML store file (default: `store_file` from config)
    #[arg(short, long, global = true, env = "PROGTREE_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    /// Extra config file layered over the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// A program tree, addressed by its root code and academic year.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Root code of the program tree
    pub code: String,
    /// Academic year
    pub year: i32,
}

impl TreeArgs {
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity::new(self.code.to_uppercase(), self.year)
    }

    /// Identity of another node of the same year.
    pub fn node(&self, code: &str) -> NodeIdentity {
        NodeIdentity::new(code.to_uppercase(), self.year)
    }
}

/// Link attributes.
#[derive(Args, Debug, Clone, Default)]
pub struct LinkArgs {
    /// Relative credits (0..=999); learning units default to their own credits
    #[arg(long, allow_negative_numbers = true)]
    pub relative_credits: Option<i64>,
    #[arg(long)]
    pub min_credits: Option<u32>,
    #[arg(long)]
    pub max_credits: Option<u32>,
    /// Child is optional (links are mandatory by default)
    #[arg(long)]
    pub optional: bool,
    /// Study years, strictly increasing digits 1-6 (e.g. 123)
    #[arg(long)]
    pub block: Option<String>,
    #[arg(long)]
    pub access_condition: bool,
    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long)]
    pub comment_english: Option<String>,
    /// REFERENCE link: the child's children count as the parent's own
    #[arg(long)]
    pub reference: bool,
}

impl LinkArgs {
    pub fn to_params(&self) -> LinkParams {
        LinkParams {
            relative_credits: self.relative_credits,
            min_credits: self.min_credits,
            max_credits: self.max_credits,
            is_mandatory: !self.optional,
            block: self.block.clone(),
            access_condition: self.access_condition,
            comment: self.comment.clone(),
            comment_english: self.comment_english.clone(),
            link_type: if self.reference {
                LinkType::Reference
            } else {
                LinkType::Normal
            },
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and delete program trees
    Tree {
        #[command(subcommand)]
        command: TreeCommands,
    },

    /// Attach a stored node under a path
    Attach {
        #[command(flatten)]
        tree: TreeArgs,
        /// Path of the new parent (ids joined by '|')
        #[arg(short, long)]
        path: Path,
        /// Code of the node to attach
        #[arg(short, long)]
        node: String,
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Paste a node under a path, optionally moving it from another path
    Paste {
        #[command(flatten)]
        tree: TreeArgs,
        /// Path of the new parent
        #[arg(short, long)]
        path: Path,
        /// Code of the node to paste
        #[arg(short, long)]
        node: String,
        /// Occurrence to detach first (cut and paste)
        #[arg(long)]
        detach: Option<Path>,
        /// Only validate, change nothing
        #[arg(long)]
        check: bool,
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Detach the occurrence at a path from its parent
    Detach {
        #[command(flatten)]
        tree: TreeArgs,
        #[arg(short, long)]
        path: Path,
    },

    /// Edit links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },

    /// Edit prerequisites
    Prerequisite {
        #[command(subcommand)]
        command: PrerequisiteCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TreeCommands {
    /// List registered program trees
    List,
    /// Show a program tree with node paths
    Show {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// List the distinct nodes of a program tree
    Nodes {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Every path at which a node occurs
    Paths {
        #[command(flatten)]
        tree: TreeArgs,
        /// Node code
        node: String,
    },
    /// Delete an empty program tree
    Delete {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Replace the attributes of the link at a path
    Update {
        #[command(flatten)]
        tree: TreeArgs,
        #[arg(short, long)]
        path: Path,
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Move the child at a path one place up
    Up {
        #[command(flatten)]
        tree: TreeArgs,
        #[arg(short, long)]
        path: Path,
    },
    /// Move the child at a path one place down
    Down {
        #[command(flatten)]
        tree: TreeArgs,
        #[arg(short, long)]
        path: Path,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrerequisiteCommands {
    /// Set the prerequisite of a learning unit (empty expression removes it)
    Set {
        #[command(flatten)]
        tree: TreeArgs,
        /// Learning unit code
        #[arg(short, long)]
        node: String,
        /// Expression, e.g. "LDROI1001 ET (LDROI1002 OU LDROI1003)"
        expression: String,
        /// Occurrence under which the codes are expected (warnings only)
        #[arg(long)]
        context: Option<Path>,
    },
    /// Validate an expression without saving
    Check {
        #[command(flatten)]
        tree: TreeArgs,
        #[arg(short, long)]
        node: String,
        expression: String,
        #[arg(long)]
        context: Option<Path>,
    },
    /// List the learning units holding a prerequisite
    Show {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective config
    Show,
    /// Print a template config file
    Template,
    /// Show the global config file location
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_attach_line_when_parsing_then_identities_are_uppercased() {
        let cli = Cli::try_parse_from([
            "progtree", "attach", "ldroi100b", "2024", "--path", "1|2", "--node", "ldroi1002",
            "--block", "12",
        ])
        .unwrap();

        let Some(Commands::Attach { tree, path, node, link }) = cli.command else {
            panic!("expected attach");
        };
        assert_eq!(tree.identity(), NodeIdentity::new("LDROI100B", 2024));
        assert_eq!(tree.node(&node), NodeIdentity::new("LDROI1002", 2024));
        assert_eq!(path.to_string(), "1|2");
        assert_eq!(link.to_params().block.as_deref(), Some("12"));
    }

    #[test]
    fn given_malformed_path_when_parsing_then_rejected() {
        let result = Cli::try_parse_from([
            "progtree", "detach", "LDROI100B", "2024", "--path", "1|x",
        ]);

        assert!(result.is_err());
    }
}
