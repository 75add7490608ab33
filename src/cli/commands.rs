//! Command dispatch: loads settings, wires the container, runs one use case.

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::command::{
    AttachNodeCommand, DeleteTreeCommand, DetachNodeCommand, OrderDirection, OrderLinkCommand,
    PasteNodeCommand, UpdateLinkCommand, UpdatePrerequisiteCommand,
};
use crate::cli::args::{
    Cli, Commands, ConfigCommands, LinkArgs, LinkCommands, PrerequisiteCommands, TreeArgs,
    TreeCommands,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{Message, Path};
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see --help".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(cli, command),
        other => {
            let settings = Settings::load(cli.config.as_deref())?;
            let container = ServiceContainer::new(settings, cli.store.as_deref())?;
            dispatch(&container, other)
        }
    }
}

fn dispatch(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Tree { command } => cmd_tree(container, command),
        Commands::Attach {
            tree,
            path,
            node,
            link,
        } => cmd_attach(container, tree, path, node, link),
        Commands::Paste {
            tree,
            path,
            node,
            detach,
            check,
            link,
        } => cmd_paste(container, tree, path, node, detach.as_ref(), *check, link),
        Commands::Detach { tree, path } => cmd_detach(container, tree, path),
        Commands::Link { command } => cmd_link(container, command),
        Commands::Prerequisite { command } => cmd_prerequisite(container, command),
        Commands::Config { .. } | Commands::Completion { .. } => {
            Err(CliError::Usage("command does not use the store".to_string()))
        }
    }
}

/// Print the outcome and write the store back.
fn commit(container: &ServiceContainer, messages: &[Message]) -> CliResult<()> {
    container.persist()?;
    output::messages(messages);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, command: &TreeCommands) -> CliResult<()> {
    let service = &container.program_trees;
    match command {
        TreeCommands::List => {
            let trees = service.list()?;
            if trees.is_empty() {
                output::info("No program trees registered");
                return Ok(());
            }
            output::header("Program trees:");
            for tree in trees {
                let root = tree.root_node();
                output::detail(&format!(
                    "{} {} [{}] {} node(s)",
                    root,
                    root.title,
                    root.node_type(),
                    tree.get_all_nodes().len()
                ));
            }
            Ok(())
        }
        TreeCommands::Show { tree } => {
            let tree = service.load(&tree.identity())?;
            output::info(&output::render_tree(&tree, service.keywords()));
            Ok(())
        }
        TreeCommands::Nodes { tree } => {
            let tree = service.load(&tree.identity())?;
            for node in tree.get_all_nodes() {
                output::info(&format!(
                    "{}\t{}\t{}\t{}",
                    node.node_id,
                    node.code,
                    node.node_type(),
                    tree.count_usage(node.node_id)
                ));
            }
            Ok(())
        }
        TreeCommands::Paths { tree, node } => {
            let paths = service.occurrences(&tree.identity(), &tree.node(node))?;
            for path in paths {
                output::info(&path);
            }
            Ok(())
        }
        TreeCommands::Delete { tree } => {
            let messages = service.delete_tree(&DeleteTreeCommand {
                tree: tree.identity(),
            })?;
            commit(container, &messages)
        }
    }
}

#[instrument(skip(container, link))]
fn cmd_attach(
    container: &ServiceContainer,
    tree: &TreeArgs,
    path: &Path,
    node: &str,
    link: &LinkArgs,
) -> CliResult<()> {
    let messages = container.program_trees.attach(&AttachNodeCommand {
        tree: tree.identity(),
        path: path.clone(),
        node: tree.node(node),
        params: link.to_params(),
    })?;
    commit(container, &messages)
}

#[allow(clippy::too_many_arguments)]
#[instrument(skip(container, link))]
fn cmd_paste(
    container: &ServiceContainer,
    tree: &TreeArgs,
    path: &Path,
    node: &str,
    detach: Option<&Path>,
    check: bool,
    link: &LinkArgs,
) -> CliResult<()> {
    let cmd = PasteNodeCommand {
        tree: tree.identity(),
        path_where_to_paste: path.clone(),
        path_where_to_detach: detach.cloned(),
        node: tree.node(node),
        params: link.to_params(),
    };
    if check {
        container.program_trees.check_paste(&cmd)?;
        output::success(&format!("{} can be pasted under {}", cmd.node, path));
        return Ok(());
    }
    let messages = container.program_trees.paste(&cmd)?;
    commit(container, &messages)
}

#[instrument(skip(container))]
fn cmd_detach(container: &ServiceContainer, tree: &TreeArgs, path: &Path) -> CliResult<()> {
    let messages = container.program_trees.detach(&DetachNodeCommand {
        tree: tree.identity(),
        path: path.clone(),
    })?;
    commit(container, &messages)
}

fn cmd_order(
    container: &ServiceContainer,
    tree: &TreeArgs,
    path: &Path,
    direction: OrderDirection,
) -> CliResult<()> {
    let moved = container.program_trees.order(&OrderLinkCommand {
        tree: tree.identity(),
        path: path.clone(),
        direction,
    })?;
    if moved {
        container.persist()?;
        output::success(&format!("{} moved {:?}", path, direction));
    } else {
        output::info(&format!("{} is already at the edge", path));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_link(container: &ServiceContainer, command: &LinkCommands) -> CliResult<()> {
    match command {
        LinkCommands::Update { tree, path, link } => {
            let messages = container.program_trees.update_link(&UpdateLinkCommand {
                tree: tree.identity(),
                path: path.clone(),
                params: link.to_params(),
            })?;
            commit(container, &messages)
        }
        LinkCommands::Up { tree, path } => cmd_order(container, tree, path, OrderDirection::Up),
        LinkCommands::Down { tree, path } => cmd_order(container, tree, path, OrderDirection::Down),
    }
}

fn prerequisite_command(
    tree: &TreeArgs,
    node: &str,
    expression: &str,
    context: Option<&Path>,
) -> UpdatePrerequisiteCommand {
    UpdatePrerequisiteCommand {
        tree: tree.identity(),
        node: tree.node(node),
        expression: expression.to_string(),
        context: context.cloned(),
    }
}

#[instrument(skip(container))]
fn cmd_prerequisite(container: &ServiceContainer, command: &PrerequisiteCommands) -> CliResult<()> {
    let service = &container.program_trees;
    match command {
        PrerequisiteCommands::Set {
            tree,
            node,
            expression,
            context,
        } => {
            let cmd = prerequisite_command(tree, node, expression, context.as_ref());
            let messages = service.set_prerequisite(&cmd)?;
            commit(container, &messages)
        }
        PrerequisiteCommands::Check {
            tree,
            node,
            expression,
            context,
        } => {
            let cmd = prerequisite_command(tree, node, expression, context.as_ref());
            let messages = service.check_prerequisite(&cmd)?;
            debug!("check only, store left untouched");
            output::messages(&messages);
            Ok(())
        }
        PrerequisiteCommands::Show { tree } => {
            let tree = service.load(&tree.identity())?;
            let holders = tree.get_nodes_that_have_prerequisites();
            if holders.is_empty() {
                output::info("No prerequisites");
            }
            for node in holders {
                if let Some(prerequisite) = node.prerequisite() {
                    output::info(&format!(
                        "{}: {}",
                        node.code,
                        prerequisite.expression(service.keywords())
                    ));
                }
            }
            Ok(())
        }
    }
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "exists" } else { "not created" };
                    output::info(&format!("{} ({})", path.display(), state));
                }
                None => output::warning("cannot determine the config directory"),
            }
            Ok(())
        }
    }
}
