/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Headless front end over the canvas state: inspect and manage the
//! workspaces stored in a data directory.

use std::path::PathBuf;
use std::process::ExitCode;

use bpaf::Bpaf;
use canvasshell::{CanvasApp, WorkspaceId, prefs};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_ENV: &str = "CANVASSHELL_LOG";

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
/// Manage canvas workspaces
struct Options {
    /// Data directory; defaults to CANVASSHELL_DATA_DIR or the platform config dir
    #[bpaf(long("data-dir"), argument("DIR"))]
    data_dir: Option<PathBuf>,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Debug, Clone, Bpaf)]
enum Command {
    /// List open workspaces, marking the selected one
    #[bpaf(command)]
    List,
    /// Print a share link for a workspace
    #[bpaf(command)]
    Export {
        /// Workspace id; the selected workspace if omitted
        #[bpaf(positional("ID"))]
        id: Option<String>,
    },
    /// Import a share link or bare payload as a new workspace
    #[bpaf(command)]
    Import {
        #[bpaf(positional("LINK"))]
        link: String,
    },
    /// Create an empty workspace and select it
    #[bpaf(command)]
    New,
    /// Close a workspace and delete its stored content
    #[bpaf(command)]
    Remove {
        #[bpaf(positional("ID"))]
        id: String,
    },
    /// Select a workspace
    #[bpaf(command)]
    Switch {
        #[bpaf(positional("ID"))]
        id: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("canvasshell=info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true));
    // The log bridge picks up the library's `log` records.
    if subscriber.try_init().is_err() {
        eprintln!("canvasshell: logging already initialized");
    }
}

fn parse_id(raw: &str) -> Result<WorkspaceId, String> {
    WorkspaceId::parse(raw).ok_or_else(|| format!("'{raw}' is not a workspace id"))
}

fn select(app: &mut CanvasApp, id: WorkspaceId) -> Result<(), String> {
    if !app.tabs().contains(&id) {
        return Err(format!("no open workspace {id}"));
    }
    app.switch_workspace(id);
    app.run_pending_now();
    Ok(())
}

fn run(app: &mut CanvasApp, command: Command) -> Result<(), String> {
    match command {
        Command::List => {
            let active = app.active_workspace();
            for id in app.tabs() {
                let marker = if Some(*id) == active { '*' } else { ' ' };
                let title = app.workspace_title(*id).unwrap_or_default();
                println!("{marker} {id}  {title}");
            }
        },
        Command::Export { id } => {
            let link = match id {
                Some(raw) => app.export_workspace_by_id(parse_id(&raw)?),
                None => app.export_workspace(),
            }
            .map_err(|e| format!("{e}"))?;
            println!("{link}");
        },
        Command::Import { link } => {
            let id = app.import_workspace(&link).map_err(|e| format!("{e}"))?;
            app.run_pending_now();
            info!(%id, nodes = app.registry().len(), "imported workspace");
            println!("{id}");
        },
        Command::New => {
            let id = app.create_workspace(None);
            app.run_pending_now();
            println!("{id}");
        },
        Command::Remove { id } => {
            let id = parse_id(&id)?;
            if !app.remove_workspace(id) {
                return Err(format!("no open workspace {id}"));
            }
            app.run_pending_now();
        },
        Command::Switch { id } => {
            select(app, parse_id(&id)?)?;
            println!("{}", app.title());
        },
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let options = options().run();
    let data_dir = options.data_dir.unwrap_or_else(prefs::data_dir);
    info!(data_dir = %data_dir.display(), version = canvasshell::VERSION, "starting");

    let mut app = CanvasApp::new_from_dir(data_dir);
    let result = run(&mut app, options.command);
    app.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("canvasshell: {e}");
            ExitCode::FAILURE
        },
    }
}
