// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, PkgCommands, PkgRepoCommands, RepoCommands};
use commands::CatalogOptions;
use pkgindex::Config;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let id = err
                .downcast_ref::<pkgindex::Error>()
                .map(pkgindex::Error::id)
                .unwrap_or("error");
            eprintln!("error[{}]: {}", id, err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Repo(cmd) => match cmd {
            RepoCommands::Init {
                dir,
                name,
                if_exists,
            } => commands::cmd_repo_init(&dir, &name, if_exists),
            RepoCommands::Import {
                dir,
                sources,
                if_exists,
                no_validate,
            } => commands::cmd_repo_import(&dir, &sources, if_exists, no_validate),
            RepoCommands::Validate { dir } => commands::cmd_repo_validate(&dir),
            RepoCommands::Ls { dir } => commands::cmd_repo_ls(&dir),
            RepoCommands::Remove {
                dir,
                ids,
                if_missing,
            } => commands::cmd_repo_remove_packages(&dir, &ids, if_missing),
        },

        Commands::Pkg(cmd) => {
            let opts = CatalogOptions {
                config: Config::load(cli.config.as_deref())?,
                cache_dir: cli.cache_dir,
                use_repos: cli.use_repos,
                repo_sync_mode: cli.repo_sync_mode,
            };
            match cmd {
                PkgCommands::Search { pattern } => {
                    commands::cmd_pkg_search(&opts, pattern.as_deref())
                }
                PkgCommands::Solve { requirements } => {
                    commands::cmd_pkg_solve(&opts, &requirements)
                }
                PkgCommands::Prefetch { ids, deps } => {
                    commands::cmd_pkg_prefetch(&opts, &ids, &deps)
                }
                PkgCommands::Get { ids, out } => commands::cmd_pkg_get(&opts, &ids, &out),
                PkgCommands::Repo(repo_cmd) => match repo_cmd {
                    PkgRepoCommands::Add { location } => commands::cmd_repo_add(&opts, &location),
                    PkgRepoCommands::Remove { names } => commands::cmd_repo_remove(&opts, &names),
                    PkgRepoCommands::Ls => commands::cmd_repo_list(&opts),
                    PkgRepoCommands::Update => commands::cmd_repo_update(&opts),
                },
            }
        }
    }
}
