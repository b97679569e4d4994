mod cli;
mod client;
mod commands;
mod config;
mod error;
mod jira;
mod logging;
mod lookup;
mod options;
mod output;
mod reconcile;
mod responses;
mod session;
mod template;
mod types;

use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Commands};
use client::{JiraClient, Mode};
use config::{read_password, Config};
use error::Result;
use session::SessionFile;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = logging::init(cli.loglevel, cli.syslog) {
        eprintln!("Error: cannot set up logging: {e}");
        std::process::exit(1);
    }

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Exiting...");
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        log::error!("{e}");

        if verbose {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    output::set_json_output(cli.json);

    match cli.command {
        // Commands that don't need a server
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "jiraclient", &mut io::stdout());
            return Ok(());
        }
        Commands::Init => return commands::init::run(cli.config.as_deref()),
        _ => {}
    }

    let config = Config::load(cli.config.as_deref())?;
    let url = config.url(cli.url.as_deref())?;
    let user = config.user(cli.user.as_deref())?;
    let session = SessionFile::new(config.session_path(cli.session_file.as_deref())?);

    let mut client = JiraClient::new(&url, Mode::from_flags(cli.noop, cli.nopost))?.with_session(session);
    let password = config.password(cli.password.as_deref());
    client
        .connect(&user, || read_password(password, &user))
        .await?;

    match cli.command {
        Commands::Create(args) => commands::issues::create(&client, &config, args).await,
        Commands::Modify(args) => commands::issues::modify(&client, args).await,
        Commands::Show { key } => commands::issues::show(&client, &key).await,
        Commands::Delete { key } => commands::issues::delete(&client, &key).await,
        Commands::Comment { key, text } => commands::issues::comment(&client, &key, &text).await,
        Commands::Resolve { key, resolution } => {
            commands::issues::resolve(&client, &key, &resolution).await
        }
        Commands::Worklog(args) => {
            commands::worklog::log_work(
                &client,
                &args.key,
                args.comment.as_deref(),
                args.spent.as_deref(),
                args.remaining.as_deref(),
            )
            .await
        }
        Commands::Link(args) => commands::relations::link(&client, args).await,
        Commands::Unlink { from, link_type, to } => {
            commands::relations::unlink(&client, &from, &link_type, &to).await
        }
        Commands::Subtask { child, parent } => {
            commands::relations::subtask(&client, &child, &parent).await
        }
        Commands::EpicLink { epic, keys } => commands::relations::epic_link(&client, &epic, &keys).await,
        Commands::Template(args) => commands::template::run(&client, &config, args).await,
        Commands::Lookup(args) => commands::lookups::run(&client, &config, args).await,
        Commands::Api(args) => commands::api::run(&client, args).await,
        Commands::Completions { .. } | Commands::Init => {
            // Already handled above
            Ok(())
        }
    }
}
