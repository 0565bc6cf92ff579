mod cmd_config;
mod cmd_draft;
mod cmd_preview;
mod cmd_run;
mod cmd_send;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recap_render::Granularity;
use recap_store::RecapPaths;

use crate::cmd_draft::WindowArgs;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "recap",
    version,
    about = "Weekly work-activity reports from GitLab, Jira and local git"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect activity and write a Markdown draft
    Draft {
        #[command(flatten)]
        window: WindowArgs,
        /// Grouping of completed work: work-item, commit or category
        #[arg(long)]
        granularity: Option<Granularity>,
    },
    /// Render a draft to HTML and open it in the browser
    Preview {
        /// Draft file (default: latest)
        #[arg(long)]
        draft: Option<PathBuf>,
        /// Template name from the template directory
        #[arg(long)]
        template: Option<String>,
        /// Write the preview without opening it
        #[arg(long)]
        no_open: bool,
    },
    /// Email a draft
    Send {
        /// Draft file (default: latest)
        #[arg(long)]
        draft: Option<PathBuf>,
        /// Template name from the template directory
        #[arg(long)]
        template: Option<String>,
    },
    /// Draft, preview, confirm, then send
    Run {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        granularity: Option<Granularity>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        no_open: bool,
        /// Send without asking
        #[arg(long, short)]
        yes: bool,
    },
    /// Manage config.json in the store root
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("RECAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let paths = RecapPaths::discover(recap_store::store_root());

    let settings = || Settings::load(&paths.config_json);

    match cli.cmd {
        Command::Config { cmd } => cmd_config::run(cmd, &paths),
        Command::Draft {
            window,
            granularity,
        } => cmd_draft::execute(&paths, &settings()?, &window, granularity).map(|_| ()),
        Command::Preview {
            draft,
            template,
            no_open,
        } => cmd_preview::execute(
            &paths,
            &settings()?,
            draft.as_deref(),
            template.as_deref(),
            no_open,
        )
        .map(|_| ()),
        Command::Send { draft, template } => {
            cmd_send::execute(&paths, &settings()?, draft.as_deref(), template.as_deref())
        }
        Command::Run {
            window,
            granularity,
            template,
            no_open,
            yes,
        } => cmd_run::execute(
            &paths,
            &settings()?,
            cmd_run::RunParams {
                window: &window,
                granularity,
                template: template.as_deref(),
                no_open,
                yes,
            },
        ),
    }
}
