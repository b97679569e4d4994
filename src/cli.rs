use std::path::PathBuf;

use clap::builder::PossibleValue;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::logging::LogLevel;
use crate::lookup::Category;
use crate::options::IssueOptions;

#[derive(Parser)]
#[command(name = "jiraclient")]
#[command(about = "A command-line client for Jira", version)]
#[command(after_help = "EXAMPLES:
    jiraclient create -P INFOSYS -T story -S \"Do some task\"
    jiraclient modify INFOSYS-12 --priority major
    jiraclient show INFOSYS-12
    jiraclient template project.yaml
    jiraclient lookup components -P INFOSYS")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/jiraclient/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// File holding the login session cookie
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Jira server URL
    #[arg(short = 'U', long, global = true)]
    pub url: Option<String>,

    /// Jira user name
    #[arg(short = 'u', long, global = true)]
    pub user: Option<String>,

    /// Jira password (prompted for when needed and not given)
    #[arg(short = 'p', long, global = true)]
    pub password: Option<String>,

    /// Log level
    #[arg(short = 'l', long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Send log messages to syslog
    #[arg(long, global = true)]
    pub syslog: bool,

    /// Never call the server
    #[arg(short = 'n', long, global = true)]
    pub noop: bool,

    /// Call the server for reads only
    #[arg(long, global = true)]
    pub nopost: bool,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Show the full error chain on failure
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an issue
    #[command(after_help = "EXAMPLES:
    jiraclient create -P INFOSYS -T story -S \"Do some task\" -C csa,ops
    jiraclient create -S \"Fix it\" --epic-link INFOSYS-1 -t 2h
    jiraclient create -S \"Done already\" --spent 30m --resolve fixed")]
    Create(CreateArgs),
    /// Modify an existing issue (shows it when nothing is given to change)
    #[command(after_help = "EXAMPLES:
    jiraclient modify INFOSYS-12 --priority major
    jiraclient modify INFOSYS-12 -A jdoe --fix-versions 2.0")]
    Modify(ModifyArgs),
    /// Show an issue
    #[command(after_help = "EXAMPLES:
    jiraclient show INFOSYS-12
    jiraclient show INFOSYS-12 --json")]
    Show {
        /// Issue key (e.g., INFOSYS-12)
        key: String,
    },
    /// Delete an issue and its subtasks
    Delete {
        /// Issue key (e.g., INFOSYS-12)
        key: String,
    },
    /// Add a comment to an issue
    #[command(after_help = "EXAMPLES:
    jiraclient comment INFOSYS-12 \"Deployed to staging\"")]
    Comment {
        /// Issue key (e.g., INFOSYS-12)
        key: String,
        /// Comment text
        text: String,
    },
    /// Resolve an issue
    #[command(after_help = "EXAMPLES:
    jiraclient resolve INFOSYS-12 fixed")]
    Resolve {
        /// Issue key (e.g., INFOSYS-12)
        key: String,
        /// Resolution name (e.g., fixed)
        resolution: String,
    },
    /// Log work against an issue
    #[command(after_help = "EXAMPLES:
    jiraclient worklog INFOSYS-12 --spent 1h -c \"Reviewed logs\"
    jiraclient worklog INFOSYS-12 --spent 1h --remaining 2h")]
    Worklog(WorklogArgs),
    /// Link two issues
    #[command(after_help = "EXAMPLES:
    jiraclient link INFOSYS-12 Blocks INFOSYS-13")]
    Link(LinkArgs),
    /// Remove a link between two issues
    Unlink {
        /// Issue the link starts from
        from: String,
        /// Link type name (e.g., Blocks)
        link_type: String,
        /// Issue the link points to
        to: String,
    },
    /// Make an issue a sub-task of another
    #[command(after_help = "EXAMPLES:
    jiraclient subtask INFOSYS-13 --parent INFOSYS-12")]
    Subtask {
        /// Issue that becomes the sub-task
        child: String,
        /// Parent issue key
        #[arg(long)]
        parent: String,
    },
    /// Add issues to an epic
    #[command(after_help = "EXAMPLES:
    jiraclient epic-link INFOSYS-1 INFOSYS-12 INFOSYS-13")]
    EpicLink {
        /// Epic issue key
        epic: String,
        /// Issue keys to add
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Create an epic with stories and subtasks from a YAML template
    #[command(after_help = "EXAMPLES:
    jiraclient template project.yaml -P INFOSYS
    cat project.yaml | jiraclient template -")]
    Template(TemplateArgs),
    /// Show a name/id table from the server
    #[command(after_help = "EXAMPLES:
    jiraclient lookup components -P INFOSYS
    jiraclient lookup priority
    jiraclient lookup custom-fields -P INFOSYS --type epic")]
    Lookup(LookupArgs),
    /// Call a REST endpoint directly and print the response
    #[command(after_help = "EXAMPLES:
    jiraclient api rest/api/latest/serverInfo
    jiraclient api rest/api/latest/issue/INFOSYS-12 --method put --data '{\"fields\": {}}'")]
    Api(ApiArgs),
    /// Initialize the configuration file interactively
    Init,
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    jiraclient completions bash > ~/.bash_completion.d/jiraclient
    jiraclient completions zsh > ~/.zfunc/_jiraclient")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub issue: IssueOptions,

    /// Ignore the [issues] defaults of the config file
    #[arg(long)]
    pub norcfile: bool,

    /// Add the new issue to this epic
    #[arg(long)]
    pub epic_link: Option<String>,

    /// Log work on the new issue with this comment
    #[arg(short = 'w', long)]
    pub worklog: Option<String>,

    /// Time spent for the work log (e.g., 30m)
    #[arg(short = 's', long)]
    pub spent: Option<String>,

    /// Resolve the new issue with this resolution
    #[arg(short = 'R', long)]
    pub resolve: Option<String>,
}

#[derive(Args)]
pub struct ModifyArgs {
    /// Issue key (e.g., INFOSYS-12)
    pub key: String,

    #[command(flatten)]
    pub issue: IssueOptions,
}

#[derive(Args)]
pub struct WorklogArgs {
    /// Issue key (e.g., INFOSYS-12)
    pub key: String,

    /// Work log comment
    #[arg(short = 'c', long)]
    pub comment: Option<String>,

    /// Time spent (e.g., 30m)
    #[arg(short = 's', long)]
    pub spent: Option<String>,

    /// New remaining estimate (e.g., 2h)
    #[arg(short = 'r', long)]
    pub remaining: Option<String>,
}

#[derive(Args)]
pub struct LinkArgs {
    /// Issue the link starts from
    pub from: String,
    /// Link type name (e.g., Blocks)
    pub link_type: String,
    /// Issue the link points to
    pub to: String,

    /// Comment added with the link
    #[arg(short = 'c', long)]
    pub comment: Option<String>,
}

#[derive(Args)]
pub struct TemplateArgs {
    /// Template file, or - for stdin
    pub file: String,

    #[command(flatten)]
    pub issue: IssueOptions,

    /// Ignore the [issues] defaults of the config file
    #[arg(long)]
    pub norcfile: bool,
}

#[derive(Args)]
pub struct LookupArgs {
    /// What to list
    pub what: LookupTarget,

    /// Project key (defaults to the config file's project)
    #[arg(short = 'P', long)]
    pub project: Option<String>,

    /// Issue type whose custom fields to list
    #[arg(short = 'T', long = "type")]
    pub issue_type: Option<String>,
}

/// A lookup category, or the custom fields of one issue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTarget {
    Table(Category),
    CustomFields,
}

impl ValueEnum for LookupTarget {
    fn value_variants<'a>() -> &'a [Self] {
        &[
            Self::Table(Category::Project),
            Self::Table(Category::IssueType),
            Self::Table(Category::Priority),
            Self::Table(Category::Versions),
            Self::Table(Category::Components),
            Self::Table(Category::Resolutions),
            Self::CustomFields,
        ]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::Table(category) => category.to_possible_value(),
            Self::CustomFields => Some(PossibleValue::new("custom-fields")),
        }
    }
}

#[derive(Args)]
pub struct ApiArgs {
    /// Endpoint relative to the server URL (e.g., rest/api/latest/serverInfo)
    pub uri: String,

    /// HTTP method
    #[arg(long, default_value = "get")]
    pub method: String,

    /// JSON payload, or a file containing it
    #[arg(long)]
    pub data: Option<String>,
}
