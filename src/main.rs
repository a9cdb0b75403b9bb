//! hunchworks - share hunches, gather evidence, organise research groups

use clap::{Parser, Subcommand, ValueEnum};

use hunchworks::commands::{self, LookupKind};
use hunchworks::config::{load_config, HunchworksPaths, LoggingConfig};

#[derive(Parser)]
#[command(name = "hunchworks")]
#[command(author, version, about = "HunchWorks - share hunches and the evidence behind them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize hunchworks (first-time setup)
    Init,

    /// Start the HTTP server
    Serve,

    /// Manage accounts
    Account {
        #[command(subcommand)]
        operation: AccountCommand,
    },

    /// Manage groups and their members
    Group {
        #[command(subcommand)]
        operation: GroupCommand,
    },

    /// Manage hunches
    Hunch {
        #[command(subcommand)]
        operation: HunchCommand,
    },

    /// Record invitations for one or more email addresses
    Invite {
        /// Addresses to invite (repeats are recorded once each)
        #[arg(required = true)]
        emails: Vec<String>,
    },

    /// Add languages, locations, tags or skills
    Lookup {
        kind: LookupArg,
        name: String,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Register an account and its profile
    Add {
        username: String,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// Show an account with its profile
    Show { id: i64 },
}

#[derive(Subcommand)]
enum GroupCommand {
    /// List groups one page at a time
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show a group and its members
    Show { id: i64 },

    /// Create a group
    Create {
        name: String,

        /// Account performing the change
        #[arg(long = "as")]
        actor: i64,

        /// hidden, closed or open
        #[arg(short, long)]
        privacy: Option<String>,

        /// Comma-separated account ids
        #[arg(short, long)]
        collaborators: Option<String>,
    },

    /// Edit a group; the collaborator list replaces the current members
    Edit {
        id: i64,

        #[arg(long = "as")]
        actor: i64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        privacy: Option<String>,

        #[arg(short, long, default_value = "")]
        collaborators: String,
    },
}

#[derive(Subcommand)]
enum HunchCommand {
    /// List hunches visible to an account
    List {
        #[arg(long = "as")]
        actor: i64,
    },

    /// Show a hunch with its evidence
    Show {
        id: i64,

        #[arg(long = "as")]
        actor: i64,
    },

    /// Create a hunch
    Create {
        title: String,

        #[arg(long = "as")]
        actor: i64,

        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        privacy: Option<String>,

        /// Language name; created if missing
        #[arg(short, long)]
        language: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LookupArg {
    Language,
    Location,
    Tag,
    Skill,
}

impl From<LookupArg> for LookupKind {
    fn from(arg: LookupArg) -> Self {
        match arg {
            LookupArg::Language => LookupKind::Language,
            LookupArg::Location => LookupKind::Location,
            LookupArg::Tag => LookupKind::Tag,
            LookupArg::Skill => LookupKind::Skill,
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let level = HunchworksPaths::new()
        .and_then(|paths| load_config(&paths))
        .map(|config| config.logging.level)
        .unwrap_or_else(|_| LoggingConfig::default().level);

    let filter = tracing_subscriber::EnvFilter::try_from_env("HUNCHWORKS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    match cli.command {
        Commands::Init => {
            commands::init()?;
        }
        Commands::Serve => {
            commands::serve().await?;
        }
        Commands::Account { operation } => match operation {
            AccountCommand::Add { username, email } => {
                commands::account_add(&username, email.as_deref())?;
            }
            AccountCommand::Show { id } => {
                commands::account_show(id)?;
            }
        },
        Commands::Group { operation } => match operation {
            GroupCommand::List { page } => {
                commands::group_list(page)?;
            }
            GroupCommand::Show { id } => {
                commands::group_show(id)?;
            }
            GroupCommand::Create {
                name,
                actor,
                privacy,
                collaborators,
            } => {
                commands::group_create(actor, &name, privacy.as_deref(), collaborators.as_deref())?;
            }
            GroupCommand::Edit {
                id,
                actor,
                name,
                privacy,
                collaborators,
            } => {
                commands::group_edit(actor, id, name.as_deref(), privacy.as_deref(), &collaborators)?;
            }
        },
        Commands::Hunch { operation } => match operation {
            HunchCommand::List { actor } => {
                commands::hunch_list(actor)?;
            }
            HunchCommand::Show { id, actor } => {
                commands::hunch_show(actor, id)?;
            }
            HunchCommand::Create {
                title,
                actor,
                description,
                privacy,
                language,
            } => {
                commands::hunch_create(
                    actor,
                    &title,
                    &description,
                    privacy.as_deref(),
                    language.as_deref(),
                )?;
            }
        },
        Commands::Invite { emails } => {
            commands::invite(&emails)?;
        }
        Commands::Lookup { kind, name } => {
            commands::lookup_add(kind.into(), &name)?;
        }
    }

    Ok(())
}
