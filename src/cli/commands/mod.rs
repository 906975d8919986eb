//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod documents;
mod init;
mod serve;
mod tenants;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::models::Actor;

#[derive(Parser)]
#[command(name = "letters")]
#[command(about = "School letter archive with numbered, approvable letters")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: $LETTERARCHIVE_CONFIG or ./letterarchive.toml)
    #[arg(short, long, global = true, env = "LETTERARCHIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Who is running a command.
#[derive(clap::Args, Debug, Clone)]
pub struct ActorArgs {
    /// Acting user id
    #[arg(long = "actor", default_value = "cli")]
    pub actor_id: String,
    /// Acting user display name (defaults to the id)
    #[arg(long)]
    pub actor_name: Option<String>,
    /// Acting user role, printed on approved letters
    #[arg(long)]
    pub role: Option<String>,
}

impl ActorArgs {
    pub fn actor(&self) -> Actor {
        let name = self.actor_name.as_deref().unwrap_or(&self.actor_id);
        let actor = Actor::new(self.actor_id.as_str(), name);
        match &self.role {
            Some(role) => actor.with_role(role.as_str()),
            None => actor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,

    /// Start the JSON API server
    Serve {
        /// Address to bind: port, host, or host:port (default from config)
        bind: Option<String>,
    },

    /// Archive an existing letter file
    Archive {
        #[arg(short, long)]
        tenant: String,
        /// Serial number printed on the letter
        #[arg(long)]
        serial: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        /// Letter date: YYYY-MM-DD or "17 Agustus 2025"
        #[arg(long)]
        date: String,
        /// inbound or outbound
        #[arg(long, default_value = "inbound")]
        direction: String,
        /// Declared content type (detected when omitted)
        #[arg(long)]
        content_type: Option<String>,
        /// File to archive
        file: PathBuf,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Request a generated letter from a template
    Request {
        #[arg(short, long)]
        tenant: String,
        /// Template id
        #[arg(long)]
        template: String,
        /// Form values as key=value (repeatable)
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Render, store and approve a pending letter
    Approve {
        #[arg(short, long)]
        tenant: String,
        /// Document id
        id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Reject a pending letter
    Reject {
        #[arg(short, long)]
        tenant: String,
        /// Document id
        id: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Show a document and a link to its file
    Show {
        #[arg(short, long)]
        tenant: String,
        /// Document id
        id: String,
    },

    /// List documents, newest first
    List {
        #[arg(short, long)]
        tenant: String,
        /// Filter by status (pending, approved, rejected)
        #[arg(long)]
        status: Option<String>,
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },

    /// Delete a document and its stored file
    Discard {
        #[arg(short, long)]
        tenant: String,
        /// Document id
        id: String,
    },

    /// Show the serial number the next request would receive
    NextSerial {
        #[arg(short, long)]
        tenant: String,
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Manage letter templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Manage the tenant letterhead
    Letterhead {
        #[command(subcommand)]
        command: LetterheadCommands,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create or replace a template from an HTML file
    Put {
        #[arg(short, long)]
        tenant: String,
        /// Template id
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        /// HTML body with {field} placeholders
        file: PathBuf,
    },
    /// List a tenant's templates
    List {
        #[arg(short, long)]
        tenant: String,
    },
}

#[derive(Subcommand)]
enum LetterheadCommands {
    /// Set the display name and letterhead markup
    Set {
        #[arg(short, long)]
        tenant: String,
        #[arg(long)]
        name: String,
        /// HTML letterhead with a {body} slot
        markup: Option<PathBuf>,
    },
    /// Upload a new letterhead logo
    Logo {
        #[arg(short, long)]
        tenant: String,
        /// Image file
        file: PathBuf,
        #[command(flatten)]
        actor: ActorArgs,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Archive {
            tenant,
            serial,
            title,
            category,
            date,
            direction,
            content_type,
            file,
            actor,
        } => {
            let metadata = crate::lifecycle::ArchiveMetadata {
                serial_number: serial,
                title,
                category,
                document_date: date,
                direction,
            };
            documents::cmd_archive(
                &settings,
                &tenant,
                metadata,
                &file,
                content_type,
                &actor.actor(),
            )
            .await
        }
        Commands::Request {
            tenant,
            template,
            fields,
            actor,
        } => {
            let form = fields.into_iter().collect();
            documents::cmd_request(&settings, &tenant, &template, form, &actor.actor()).await
        }
        Commands::Approve { tenant, id, actor } => {
            documents::cmd_approve(&settings, &tenant, &id, &actor.actor()).await
        }
        Commands::Reject { tenant, id, actor } => {
            documents::cmd_reject(&settings, &tenant, &id, &actor.actor()).await
        }
        Commands::Show { tenant, id } => documents::cmd_show(&settings, &tenant, &id).await,
        Commands::List {
            tenant,
            status,
            limit,
        } => documents::cmd_list(&settings, &tenant, status.as_deref(), limit).await,
        Commands::Discard { tenant, id } => {
            documents::cmd_discard(&settings, &tenant, &id).await
        }
        Commands::NextSerial { tenant, year } => {
            documents::cmd_next_serial(&settings, &tenant, year).await
        }
        Commands::Template { command } => match command {
            TemplateCommands::Put {
                tenant,
                id,
                name,
                category,
                file,
            } => tenants::cmd_template_put(&settings, &tenant, &id, &name, &category, &file).await,
            TemplateCommands::List { tenant } => {
                tenants::cmd_template_list(&settings, &tenant).await
            }
        },
        Commands::Letterhead { command } => match command {
            LetterheadCommands::Set {
                tenant,
                name,
                markup,
            } => tenants::cmd_letterhead_set(&settings, &tenant, &name, markup.as_deref()).await,
            LetterheadCommands::Logo {
                tenant,
                file,
                actor,
            } => tenants::cmd_letterhead_logo(&settings, &tenant, &file, &actor.actor()).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("nama=Budi Santoso").unwrap(),
            ("nama".to_string(), "Budi Santoso".to_string())
        );
        assert_eq!(
            parse_field("catatan=a=b").unwrap(),
            ("catatan".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_cli_parses_request() {
        let cli = Cli::try_parse_from([
            "letters",
            "request",
            "--tenant",
            "school-1",
            "--template",
            "tugas",
            "-f",
            "nama=Budi",
            "--actor",
            "staff-7",
        ])
        .unwrap();
        match cli.command {
            Commands::Request {
                tenant,
                fields,
                actor,
                ..
            } => {
                assert_eq!(tenant, "school-1");
                assert_eq!(fields, vec![("nama".to_string(), "Budi".to_string())]);
                assert_eq!(actor.actor().name, "staff-7");
            }
            _ => panic!("expected request command"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
