//! Connections command - manage vector store connections

use clap::{Args, Subcommand};

use crate::cli::{bootstrap, print_json};
use crate::domain::{Connection, ConnectionScope, ProviderType};

#[derive(Args, Clone, Debug)]
pub struct ConnectionsArgs {
    #[command(subcommand)]
    pub command: ConnectionsCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConnectionsCommand {
    /// Register or replace a connection
    Register(RegisterArgs),

    /// List registered connections without credentials
    List,

    /// Delete a connection
    Delete {
        connection_id: String,
    },

    /// Connect to a registered store and report the result
    Test {
        connection_id: String,
    },
}

#[derive(Args, Clone, Debug)]
pub struct RegisterArgs {
    /// Connection id; must not contain ':'
    #[arg(long)]
    pub id: String,

    /// Provider (mongo, redis, qdrant, pinecone)
    #[arg(long)]
    pub provider: ProviderType,

    /// Connection URI
    #[arg(long)]
    pub uri: String,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub display_name: Option<String>,

    /// Granted scope; repeat for several
    #[arg(long = "scope")]
    pub scopes: Vec<ConnectionScope>,
}

impl RegisterArgs {
    fn into_connection(self) -> Connection {
        let mut connection = Connection::new(self.id, self.provider, self.uri);
        if let Some(api_key) = self.api_key {
            connection = connection.with_api_key(api_key);
        }
        if let Some(display_name) = self.display_name {
            connection = connection.with_display_name(display_name);
        }
        if !self.scopes.is_empty() {
            connection = connection.with_scopes(self.scopes);
        }
        connection
    }
}

pub async fn run(args: ConnectionsArgs) -> anyhow::Result<()> {
    let state = bootstrap().await?;
    let registry = state.connection_registry().await?;

    match args.command {
        ConnectionsCommand::Register(register) => {
            let summary = registry.register(register.into_connection()).await?;
            print_json(&summary)
        }
        ConnectionsCommand::List => print_json(&registry.list().await?),
        ConnectionsCommand::Delete { connection_id } => {
            registry.delete(&connection_id).await?;
            print_json(&serde_json::json!({"deleted": connection_id}))
        }
        ConnectionsCommand::Test { connection_id } => print_json(&registry.test(&connection_id).await?),
    }
}
