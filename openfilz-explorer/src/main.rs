use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use openfilz_core::{OpenfilzClient, SearchSort, SortOrder, UploadFile};
use openfilz_explorer::config::ExplorerConfig;
use openfilz_explorer::credentials::{TokenStorage, resolve_token};
use openfilz_explorer::explorer::{Explorer, Outcome};
use openfilz_explorer::notify::{Notice, NoticeLevel, Notifier};
use openfilz_explorer::ops::TransferAction;
use openfilz_explorer::prefs::PreferenceStore;
use openfilz_explorer::theme::{AVAILABLE_THEMES, current_theme, set_theme};
use openfilz_explorer::view::{Destination, Item};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "openfilz")]
#[command(about = "Browse and manage documents on an OpenFilz server", long_about = None)]
struct Cli {
    /// Server base URL, overrides OPENFILZ_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token, overrides OPENFILZ_TOKEN and the saved token.
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List a folder (root by default).
    Ls {
        #[arg(long)]
        folder: Option<String>,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    Rename {
        id: String,
        name: String,
    },
    Mv {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Target folder id, root when omitted.
        #[arg(long)]
        to: Option<String>,
    },
    Cp {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        to: Option<String>,
    },
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Info {
        id: String,
    },
    /// Toggle the favorite flag, or print it with --status.
    Fav {
        id: String,
        #[arg(long)]
        status: bool,
    },
    Favorites,
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
        /// Sort field, e.g. `name` or `updatedAt`.
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
    },
    #[command(subcommand)]
    Meta(MetaCommand),
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        allow_duplicates: bool,
    },
    /// Download one document, or several as a zip archive.
    Download {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        out: PathBuf,
    },
    #[command(subcommand)]
    Trash(TrashCommand),
    /// Store the number of items per page.
    PageSize {
        size: u32,
    },
    /// Show or set the theme.
    Theme {
        name: Option<String>,
    },
    /// Save a token in the system keyring.
    Login {
        token: String,
    },
    /// Remove the saved token.
    Logout,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum MetaCommand {
    /// Set KEY=VALUE pairs.
    Set {
        id: String,
        #[arg(required = true)]
        pairs: Vec<String>,
    },
    Rm {
        id: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum TrashCommand {
    List,
    Restore {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Purge {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Empty,
}

/// Prints each notice as one line on stdout.
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("ok: {}", notice.message),
            NoticeLevel::Failure => println!("error: {}", notice.message),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("OPENFILZ_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("openfilz_explorer=info,openfilz_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_metadata_pairs(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut metadata = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got {pair:?}"))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("empty metadata key in {pair:?}");
        }
        // Numbers, booleans and JSON literals keep their type; anything else is a string.
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}

fn print_items(items: &[Item]) {
    for item in items {
        let size = item.size.map(|size| size.to_string()).unwrap_or_default();
        let star = if item.favorite { "*" } else { "" };
        println!("{}\t{}\t{}{}\t{}", item.kind.label(), item.id, item.name, star, size);
    }
}

fn exit_code(outcome: Outcome) -> ExitCode {
    if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn destination(to: Option<String>) -> Destination {
    to.map(Destination::Folder).unwrap_or(Destination::Root)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = ExplorerConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    // Commands that never touch the server.
    match &cli.command {
        Command::Login { token } => {
            TokenStorage::new()?.save_token(token)?;
            println!("ok: token saved");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Logout => {
            TokenStorage::new()?.delete_token()?;
            println!("ok: saved token removed");
            return Ok(ExitCode::SUCCESS);
        }
        Command::PageSize { size } => {
            if *size == 0 {
                anyhow::bail!("page size must be at least 1");
            }
            let mut prefs = PreferenceStore::open(&config.prefs_path)?;
            prefs.set_page_size(*size)?;
            println!("ok: {size} items per page");
            return Ok(ExitCode::SUCCESS);
        }
        Command::Theme { name } => {
            let mut prefs = PreferenceStore::open(&config.prefs_path)?;
            match name {
                Some(name) => match set_theme(&mut prefs, name)? {
                    Some(theme) => println!("ok: theme set to {}", theme.display_name),
                    None => {
                        let known: Vec<_> = AVAILABLE_THEMES.iter().map(|theme| theme.name).collect();
                        anyhow::bail!("unknown theme {name:?}, expected one of {}", known.join(", "));
                    }
                },
                None => println!("{}", current_theme(&prefs).name),
            }
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let storage = TokenStorage::new().ok();
    let token = resolve_token(cli.token.as_deref(), config.token.as_deref(), storage.as_ref())
        .context("no token: pass --token, set OPENFILZ_TOKEN or run `openfilz login`")?;
    let client = OpenfilzClient::with_base_url(&config.api_url, token)
        .with_context(|| format!("invalid server url {}", config.api_url))?;
    let prefs = PreferenceStore::open(&config.prefs_path)?;
    let mut explorer = Explorer::new(
        client,
        prefs,
        Arc::new(StdoutNotifier),
        config.default_page_size,
    )
    .with_max_attempts(config.max_attempts);

    let outcome = match cli.command {
        Command::Ls { folder, page } => {
            let mut outcome = match folder {
                Some(folder) => explorer.open_folder_by_id(&folder).await,
                None => explorer.open_root().await,
            };
            if outcome == Outcome::Succeeded && page > 1 {
                outcome = explorer.go_to_page(page - 1).await;
                if outcome == Outcome::Skipped {
                    anyhow::bail!("page {page} is out of range");
                }
            }
            if !outcome.is_failure() {
                print_items(explorer.items());
                let pages = explorer.pagination();
                println!(
                    "page {}/{} ({} items)",
                    pages.page_index() + 1,
                    pages.total_pages().max(1),
                    pages.total_items()
                );
            }
            outcome
        }
        Command::Mkdir { name, parent } => {
            let opened = match parent {
                Some(parent) => explorer.open_folder_by_id(&parent).await,
                None => explorer.open_root().await,
            };
            if opened.is_failure() {
                return Ok(ExitCode::FAILURE);
            }
            explorer.create_folder(&name).await
        }
        Command::Rename { id, name } => {
            let items = explorer.resolve_items(std::slice::from_ref(&id)).await?;
            match items.first() {
                Some(item) => explorer.rename_item(item, &name).await,
                None => Outcome::Skipped,
            }
        }
        Command::Mv { ids, to } => {
            let items = explorer.resolve_items(&ids).await?;
            explorer
                .transfer_items(TransferAction::Move, &items, &destination(to))
                .await
        }
        Command::Cp { ids, to } => {
            let items = explorer.resolve_items(&ids).await?;
            explorer
                .transfer_items(TransferAction::Copy, &items, &destination(to))
                .await
        }
        Command::Rm { ids } => {
            let items = explorer.resolve_items(&ids).await?;
            explorer.delete_items(&items).await
        }
        Command::Info { id } => {
            let info = explorer.document_info(&id).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Outcome::Succeeded
        }
        Command::Fav { id, status: true } => {
            println!("{}", explorer.is_favorite(&id).await?);
            Outcome::Succeeded
        }
        Command::Fav { id, status: false } => explorer.toggle_favorite(&id).await,
        Command::Favorites => {
            print_items(&explorer.favorites().await?);
            Outcome::Succeeded
        }
        Command::Search {
            query,
            page,
            size,
            sort,
            desc,
        } => {
            let sort = sort.map(|field| SearchSort {
                field,
                order: if desc { SortOrder::Desc } else { SortOrder::Asc },
            });
            let result = explorer
                .search(&query, &[], sort.as_ref(), page.saturating_sub(1), size)
                .await?;
            for document in &result.documents {
                println!(
                    "{}\t{}\t{}",
                    document.id,
                    document.name,
                    document.size.map(|size| size.to_string()).unwrap_or_default()
                );
            }
            println!("{} hit(s)", result.total_hits);
            Outcome::Succeeded
        }
        Command::Meta(MetaCommand::Set { id, pairs }) => {
            let metadata = parse_metadata_pairs(&pairs)?;
            explorer.update_metadata(&id, metadata).await
        }
        Command::Meta(MetaCommand::Rm { id, keys }) => explorer.delete_metadata(&id, &keys).await,
        Command::Upload {
            files,
            folder,
            allow_duplicates,
        } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let content = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .with_context(|| format!("no file name in {}", path.display()))?
                    .to_string();
                uploads.push(UploadFile { file_name, content });
            }
            let opened = match folder {
                Some(folder) => explorer.open_folder_by_id(&folder).await,
                None => explorer.open_root().await,
            };
            if opened.is_failure() {
                return Ok(ExitCode::FAILURE);
            }
            explorer.upload(uploads, allow_duplicates).await
        }
        Command::Download { ids, out } => match ids.as_slice() {
            [id] => explorer.download_to(id, &out).await,
            _ => explorer.download_zip_to(&ids, &out).await,
        },
        Command::Trash(TrashCommand::List) => {
            let items = explorer.recycle_bin().await?;
            print_items(&items);
            println!("{} item(s) in recycle bin", explorer.recycle_bin_count().await?);
            Outcome::Succeeded
        }
        Command::Trash(TrashCommand::Restore { ids }) => explorer.restore(&ids).await,
        Command::Trash(TrashCommand::Purge { ids }) => explorer.purge(&ids).await,
        Command::Trash(TrashCommand::Empty) => explorer.empty_recycle_bin().await,
        Command::Login { .. } | Command::Logout | Command::PageSize { .. } | Command::Theme { .. } => {
            Outcome::Skipped
        }
    };

    Ok(exit_code(outcome))
}
