// File: ./src/bin/cli.rs
use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use todobin::cache::{Cache, KnownList};
use todobin::client::{
    ClientError, ShareLinks, SyncMode, TodoApi, TodoClient, WatchEvent, WatchHandle, watch,
    watch_polling,
};
use todobin::config::{ClientConfig, Config};
use todobin::fingerprint::Fingerprint;
use todobin::model::ordering::{self, move_item, push_draft, remove_item, toggle_item};
use todobin::model::timefmt::{format_relative_time, format_time_left};
use todobin::model::{
    CreateListRequest, CreateListResponse, ItemDraft, Progress, SearchQuery, TaskFilter, TaskSort,
    TodoList, UpdateListRequest, normalize_tags, parse_tag_input,
};
use todobin::service::ListService;
use todobin::storage::LocalStorage;
use todobin::store::FileStore;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

#[derive(Parser)]
#[command(name = "todobin")]
#[command(about = "Shareable todo lists: create one, hand out the link, edit with the token")]
#[command(
    after_help = "Environment:\n  TODOBIN_API_URL   Backend base URL\n  TODOBIN_WEB_URL   Base of printed share links\n  TODOBIN_CONFIG    Config file path"
)]
struct Cli {
    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    api: Option<String>,
    /// Work on the local file store instead of a server
    #[arg(long, global = true, default_value_t = false)]
    local: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a list. Items accept `!high` and `#tag` markers.
    Create {
        items: Vec<String>,
        #[arg(long, default_value = "")]
        title: String,
        /// Comma or space separated
        #[arg(long, default_value = "")]
        tags: String,
        /// Lifetime in hours (0 = server default)
        #[arg(long, default_value_t = 0)]
        hours: i64,
    },
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
        #[arg(long, value_enum, default_value_t = SortArg::Order)]
        sort: SortArg,
        #[arg(long, default_value = "")]
        find: String,
    },
    Add {
        id: String,
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Toggle completion of item N (1-based)
    Done {
        id: String,
        n: usize,
        #[arg(long)]
        token: Option<String>,
    },
    Edit {
        id: String,
        n: usize,
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(long)]
        token: Option<String>,
    },
    Rm {
        id: String,
        n: usize,
        #[arg(long)]
        token: Option<String>,
    },
    /// Move item FROM to position TO (both 1-based)
    Mv {
        id: String,
        from: usize,
        to: usize,
        #[arg(long)]
        token: Option<String>,
    },
    /// Replace the list's tags; no tags clears them
    Tags {
        id: String,
        tags: Vec<String>,
        #[arg(long)]
        token: Option<String>,
    },
    Title {
        id: String,
        title: Vec<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Copy a list into a fresh one with its own edit token
    Dup { id: String },
    Search {
        text: Option<String>,
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Trending {
        #[arg(long)]
        limit: Option<usize>,
    },
    Like { id: String },
    Unlike { id: String },
    /// Print the list every time it changes
    Watch {
        id: String,
        #[arg(long, default_value_t = false)]
        websocket: bool,
        #[arg(long, default_value_t = false)]
        poll: bool,
    },
    Links {
        id: String,
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FilterArg {
    All,
    Completed,
    Incomplete,
}

impl From<FilterArg> for TaskFilter {
    fn from(f: FilterArg) -> Self {
        match f {
            FilterArg::All => TaskFilter::All,
            FilterArg::Completed => TaskFilter::Completed,
            FilterArg::Incomplete => TaskFilter::Incomplete,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Order,
    Priority,
    Alphabetical,
    Created,
}

impl From<SortArg> for TaskSort {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Order => TaskSort::Order,
            SortArg::Priority => TaskSort::Priority,
            SortArg::Alphabetical => TaskSort::Alphabetical,
            SortArg::Created => TaskSort::Created,
        }
    }
}

struct Ctx {
    cfg: ClientConfig,
    cache: Option<Cache>,
}

impl Ctx {
    fn token(&self, id: &str, given: Option<String>) -> Result<String> {
        if let Some(t) = given.filter(|t| !t.is_empty()) {
            return Ok(t);
        }
        self.cache
            .as_ref()
            .and_then(|c| c.token_for(id))
            .ok_or_else(|| anyhow!("No edit token known for {}; pass --token", id))
    }

    fn remember(&self, resp: &CreateListResponse) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.remember(KnownList {
                id: resp.id.clone(),
                edit_token: resp.edit_token.clone(),
                title: resp.todo_list.title.clone(),
                expires_at: resp.todo_list.expires_at,
            })
        {
            eprintln!("Warning: could not save edit token locally: {}", e);
        }
    }

    fn fingerprint(&self) -> Result<String> {
        match LocalStorage::data_dir() {
            Some(dir) => Fingerprint::load_or_create(dir),
            None => Fingerprint::generate(),
        }
    }

    fn links(&self, id: &str, token: Option<&str>) -> ShareLinks {
        ShareLinks::new(&self.cfg.web_url, id, token)
    }
}

fn print_list(list: &TodoList, filter: TaskFilter, sort: TaskSort, find: &str) {
    let now = Utc::now();
    let title = if list.title.is_empty() {
        "Untitled list"
    } else {
        list.title.as_str()
    };
    if list.tags.is_empty() {
        println!("{}", title);
    } else {
        println!("{}  [{}]", title, list.tags.join(", "));
    }
    let progress = Progress::of(&list.items);
    println!(
        "{}/{} done ({:.0}%) | {} | created {} | {} views | {} likes",
        progress.completed,
        progress.total,
        progress.percent(),
        format_time_left(list.expires_at, now),
        format_relative_time(list.created_at, now),
        list.view_count,
        list.like_count
    );
    for item in ordering::view(&list.items, filter, find, sort) {
        let mark = if item.completed { "x" } else { " " };
        println!(
            "{:>3}. [{}] {}  ({})",
            item.order + 1,
            mark,
            item.content,
            item.priority.label()
        );
    }
}

fn print_created(ctx: &Ctx, resp: &CreateListResponse) {
    let links = ctx.links(&resp.id, Some(&resp.edit_token));
    println!("Created list {}", resp.id);
    println!("Edit token: {}", resp.edit_token);
    println!("View: {}", links.view);
    if let Some(edit) = links.edit {
        println!("Edit: {}", edit);
    }
}

fn slot(list: &TodoList, n: usize) -> Result<usize> {
    if n == 0 || n > list.items.len() {
        bail!("No item {} (list has {})", n, list.items.len());
    }
    Ok(n - 1)
}

/// `#tag` words typed into an item join the list's tags.
fn merge_tags(current: &[String], new_tags: Vec<String>) -> Option<Vec<String>> {
    if new_tags.is_empty() {
        return None;
    }
    let mut merged = current.to_vec();
    merged.extend(new_tags);
    Some(normalize_tags(&merged))
}

/// What an edit changes besides the items.
#[derive(Default)]
struct Extras {
    tags: Option<Vec<String>>,
    title: Option<String>,
}

async fn edit_list<A, F>(api: &A, ctx: &Ctx, id: &str, token: Option<String>, f: F) -> Result<()>
where
    A: TodoApi,
    F: FnOnce(&mut TodoList) -> Result<Extras>,
{
    let token = ctx.token(id, token)?;
    let mut list = api.get(id).await?;
    let extras = f(&mut list)?;
    let req = UpdateListRequest {
        items: list.drafts(),
        tags: extras.tags,
        title: extras.title,
    };
    let updated = api.update(id, &token, None, req).await?;
    print_list(&updated, TaskFilter::All, TaskSort::Order, "");
    Ok(())
}

async fn run<A: TodoApi>(api: &A, ctx: &Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            items,
            title,
            tags,
            hours,
        } => {
            let mut all_tags = parse_tag_input(&tags);
            let drafts = items
                .iter()
                .map(|text| {
                    let mut draft = ItemDraft::default();
                    all_tags.extend(draft.apply_smart_input(text));
                    draft
                })
                .filter(|d| !d.content.is_empty())
                .collect();
            let resp = api
                .create(CreateListRequest {
                    expiration_hours: hours,
                    items: drafts,
                    tags: normalize_tags(&all_tags),
                    title,
                })
                .await?;
            ctx.remember(&resp);
            print_created(ctx, &resp);
        }
        Commands::Show {
            id,
            filter,
            sort,
            find,
        } => {
            let list = api.get(&id).await?;
            if let Ok(fp) = ctx.fingerprint()
                && let Err(e) = api.record_view(&id, &fp).await
            {
                tracing::warn!(error = %e, "could not record view");
            }
            print_list(&list, filter.into(), sort.into(), &find);
        }
        Commands::Add { id, text, token } => {
            let mut draft = ItemDraft::default();
            let new_tags = draft.apply_smart_input(&text.join(" "));
            if draft.content.is_empty() {
                bail!("Nothing to add");
            }
            edit_list(api, ctx, &id, token, move |list| {
                push_draft(
                    &mut list.items,
                    &draft.content,
                    draft.priority.unwrap_or_default(),
                    Utc::now(),
                );
                Ok(Extras {
                    tags: merge_tags(&list.tags, new_tags),
                    title: None,
                })
            })
            .await?;
        }
        Commands::Done { id, n, token } => {
            edit_list(api, ctx, &id, token, |list| {
                let i = slot(list, n)?;
                toggle_item(&mut list.items[i], Utc::now());
                Ok(Extras::default())
            })
            .await?;
        }
        Commands::Edit { id, n, text, token } => {
            edit_list(api, ctx, &id, token, |list| {
                let i = slot(list, n)?;
                let mut draft = list.items[i].to_draft();
                let new_tags = draft.apply_smart_input(&text.join(" "));
                if draft.content.is_empty() {
                    bail!("Item text cannot be empty");
                }
                let item = &mut list.items[i];
                item.content = draft.content;
                if let Some(p) = draft.priority {
                    item.priority = p;
                }
                Ok(Extras {
                    tags: merge_tags(&list.tags, new_tags),
                    title: None,
                })
            })
            .await?;
        }
        Commands::Rm { id, n, token } => {
            edit_list(api, ctx, &id, token, |list| {
                let i = slot(list, n)?;
                let item_id = list.items[i].id.clone();
                remove_item(&mut list.items, &item_id);
                Ok(Extras::default())
            })
            .await?;
        }
        Commands::Mv {
            id,
            from,
            to,
            token,
        } => {
            edit_list(api, ctx, &id, token, |list| {
                let from = slot(list, from)?;
                move_item(&mut list.items, from, to.saturating_sub(1));
                Ok(Extras::default())
            })
            .await?;
        }
        Commands::Tags { id, tags, token } => {
            let tags = parse_tag_input(&tags.join(" "));
            edit_list(api, ctx, &id, token, move |_| {
                Ok(Extras {
                    tags: Some(tags),
                    title: None,
                })
            })
            .await?;
        }
        Commands::Title { id, title, token } => {
            let title = title.join(" ");
            edit_list(api, ctx, &id, token, move |_| {
                Ok(Extras {
                    tags: None,
                    title: Some(title),
                })
            })
            .await?;
        }
        Commands::Dup { id } => {
            let resp = api.duplicate(&id).await?;
            ctx.remember(&resp);
            print_created(ctx, &resp);
        }
        Commands::Search {
            text,
            tags,
            cursor,
            limit,
        } => {
            let page = api
                .search(&SearchQuery {
                    search: text,
                    tags: parse_tag_input(&tags),
                    cursor,
                    limit,
                })
                .await?;
            if page.lists.is_empty() {
                println!("No lists found.");
            }
            let now = Utc::now();
            for list in &page.lists {
                let progress = Progress::of(&list.items);
                println!(
                    "{}  {}  [{}]  {}/{} done, {}",
                    list.id,
                    if list.title.is_empty() {
                        "Untitled list"
                    } else {
                        list.title.as_str()
                    },
                    list.tags.join(", "),
                    progress.completed,
                    progress.total,
                    format_time_left(list.expires_at, now)
                );
            }
            if let Some(next) = page.next_cursor {
                println!("More: --cursor {}", next);
            }
        }
        Commands::Trending { limit } => {
            for tag in api.trending(limit).await? {
                println!("#{} ({})", tag.name, tag.usage_count);
            }
        }
        Commands::Like { id } => {
            let e = api.like(&id, &ctx.fingerprint()?).await?;
            println!("{} likes", e.like_count);
        }
        Commands::Unlike { id } => {
            let e = api.unlike(&id, &ctx.fingerprint()?).await?;
            println!("{} likes", e.like_count);
        }
        Commands::Links { id, token } => {
            let token = token.or_else(|| ctx.cache.as_ref().and_then(|c| c.token_for(&id)));
            let links = ctx.links(&id, token.as_deref());
            println!("View: {}", links.view);
            if let Some(edit) = links.edit {
                println!("Edit: {}", edit);
            }
        }
        Commands::Watch { .. } => bail!("watch is started by follow"),
    }
    Ok(())
}

async fn follow<A, S>(api: &A, id: &str, start: S) -> Result<()>
where
    A: TodoApi,
    S: FnOnce(UnboundedSender<WatchEvent>) -> WatchHandle,
{
    let list = api.get(id).await?;
    print_list(&list, TaskFilter::All, TaskSort::Order, "");

    let (tx, mut rx) = unbounded_channel();
    let _handle = start(tx);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(WatchEvent::Updated(list)) => {
                    println!();
                    print_list(&list, TaskFilter::All, TaskSort::Order, "");
                }
                Some(WatchEvent::Connected { client_id }) => {
                    eprintln!("Live updates on ({})", client_id)
                }
                Some(WatchEvent::Disconnected) => eprintln!("Connection lost, reconnecting..."),
                Some(WatchEvent::Error(e)) => eprintln!("Sync error: {}", e),
                None => break,
            }
        }
    }
    Ok(())
}

fn sync_mode(cfg: &ClientConfig, websocket: bool, poll: bool) -> SyncMode {
    let mut cfg = cfg.clone();
    if websocket {
        cfg.enable_websocket = true;
    }
    if poll {
        cfg.enable_websocket = false;
    }
    SyncMode::from_config(&cfg)
}

fn local_service(config: &Config) -> Result<ListService> {
    let dir = match &config.server.data_dir {
        Some(dir) => dir.clone(),
        None => LocalStorage::data_dir()
            .context("no data directory available")?
            .join("lists"),
    };
    let store = FileStore::open(&dir).with_context(|| format!("opening {}", dir.display()))?;
    Ok(ListService::new(
        Arc::new(store),
        config.server.service_settings(),
    ))
}

fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ClientError>() {
        Some(ClientError::Status {
            message,
            detail: Some(detail),
            ..
        }) => format!("{} ({})", message, detail),
        _ => format!("{:#}", err),
    }
}

async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    let mut cfg = config.client.clone();
    if let Some(api) = cli.api {
        cfg.api_url = api;
    }
    let ctx = Ctx {
        cache: Cache::open(),
        cfg,
    };
    if let Some(cache) = &ctx.cache {
        let _ = cache.prune_expired(Utc::now());
    }

    if cli.local {
        let service = Arc::new(local_service(&config)?);
        if let Commands::Watch { id, websocket, poll } = cli.command {
            if websocket {
                eprintln!("No WebSocket without a server; polling instead.");
            }
            let interval = match sync_mode(&ctx.cfg, false, poll) {
                SyncMode::Polling { interval } => interval,
                SyncMode::WebSocket { .. } => todobin::client::watch::DEFAULT_POLL_INTERVAL,
            };
            let svc = service.clone();
            return follow(service.as_ref(), &id, |tx| watch_polling(svc, &id, interval, tx)).await;
        }
        return run(service.as_ref(), &ctx, cli.command).await;
    }

    let client = Arc::new(TodoClient::new(
        &ctx.cfg.api_url,
        ctx.cfg.allow_insecure_certs,
    )?);
    if let Commands::Watch { id, websocket, poll } = cli.command {
        let mode = sync_mode(&ctx.cfg, websocket, poll);
        let c = client.clone();
        return follow(client.as_ref(), &id, |tx| watch(c, &id, None, mode, tx)).await;
    }
    run(client.as_ref(), &ctx, cli.command).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: ignoring config: {:#}", e);
            let mut c = Config::default();
            c.apply_overrides(|k| std::env::var(k).ok());
            c
        }
    };

    if let Err(e) = dispatch(cli, config).await {
        eprintln!("Error: {}", describe(&e));
        std::process::exit(1);
    }
}
