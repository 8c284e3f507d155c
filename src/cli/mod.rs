//! Command-line interface.

mod prompt;
mod render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::debug;

use scisummarize::actions::{Action, ActionOutcome, DocumentAction, NotificationAction, SummaryAction};
use scisummarize::config::load_settings;
use scisummarize::models::{
    DocumentFilter, ExportFormat, FeedbackKind, ProfileUpdate, SortOrder, SummarizeOptions,
    SummaryFilter,
};
use scisummarize::services::{save_export, InsightTab, SavedSettings, UploadEvent, UploadForm};
use scisummarize::state::{LoadOutcome, SearchOutcome};
use scisummarize::{ApiError, AppContext};

use prompt::TermConfirm;

#[derive(Parser, Debug)]
#[command(
    name = "scisum",
    author,
    version,
    about = "SciSummarize: upload, summarize and explore scientific documents",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server origin.
    #[arg(long, global = true, env = "SCISUM_BASE_URL")]
    base_url: Option<String>,

    /// CSRF token sent with mutating requests.
    #[arg(long, global = true, env = "SCISUM_CSRF_TOKEN", hide_env_values = true)]
    csrf_token: Option<String>,

    /// Directory holding the local client state.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in
    Login {
        email: String,
        /// Password; prompted for when omitted.
        #[arg(long, env = "SCISUM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Keep the session for 30 days.
        #[arg(long)]
        remember: bool,
    },
    /// Create an account
    Register { name: String, email: String },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Update profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Change the account password
    Password,
    /// Document and summary counters
    Stats,
    /// List documents
    Documents {
        /// all, recent or favorites
        #[arg(long, default_value = "all")]
        filter: DocumentFilter,
        /// date-desc, date-asc, name-asc or name-desc
        #[arg(long, default_value = "date-desc")]
        sort: SortOrder,
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// List summaries
    Summaries {
        /// all, completed or draft
        #[arg(long, default_value = "all")]
        filter: SummaryFilter,
        #[arg(long, default_value = "date-desc")]
        sort: SortOrder,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Run a document action: view, favorite or delete
    Doc {
        action: DocumentAction,
        id: String,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Change a document's title and description
    Edit {
        id: String,
        #[arg(long)]
        title: String,
        /// Left unchanged when omitted.
        #[arg(long)]
        description: Option<String>,
    },
    /// Run a summary action: view, edit or export[:format]
    Summary { action: SummaryAction, id: String },
    /// Generate a summary for a document
    Summarize {
        id: String,
        /// short, medium or long; defaults to your settings.
        #[arg(long)]
        length: Option<String>,
        /// academic, simplified, ...; defaults to your settings.
        #[arg(long)]
        style: Option<String>,
    },
    /// Upload a document
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Export a document
    Export {
        id: String,
        #[arg(long, default_value = "pdf")]
        format: ExportFormat,
        /// Directory to write the file into.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Full-text search
    Search {
        query: String,
        #[arg(long, default_value = "date-desc")]
        sort: SortOrder,
        /// Earliest upload date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Latest upload date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<NaiveDate>,
        /// File type to leave out; repeatable.
        #[arg(long = "exclude-type")]
        exclude_types: Vec<String>,
        /// Tag to require; repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Notifications
    #[command(subcommand)]
    Notifications(NotificationCommand),
    /// User settings
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Feedback
    #[command(subcommand)]
    Feedback(FeedbackCommand),
    /// Keyword, citation, topic and trend charts for a document
    Insights {
        id: String,
        /// keywords, citations, topics or trends
        #[arg(long)]
        tab: Option<InsightTab>,
        /// Print the selected tab as CSV.
        #[arg(long, requires = "tab")]
        csv: bool,
    },
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
    /// Show notifications
    List,
    /// Mark one as read
    Read { id: String },
    /// Dismiss one
    Dismiss { id: String },
    /// Dismiss all
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
    /// Keep refreshing until interrupted
    Watch,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the effective settings
    Show,
    /// Set one value, e.g. `displayPreferences.compactView true`
    Set {
        path: String,
        /// JSON value; bare words are taken as strings.
        value: String,
    },
    /// Restore defaults
    Reset,
}

#[derive(Subcommand, Debug)]
enum FeedbackCommand {
    /// Send feedback
    Send {
        text: String,
        /// general, summary, bug or feature
        #[arg(long, default_value = "general")]
        kind: FeedbackKind,
        #[arg(long)]
        document: Option<String>,
    },
    /// List what you sent before
    History {
        #[arg(long)]
        refresh: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings().await;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(token) = cli.csrf_token {
        settings.csrf_token = Some(token);
    }
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    debug!("Using API at {}", settings.api_base());

    let ctx = AppContext::open(settings).context("failed to open local state")?;
    let _watch = ctx.spawn_session_watch();

    let result = execute(&ctx, cli.command).await;
    if let Err(ref e) = result {
        if let Some(api_error) = e.downcast_ref::<ApiError>() {
            if ctx.auth.handle_error(api_error) {
                eprintln!("{}", style("Session expired. Please sign in again.").yellow());
            }
        }
    }
    result
}

async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Login {
            email,
            password,
            remember,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt::password("Password")?,
            };
            let user = ctx.auth.login(&email, &password, remember).await?;
            println!("Signed in as {}", style(user.display_name()).bold());
        }
        Commands::Register { name, email } => {
            let password = prompt::password("Password")?;
            let confirm = prompt::password("Confirm password")?;
            ctx.auth.register(&name, &email, &password, &confirm).await?;
            println!("Account created. You can now sign in.");
        }
        Commands::Logout => {
            if let Err(e) = ctx.auth.logout().await {
                debug!("Server logout failed: {}", e);
            }
            println!("Signed out.");
        }
        Commands::Whoami => match ctx.auth.check_status().await? {
            Some(user) => {
                println!("{}", style(user.display_name()).bold());
                if let Some(email) = user.email {
                    println!("  {}", email);
                }
                if let Some(expires) = ctx.auth.session().expires_at {
                    println!("  session expires {}", expires.format("%Y-%m-%d"));
                }
            }
            None => println!("Not signed in."),
        },
        Commands::Profile { name, email } => {
            let profile = if name.is_none() && email.is_none() {
                ctx.account.profile().await?
            } else {
                ctx.account
                    .update_profile(ProfileUpdate { name, email })
                    .await?
            };
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Password => {
            let current = prompt::password("Current password")?;
            let new = prompt::password("New password")?;
            let confirm = prompt::password("Confirm new password")?;
            ctx.account.change_password(&current, &new, &confirm).await?;
            println!("Password changed.");
        }
        Commands::Stats => {
            let stats = ctx.dashboard.stats().await?;
            println!("Documents: {}", stats.total_documents);
            println!("Summaries: {}", stats.total_summaries);
            if !stats.favorite_topics.is_empty() {
                println!("Topics:    {}", stats.favorite_topics.join(", "));
            }
        }
        Commands::Documents {
            filter,
            sort,
            pages,
        } => {
            let documents = ctx.dashboard.documents();
            documents.set_filter(filter).await?;
            if sort != documents.snapshot().sort {
                documents.set_sort(sort).await?;
            }
            load_pages(pages, move || documents.load_more()).await?;
            render::print_documents(&documents.snapshot());
        }
        Commands::Summaries {
            filter,
            sort,
            pages,
        } => {
            let summaries = ctx.dashboard.summaries();
            summaries.set_filter(filter).await?;
            if sort != summaries.snapshot().sort {
                summaries.set_sort(sort).await?;
            }
            load_pages(pages, move || summaries.load_more()).await?;
            render::print_summaries(&summaries.snapshot());
        }
        Commands::Doc { action, id, yes } => {
            // Actions work on listed documents
            ctx.dashboard.documents().refresh().await?;
            let outcome = ctx
                .dispatch(Action::Document(action, id.clone()), &TermConfirm { assume_yes: yes })
                .await?;
            print_outcome(ctx, outcome).await?;
        }
        Commands::Edit {
            id,
            title,
            description,
        } => {
            let document = ctx
                .dashboard
                .edit_document(&id, &title, description.as_deref())
                .await?;
            println!("{}", style("Document updated.").green());
            render::print_document(&document);
        }
        Commands::Summary { action, id } => {
            ctx.dashboard.summaries().refresh().await?;
            let outcome = ctx
                .dispatch(Action::Summary(action, id), &TermConfirm { assume_yes: false })
                .await?;
            print_outcome(ctx, outcome).await?;
        }
        Commands::Summarize { id, length, style: summary_style } => {
            let (user_settings, _) = ctx.user_settings.load().await;
            let mut options = SummarizeOptions::from(&user_settings.summarization_preferences);
            if let Some(length) = length {
                options.length = length;
            }
            if let Some(summary_style) = summary_style {
                options.style = summary_style;
            }

            let spinner = spinner(format!("Summarizing {}", id));
            let result = ctx.dashboard.summarize(&id, &options).await;
            spinner.finish_and_clear();
            render::print_document(&result?);
        }
        Commands::Upload {
            path,
            title,
            description,
            tags,
        } => upload(ctx, path, title, description, tags).await?,
        Commands::Export { id, format, out } => {
            let file = ctx.export.export(&id, format).await?;
            let path = save_export(&file, &out).await?;
            println!("Saved {}", style(path.display()).bold());
        }
        Commands::Search {
            query,
            sort,
            from,
            to,
            exclude_types,
            tags,
            page,
        } => search(ctx, query, sort, from, to, exclude_types, tags, page).await?,
        Commands::Notifications(command) => notifications(ctx, command).await?,
        Commands::Settings(command) => settings(ctx, command).await?,
        Commands::Feedback(FeedbackCommand::Send {
            text,
            kind,
            document,
        }) => {
            ctx.feedback.submit(kind, &text, document).await?;
            println!("Thank you for your feedback!");
        }
        Commands::Feedback(FeedbackCommand::History { refresh }) => {
            let entries = ctx.feedback.history(refresh).await?;
            render::print_feedback(&entries);
        }
        Commands::Insights { id, tab, csv } => {
            let charts = ctx.insights.load(&id).await?;
            match (tab, csv) {
                (Some(tab), true) => {
                    if let Some(series) = charts.chart(tab) {
                        print!("{}", series.to_csv());
                    }
                }
                _ => render::print_insights(&charts, tab),
            }
        }
    }
    Ok(())
}

/// Load up to `pages` pages in total; the first is already loaded.
async fn load_pages<Fut>(pages: u32, mut next: impl FnMut() -> Fut) -> Result<()>
where
    Fut: std::future::Future<Output = scisummarize::ApiResult<LoadOutcome>>,
{
    for _ in 1..pages {
        if next().await? == LoadOutcome::NoMorePages {
            break;
        }
    }
    Ok(())
}

async fn print_outcome(ctx: &AppContext, outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Document(doc) => render::print_document(&doc),
        ActionOutcome::Favorite(Some(true)) => println!("Added to favorites."),
        ActionOutcome::Favorite(Some(false)) => println!("Removed from favorites."),
        ActionOutcome::Favorite(None) | ActionOutcome::Deleted(false) => {
            println!("Nothing changed.")
        }
        ActionOutcome::Deleted(true) => println!("Document deleted."),
        ActionOutcome::Navigate(path) => {
            println!("{}{}", ctx.settings.base_url.trim_end_matches('/'), path)
        }
        ActionOutcome::Exported(file) => {
            let path = save_export(&file, std::path::Path::new(".")).await?;
            println!("Saved {}", style(path.display()).bold());
        }
        ActionOutcome::Notification(true) => println!("Done."),
        ActionOutcome::Notification(false) => println!("Nothing changed."),
    }
    Ok(())
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn upload(
    ctx: &AppContext,
    path: PathBuf,
    title: Option<String>,
    description: Option<String>,
    tags: String,
) -> Result<()> {
    let mut form = UploadForm::from_path(&path)
        .await
        .with_context(|| format!("cannot upload {}", path.display()))?;
    form.title = title;
    form.description = description;
    form.tags = tags;

    let pb = spinner(format!("Checking {}", form.filename));
    let (tx, mut rx) = mpsc::channel(8);
    let progress = async {
        while let Some(event) = rx.recv().await {
            match event {
                UploadEvent::Validated {
                    filename,
                    mime_type,
                    size,
                } => pb.set_message(format!("{} ({}, {} KB)", filename, mime_type, size / 1024)),
                UploadEvent::Sending { filename } => pb.set_message(format!("Uploading {}", filename)),
                UploadEvent::Completed { .. } | UploadEvent::Failed { .. } => {}
            }
        }
    };
    let (result, _) = tokio::join!(ctx.upload.upload(form, Some(tx)), progress);
    pb.finish_and_clear();

    let document = result?;
    println!(
        "Uploaded {} ({})",
        style(&document.title).bold(),
        style(&document.id).dim()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn search(
    ctx: &AppContext,
    query: String,
    sort: SortOrder,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    exclude_types: Vec<String>,
    tags: Vec<String>,
    page: u32,
) -> Result<()> {
    let search = &ctx.search;
    // Filters first; nothing is sent while the query is empty
    search.set_sort(sort).await?;
    search.set_date_range(from, to).await?;
    for file_type in &exclude_types {
        search.toggle_type(file_type).await?;
    }
    for tag in &tags {
        search.toggle_tag(tag).await?;
    }

    if search.submit(&query).await? == SearchOutcome::EmptyQuery {
        bail!("search query is empty");
    }
    for _ in 1..page {
        if search.next_page().await? == SearchOutcome::OutOfRange {
            break;
        }
    }
    render::print_search(&search.snapshot());
    Ok(())
}

async fn notifications(ctx: &AppContext, command: NotificationCommand) -> Result<()> {
    let center = &ctx.notifications;
    center.load().await?;

    match command {
        NotificationCommand::List => {}
        NotificationCommand::Read { id } => {
            ctx.dispatch(
                Action::Notification(NotificationAction::MarkRead, id),
                &TermConfirm { assume_yes: false },
            )
            .await?;
        }
        NotificationCommand::Dismiss { id } => {
            ctx.dispatch(
                Action::Notification(NotificationAction::Dismiss, id),
                &TermConfirm { assume_yes: false },
            )
            .await?;
        }
        NotificationCommand::Clear { yes } => {
            ctx.dispatch(Action::ClearNotifications, &TermConfirm { assume_yes: yes })
                .await?;
        }
        NotificationCommand::Watch => {
            let period = ctx.settings.notification_refresh();
            let _refresh = center.spawn_auto_refresh(period);
            render::print_notifications(&center.snapshot());

            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => {
                        println!();
                        render::print_notifications(&center.snapshot());
                    }
                }
            }
            return Ok(());
        }
    }

    render::print_notifications(&center.snapshot());
    Ok(())
}

async fn settings(ctx: &AppContext, command: SettingsCommand) -> Result<()> {
    let service = &ctx.user_settings;
    let (_, source) = service.load().await;
    debug!("Settings loaded from {:?}", source);

    let saved = match command {
        SettingsCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&service.current())?);
            return Ok(());
        }
        SettingsCommand::Set { path, value } => {
            let value = serde_json::from_str(&value)
                .unwrap_or_else(|_| serde_json::Value::String(value.clone()));
            service.set_path(&path, value).await
        }
        SettingsCommand::Reset => service.reset().await,
    };
    report_saved(saved)
}

fn report_saved(saved: SavedSettings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&saved.settings)?);
    match saved.server_error {
        None => println!("Settings saved."),
        Some(e) => eprintln!(
            "{} {}",
            style("Saved locally only:").yellow(),
            e.user_message()
        ),
    }
    Ok(())
}
