mod app;
mod auth;
mod backend;
mod colors;
mod config;
mod deezer;
mod enrich;
mod error;
mod lyrics;
mod pipeline;
mod search;
mod snippets;
mod social;
mod storage;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::auth::account_failure;
use crate::backend::models::{ConnectionKind, SignUpOutcome, Snippet};
use crate::colors::{darken, lighten};
use crate::lyrics::{LyricSheet, LyricsOutcome, SongRef};
use crate::pipeline::{BackfillReport, SnippetDraft};
use crate::search::{SearchHit, SearchMode, Selection};
use crate::social::TopArtist;
use crate::storage::prefs::{self, FontId, Preference, SnippetsLayout, ThemeId};

#[derive(Debug, Parser)]
#[command(name = "snipify", version, about = "Save and share lyric snippets (headless client)")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and its profile.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
        #[arg(long)]
        name: String,
    },
    /// Send a password reset email.
    Recover {
        #[arg(long)]
        email: String,
    },
    /// Sign out and forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,

    /// Search songs (or people with --friends).
    Search {
        query: String,
        #[arg(long)]
        friends: bool,
        /// Pick the Nth result (1-based), as if tapped.
        #[arg(long)]
        pick: Option<usize>,
        /// Save these 1-based lines of the picked song as a snippet.
        #[arg(long, requires = "pick")]
        lines: Option<String>,
    },
    /// Show recent song picks.
    Recent,
    /// Print numbered lyrics for a song.
    Lyrics {
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
    },
    /// Save a snippet from selected lyric lines.
    Snip {
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        album_art: Option<String>,
        /// 1-based lines, e.g. `3-5` or `2,4`.
        #[arg(long)]
        lines: String,
    },
    /// List snippets (yours by default) and backfill missing colors.
    List {
        #[arg(long)]
        user: Option<String>,
        /// list or grid, for this listing only.
        #[arg(long)]
        layout: Option<String>,
    },
    /// Show one of your snippets against the current lyrics.
    Show { id: String },
    /// Re-select the lyric lines of one of your snippets.
    Edit {
        id: String,
        #[arg(long)]
        lines: String,
    },
    /// Delete one of your snippets.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Show a profile: stats, top artists, artists in common.
    Profile { user_id: Option<String> },
    /// Follow or unfollow a user.
    Follow { user_id: String },
    /// List followers or followed users.
    Connections {
        user_id: Option<String>,
        #[arg(long)]
        following: bool,
    },
    /// Change your display name.
    Rename { name: String },
    /// Upload a profile photo (JPEG).
    Photo { path: std::path::PathBuf },
    /// Show or change local preferences.
    Prefs {
        /// default, cream or flat.
        #[arg(long)]
        theme: Option<String>,
        /// default or Doto.
        #[arg(long)]
        font: Option<String>,
        /// list or grid.
        #[arg(long, conflicts_with = "toggle_layout")]
        layout: Option<String>,
        /// Switch between list and grid.
        #[arg(long)]
        toggle_layout: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;
    let app = app::App::new(cfg)?;
    run(&app, cli.command).await
}

async fn run(app: &app::App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = app
                .accounts
                .login(&email, &password)
                .await
                .map_err(account_failure)?;
            println!("Signed in as {}", describe_user(&session.user));
        }
        Command::Signup {
            email,
            password,
            confirm,
            name,
        } => {
            let form = auth::SignUpForm {
                email,
                password,
                confirm_password: confirm,
                full_name: name,
            };
            match app.accounts.sign_up(&form).await.map_err(account_failure)? {
                SignUpOutcome::SignedIn(user) => println!("Welcome, {}", describe_user(&user)),
                SignUpOutcome::ConfirmationRequired(_) => {
                    println!("Check your email to confirm your account!")
                }
            }
        }
        Command::Recover { email } => {
            app.accounts.recover(&email).await.map_err(account_failure)?;
            println!("Check your email for a password reset link");
        }
        Command::Logout => {
            app.accounts.sign_out().await.map_err(account_failure)?;
            println!("Signed out.");
        }
        Command::Whoami => {
            let backend = &app.config().backend;
            if !backend.is_configured() {
                println!("Backend not configured.");
                return Ok(());
            }
            match app.accounts.current_user().await.map_err(account_failure)? {
                Some(user) => println!("{} on {}", describe_user(&user), backend.url),
                None => println!("Not signed in."),
            }
        }

        Command::Search {
            query,
            friends,
            pick,
            lines,
        } => {
            let mut flow = app.search_flow().await;
            if friends {
                flow.set_mode(SearchMode::Friends);
            }
            flow.input(&query);
            flow.settle().await;
            tracing::debug!(
                "{:?} search for {:?} ended {:?}",
                flow.mode(),
                flow.query(),
                flow.status()
            );

            if let Some(message) = flow.message() {
                println!("{message}");
                return Ok(());
            }
            print_hits(flow.results());

            if let Some(n) = pick {
                let hit = n
                    .checked_sub(1)
                    .and_then(|i| flow.results().get(i))
                    .cloned()
                    .with_context(|| format!("no result #{n}"))?;
                match flow.select(hit).await {
                    Selection::OpenProfile(user_id) => {
                        anyhow::ensure!(lines.is_none(), "--lines only applies to songs");
                        print_profile(app, &user_id).await?
                    }
                    Selection::OpenLyrics(song) => {
                        let outcome = app.lyrics(&SongRef::from(&song)).await;
                        match lines {
                            Some(picks) => {
                                let lyrics = app::compose_picks(outcome, &picks)?;
                                app.pipeline
                                    .save(SnippetDraft::from_song(&song, lyrics.clone()))
                                    .await?;
                                println!("Saved:\n{lyrics}");
                            }
                            None => print_outcome(&outcome, None),
                        }
                    }
                }
            }
        }
        Command::Recent => {
            let mut flow = app.search_flow().await;
            flow.focus();
            if !(flow.is_open() && flow.shows_history()) {
                println!("No recent searches.");
                return Ok(());
            }
            for (i, entry) in flow.recent().entries().iter().enumerate() {
                println!("{:02}. {} - {}", i + 1, entry.song.title, entry.song.artist_names);
            }
        }
        Command::Lyrics { title, artist } => {
            let song = SongRef {
                title,
                artist_names: artist,
                album_name: None,
                duration: None,
            };
            print_outcome(&app.lyrics(&song).await, None);
        }
        Command::Snip {
            title,
            artist,
            album_art,
            lines,
        } => {
            let song = SongRef {
                title: title.clone(),
                artist_names: artist.clone(),
                album_name: None,
                duration: None,
            };
            let lyrics = app::compose_picks(app.lyrics(&song).await, &lines)?;

            app.pipeline
                .save(SnippetDraft {
                    song_title: title,
                    artist_name: artist,
                    album_art_url: album_art,
                    lyrics: lyrics.clone(),
                })
                .await?;
            println!("Saved:\n{lyrics}");
        }
        Command::List { user, layout } => {
            let layout_override = layout
                .as_deref()
                .map(parse_pref::<SnippetsLayout>)
                .transpose()?;
            let cancel = CancellationToken::new();
            let guard = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    guard.cancel();
                }
            });

            let (mut view, report) = match user {
                None => app.my_snippets(&cancel).await,
                Some(user_id) => {
                    let layout = prefs::load::<SnippetsLayout>(app.storage()).await;
                    let mut view =
                        snippets::SnippetsView::new(app.repo().list_for_user(&user_id).await, layout);
                    let report = app.pipeline.backfill(&mut view, &cancel).await;
                    (view, report)
                }
            };
            if let Some(layout) = layout_override {
                view.set_layout(layout);
            }
            if view.is_empty() {
                println!("No snippets yet.");
            }
            print_rows(&view);
            print_backfill(&report);
        }
        Command::Show { id } => {
            let snippet = find_mine(app, &id).await?;
            println!("{}", describe_snippet(&snippet));
            let (outcome, sheet) = app.snippet_sheet(&snippet).await;
            print_outcome(&outcome, sheet.as_ref());
        }
        Command::Edit { id, lines } => {
            let mut snippet = find_mine(app, &id).await?;
            let lyrics = app::compose_picks(app.snippet_sheet(&snippet).await.0, &lines)?;
            snippet.lyrics = lyrics;
            app.repo().update(&snippet).await?;
            println!("Updated:\n{}", snippet.lyrics);
        }
        Command::Delete { id, yes } => {
            let cancel = CancellationToken::new();
            cancel.cancel();
            let (mut view, _) = app.my_snippets(&cancel).await;
            let snippet = view
                .items()
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .with_context(|| format!("no snippet {id}"))?;
            let question = format!("Delete \"{}\" by {}?", snippet.song_title, snippet.artist_name);
            if !yes && !confirm(&question)? {
                println!("Kept.");
                return Ok(());
            }
            view.delete(app.repo(), &id).await?;
            println!("Deleted. {} snippets left.", view.items().len());
        }

        Command::Profile { user_id } => {
            let user_id = match user_id {
                Some(id) => id,
                None => app.repo().require_user().await?.id,
            };
            print_profile(app, &user_id).await?;
        }
        Command::Follow { user_id } => {
            let mut state = app.social.follow_state(&user_id).await?;
            app.social.toggle_follow(&mut state).await?;
            println!(
                "{} {} ({})",
                if state.is_following { "Following" } else { "Unfollowed" },
                user_id,
                social::artists::plural(state.followers_count as usize, "follower")
            );
        }
        Command::Connections {
            user_id,
            following,
        } => {
            let user_id = match user_id {
                Some(id) => id,
                None => app.repo().require_user().await?.id,
            };
            let kind = if following {
                ConnectionKind::Following
            } else {
                ConnectionKind::Followers
            };
            let people = app.social.connections(&user_id, kind).await?;
            if people.is_empty() {
                println!("No {} yet.", kind.label());
            }
            for p in people {
                println!("{}  ({})", p.display_name(), p.id);
            }
        }
        Command::Rename { name } => {
            app.social.rename(&name).await?;
            println!("Name updated.");
        }
        Command::Photo { path } => {
            let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            let url = app.social.upload_photo(bytes).await?;
            println!("Profile photo updated: {url}");
        }
        Command::Prefs {
            theme,
            font,
            layout,
            toggle_layout,
        } => {
            let storage = app.storage();
            if toggle_layout {
                let current = prefs::load::<SnippetsLayout>(storage).await;
                prefs::store(storage, current.toggled()).await?;
            }
            if let Some(raw) = theme {
                prefs::store(storage, parse_pref::<ThemeId>(&raw)?).await?;
            }
            if let Some(raw) = font {
                prefs::store(storage, parse_pref::<FontId>(&raw)?).await?;
            }
            if let Some(raw) = layout {
                prefs::store(storage, parse_pref::<SnippetsLayout>(&raw)?).await?;
            }
            println!("theme:  {}", prefs::load::<ThemeId>(storage).await.as_str());
            println!("font:   {}", prefs::load::<FontId>(storage).await.as_str());
            println!("layout: {}", prefs::load::<SnippetsLayout>(storage).await.as_str());
        }
    }

    Ok(())
}

fn parse_pref<P: Preference>(raw: &str) -> anyhow::Result<P> {
    P::parse(raw.trim()).with_context(|| format!("unknown {} value {raw:?}", P::KEY))
}

async fn find_mine(app: &app::App, id: &str) -> anyhow::Result<Snippet> {
    app.repo()
        .list_mine()
        .await
        .into_iter()
        .find(|s| s.id == id)
        .with_context(|| format!("no snippet {id}"))
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    use std::io::Write;

    print!("{question} [y/N] ");
    std::io::stdout().flush().context("flush stdout")?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer).context("read answer")?;
    Ok(app::is_affirmative(&answer))
}

fn describe_user(user: &backend::models::AuthUser) -> String {
    match &user.email {
        Some(email) => format!("{email} ({})", user.id),
        None => user.id.clone(),
    }
}

fn describe_snippet(s: &Snippet) -> String {
    let color = s
        .color_pair()
        .map(|c| {
            format!(
                " [{c} text {} card {}]",
                darken(c.primary(), 0.55),
                lighten(c.primary(), 0.4)
            )
        })
        .unwrap_or_default();
    let first = s.lyric_lines().next().unwrap_or_default();
    format!("{} - {}{}  \"{}\"  ({})", s.song_title, s.artist_name, color, first, s.id)
}

fn print_rows(view: &snippets::SnippetsView) {
    tracing::debug!("{} layout", view.layout().as_str());
    for row in view.rows() {
        let cells: Vec<String> = row.iter().map(describe_snippet).collect();
        println!("{}", cells.join("   |   "));
    }
}

fn print_backfill(report: &BackfillReport) {
    if report.updated > 0 || report.failed > 0 {
        println!(
            "Colored {}, {} skipped, {} failed{}.",
            social::artists::plural(report.updated, "snippet"),
            report.skipped,
            report.failed,
            if report.cancelled { ", stopped early" } else { "" }
        );
    }
}

fn print_hits(hits: &[SearchHit]) {
    for (i, hit) in hits.iter().enumerate() {
        match hit {
            SearchHit::Song(song) => println!(
                "{:02}. {} - {}  ({})",
                i + 1,
                song.title,
                song.artist_names,
                song.album_name
            ),
            SearchHit::User(user) => println!("{:02}. {}  (user {})", i + 1, user.full_name, user.id),
        }
    }
}

fn print_outcome(outcome: &LyricsOutcome, sheet: Option<&LyricSheet>) {
    match outcome {
        LyricsOutcome::Lines(lines) => {
            for (i, line) in lines.iter().enumerate() {
                let mark = if sheet.is_some_and(|s| s.is_selected(i)) { '>' } else { ' ' };
                println!("{mark}{:3}  {line}", i + 1);
            }
        }
        other => println!("{}", other.message().unwrap_or_default()),
    }
}

async fn print_profile(app: &app::App, user_id: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let layout = prefs::load::<SnippetsLayout>(app.storage()).await;
    let (view, stats) = tokio::join!(
        app.social.public_profile(user_id, layout, &cancel),
        app.social.stats(user_id),
    );

    let name = view
        .profile
        .as_ref()
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| "Unknown profile".to_string());
    println!("{name}{}", if view.is_own { " (you)" } else { "" });
    println!(
        "{} · {} · {} following",
        social::artists::plural(stats.snippets as usize, "snippet"),
        social::artists::plural(stats.followers as usize, "follower"),
        stats.following
    );
    if let Some(follow) = &view.follow
        && !view.is_own
    {
        println!("{}", if follow.is_following { "You follow them." } else { "Not following." });
    }

    if !view.artists_in_common.is_empty() {
        println!(
            "{} in common:",
            social::artists::plural(view.artists_in_common.len(), "artist")
        );
        for a in &view.artists_in_common {
            println!("  {}  {}", a.name, a.image_url.as_deref().unwrap_or("-"));
        }
    }

    let top: Vec<TopArtist> = social::top_artists(view.snippets.items());
    if !top.is_empty() {
        println!("Top artists:");
        for a in top.iter().take(social::artists::TOP_ARTISTS_SUMMARY) {
            println!(
                "  {} ({})  {}",
                a.name,
                social::artists::plural(a.count, "snippet"),
                if a.image_url.is_empty() { "-" } else { a.image_url.as_str() }
            );
        }
    }

    print_rows(&view.snippets);
    print_backfill(&view.backfill);
    Ok(())
}
