//! Astra CLI
//!
//! Command-line front end for the Astra backend and the offline
//! activities:
//! - Sign in and out, show the profile and dashboard
//! - Browse and post to the parent forum
//! - Search providers, NGOs and the resource library
//! - Take the screener
//! - Replay recorded landmark files through Magic Canvas, Magic Drums or
//!   Emotion Mirror

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use astra::activity::drums::{default_kit, level_name, GameEvent};
use astra::activity::replay::Recording;
use astra::activity::{
    ActivityRunner, DrumGame, DrumMode, EmotionMirror, MagicCanvas, MatchEvent, RunnerConfig,
};
use astra::app::{App, ForumBoard, Route};
use astra::client::dto::{LibraryQuery, PageQuery, PostCreate};
use astra::client::ApiClient;
use astra::config::{generate_default_config, Config};
use astra::screener::{AnswerChoice, Demographics, Screener, ScreenerOutcome, QUESTIONS};
use astra::session::SessionStore;
use astra::vision::Emotion;

#[derive(Parser)]
#[command(name = "astra")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Astra parent toolkit and gesture activities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/astra/config.toml, then ./astra.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend API URL, overriding the config
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Weekly stats and progress
    Dashboard {
        /// Also generate a social story for this situation
        #[arg(long)]
        story: Option<String>,
    },

    /// Parent forum
    Forum {
        #[command(subcommand)]
        command: ForumCommands,
    },

    /// Providers, NGOs and the resource library
    Resources {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Take the developmental screener
    Screener {
        /// Answers for q1..q5, comma separated (usually,sometimes,rarely or u,s,r).
        /// Prompts on stdin when omitted.
        #[arg(short, long, value_delimiter = ',')]
        answers: Vec<String>,

        /// Send the result to the backend model
        #[arg(long)]
        submit: bool,

        /// Child's name (with --submit)
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value_t = 0)]
        age: i32,
        #[arg(long, default_value = "")]
        sex: String,
        #[arg(long, default_value = "")]
        ethnicity: String,
        #[arg(long)]
        jaundice: bool,
        #[arg(long)]
        family_asd: bool,
    },

    /// Drive Magic Canvas from a recorded landmark file and export a PPM
    Replay {
        /// JSON lines of {"timestamp_ms": .., "landmarks": [..]}
        frames: PathBuf,
        /// Output image
        #[arg(short, long, default_value = "canvas.ppm")]
        output: PathBuf,
        /// Frames per second to replay at
        #[arg(long, default_value_t = 1000)]
        fps: u32,
        /// Draw the last seen hand skeleton over the image
        #[arg(long)]
        overlay: bool,
    },

    /// Play Emotion Mirror from a recorded blendshape file
    Mirror {
        /// JSON lines of {"timestamp_ms": .., "face": {"mouthSmileLeft": .., ..}}
        frames: PathBuf,
        /// Expression to copy (happy, surprised, neutral)
        #[arg(short, long, default_value = "happy")]
        target: Emotion,
        #[arg(long, default_value_t = 1000)]
        fps: u32,
    },

    /// Play Magic Drums from a recorded landmark file
    Drums {
        frames: PathBuf,
        /// free or sequence (default from config)
        #[arg(short, long)]
        mode: Option<DrumMode>,
        /// Seed for the drum sequence
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 1000)]
        fps: u32,
    },

    /// Print a default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ForumCommands {
    /// List posts
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show a post with its comments
    Show { id: i64 },
    /// Create a post
    Post {
        title: String,
        content: String,
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Reply to a post
    Comment { id: i64, text: String },
}

#[derive(Subcommand)]
pub enum ResourceCommands {
    /// Therapists, pediatricians and clinics
    Providers {
        /// Filter by type (e.g. therapist)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
    },
    /// Support organisations
    Ngos,
    /// Articles and guides
    Library {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        challenge: Option<String>,
        #[arg(long)]
        age: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    astra::logging::init(&config.logging);

    let json = match cli.format.as_str() {
        "json" => true,
        "table" => false,
        other => bail!("Unknown output format: {other}"),
    };

    match cli.command {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{content}"),
            }
        }

        Commands::Screener {
            answers,
            submit,
            name,
            age,
            sex,
            ethnicity,
            jaundice,
            family_asd,
        } => {
            let outcome = if answers.is_empty() {
                run_interactive_screener()?
            } else {
                run_scripted_screener(&answers)?
            };
            print_outcome(&outcome, json)?;

            if submit {
                let mut app = connect(&config)?;
                let request = outcome.to_submit_request(&Demographics {
                    name,
                    age,
                    sex,
                    ethnicity,
                    jaundice,
                    family_asd,
                });
                let result = app.client().submit_screener(&request).await;
                let response = app.guard(result).await?;
                emit(json, &response, |r| {
                    println!();
                    println!("Backend assessment: {}", r.risk_level);
                    println!("{}", r.analysis_summary);
                    if let Some(confidence) = r.confidence_score {
                        println!("Confidence: {:.0}%", confidence * 100.0);
                    }
                })?;
            }
        }

        Commands::Replay {
            frames,
            output,
            fps,
            overlay,
        } => {
            replay_canvas(&config, &frames, &output, fps, overlay).await?;
        }

        Commands::Drums {
            frames,
            mode,
            seed,
            fps,
        } => {
            let mode = mode.unwrap_or(config.drums.mode);
            play_drums(&config, &frames, mode, seed, fps).await?;
        }

        Commands::Mirror {
            frames,
            target,
            fps,
        } => {
            play_mirror(&config, &frames, target, fps).await?;
        }

        Commands::Login { username, password } => {
            login(&mut connect(&config)?, &username, password).await?;
        }

        Commands::Logout => {
            connect(&config)?.logout().await?;
            println!("Signed out");
        }

        Commands::Whoami => whoami(&mut connect(&config)?, json).await?,

        Commands::Register {
            username,
            email,
            password,
        } => {
            register(&connect(&config)?, &username, &email, password, json).await?;
        }

        Commands::Dashboard { story } => dashboard(&mut connect(&config)?, story, json).await?,

        Commands::Forum { command } => {
            let mut app = connect(&config)?;
            let route = match &command {
                ForumCommands::Show { id } | ForumCommands::Comment { id, .. } => Route::Post(*id),
                ForumCommands::List { .. } | ForumCommands::Post { .. } => Route::Forum,
            };
            require(&mut app, route).await?;
            run_forum(&mut app, command, json).await?;
        }

        Commands::Resources { command } => {
            let mut app = connect(&config)?;
            let route = match &command {
                ResourceCommands::Library { .. } => Route::Library,
                ResourceCommands::Providers { .. } | ResourceCommands::Ngos => Route::Resources,
            };
            require(&mut app, route).await?;
            run_resources(&mut app, command, json).await?;
        }
    }

    Ok(())
}

// ============================================================================
// BACKEND COMMANDS
// ============================================================================

fn connect(config: &Config) -> anyhow::Result<App> {
    let session = Arc::new(SessionStore::open_in(config.storage.data_path()));
    let client = ApiClient::new(config.api.client_config(), session)?;
    Ok(App::new(client))
}

async fn login(app: &mut App, username: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_line("Password: ")?,
    };
    let route = app.login(username, &password).await?;
    println!("Signed in as {username} ({})", route);
    Ok(())
}

async fn whoami(app: &mut App, json: bool) -> anyhow::Result<()> {
    require(app, Route::Dashboard).await?;
    let user = app.refresh().await?;
    emit(json, &user, |u| println!("{} <{}> (id {})", u.username, u.email, u.id))
}

async fn register(
    app: &App,
    username: &str,
    email: &str,
    password: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_line("Password: ")?,
    };
    let user = app.register(username, email, &password).await?;
    emit(json, &user, |u| {
        println!("Registered {} (id {}). Sign in with `astra login {}`.", u.username, u.id, u.username)
    })
}

async fn dashboard(app: &mut App, story: Option<String>, json: bool) -> anyhow::Result<()> {
    require(app, Route::Dashboard).await?;

    let result = app.client().dashboard_stats().await;
    let stats = app.guard(result).await?;
    let result = app.client().dashboard_progress().await;
    let progress = app.guard(result).await?;

    if json {
        print_json(&serde_json::json!({ "stats": stats, "progress": progress }))?;
    } else {
        println!("Screener result:     {} (assessed {})", stats.screener_result.level, stats.screener_result.last_assessed);
        println!("Activities this week: {} ({:+})", stats.activities_this_week.count, stats.activities_this_week.change);
        println!("Completion rate:     {:.0}% ({})", stats.completion_rate.rate * 100.0, stats.completion_rate.period);
        println!();
        println!("{:<6} {:>9} {:>8}", "Day", "Completed", "Skipped");
        for point in &progress {
            println!("{:<6} {:>9} {:>8}", point.date, point.completed, point.skipped);
        }
    }

    if let Some(situation) = story {
        let result = app.client().story_weaver(&situation).await;
        let story = app.guard(result).await?;
        emit(json, &story, |s| {
            println!();
            println!("Story: {}", s.situation);
            for (i, step) in s.steps.iter().enumerate() {
                println!("  {}. {} [{}]", i + 1, step.text, step.illustration);
            }
        })?;
    }
    Ok(())
}

/// Resolve the route; protected pages without a session send the user
/// to `astra login`
async fn require(app: &mut App, route: Route) -> anyhow::Result<()> {
    if !app.check_auth().await || app.navigate(route).await == Route::Login {
        bail!("Not signed in. Run `astra login <username>` first.");
    }
    Ok(())
}

async fn run_forum(app: &mut App, command: ForumCommands, json: bool) -> anyhow::Result<()> {
    let board = ForumBoard::new(app.client().clone());

    match command {
        ForumCommands::List { page, limit } => {
            let mut board = board.with_page(PageQuery { page, limit });
            let result = board.load().await.map(|posts| posts.to_vec());
            let posts = app.guard(result).await?;
            emit(json, &posts, |posts| {
                if posts.is_empty() {
                    println!("No posts yet.");
                }
                for post in posts {
                    println!("#{:<4} {}  ({} replies, by {})", post.id, post.title, post.replies, post.author.username);
                    println!("      {}", post.excerpt);
                    if !post.tags.is_empty() {
                        println!("      [{}]", post.tags.join(", "));
                    }
                }
            })?;
        }

        ForumCommands::Show { id } => {
            let result = board.open(id).await;
            let post = app.guard(result).await?;
            emit(json, &post, |post| {
                println!("{}", post.title);
                println!("by {} on {}", post.author.username, post.created_at.format("%Y-%m-%d %H:%M"));
                println!();
                println!("{}", post.content);
                for comment in &post.comments {
                    println!();
                    println!("  {} ({}):", comment.author.username, comment.created_at.format("%Y-%m-%d %H:%M"));
                    println!("  {}", comment.text);
                }
            })?;
        }

        ForumCommands::Post {
            title,
            content,
            tag,
        } => {
            let mut board = board;
            let result = board
                .create(PostCreate {
                    title,
                    content,
                    tags: tag,
                })
                .await;
            let post = app.guard(result).await?;
            emit(json, &post, |p| println!("Posted #{}: {}", p.id, p.title))?;
        }

        ForumCommands::Comment { id, text } => {
            let mut board = board;
            let result = board.comment(id, &text).await;
            let comment = app.guard(result).await?;
            emit(json, &comment, |c| println!("Comment #{} added to post #{id}", c.id))?;
        }
    }

    Ok(())
}

async fn run_resources(app: &mut App, command: ResourceCommands, json: bool) -> anyhow::Result<()> {
    match command {
        ResourceCommands::Providers { kind } => {
            let result = app.client().providers(kind.as_deref()).await;
            let providers = app.guard(result).await?;
            emit(json, &providers, |providers| {
                for p in providers {
                    println!("{} ({}, {})", p.name, p.kind, p.location);
                    println!("  {}", p.description);
                    if !p.specialties.is_empty() {
                        println!("  Specialties: {}", p.specialties.join(", "));
                    }
                }
            })?;
        }

        ResourceCommands::Ngos => {
            let result = app.client().ngos().await;
            let ngos = app.guard(result).await?;
            emit(json, &ngos, |ngos| {
                for n in ngos {
                    println!("{} ({:.4}, {:.4})", n.name, n.position.lat, n.position.lng);
                    println!("  {}", n.description);
                }
            })?;
        }

        ResourceCommands::Library {
            page,
            limit,
            search,
            challenge,
            age,
        } => {
            let query = LibraryQuery {
                page: page.max(1),
                limit: limit.max(1),
                search,
                challenge,
                age,
            };
            let result = app.client().library(&query).await;
            let items = app.guard(result).await?;
            emit(json, &items, |items| {
                for item in &items.data {
                    println!("[{}] {}", item.kind, item.title);
                    if !item.description.is_empty() {
                        println!("  {}", item.description);
                    }
                }
                println!();
                println!(
                    "Page {} of {} ({} items)",
                    items.pagination.current_page, items.pagination.total_pages, items.pagination.total_items
                );
            })?;
        }
    }

    Ok(())
}

// ============================================================================
// SCREENER
// ============================================================================

fn run_scripted_screener(answers: &[String]) -> anyhow::Result<ScreenerOutcome> {
    if answers.len() != QUESTIONS.len() {
        bail!("Expected {} answers, got {}", QUESTIONS.len(), answers.len());
    }

    let mut screener = Screener::new();
    for (i, answer) in answers.iter().enumerate() {
        screener.answer(answer.parse::<AnswerChoice>()?)?;
        if i + 1 < answers.len() {
            screener.next()?;
        }
    }
    Ok(screener.submit()?)
}

fn run_interactive_screener() -> anyhow::Result<ScreenerOutcome> {
    let mut screener = Screener::new();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Answer each question with (u)sually, (s)ometimes or (r)arely. Enter b to go back.");
    loop {
        let question = screener.current_question();
        println!();
        println!(
            "Question {} of {} ({:.0}%)",
            screener.current_index() + 1,
            screener.total(),
            screener.progress() * 100.0
        );
        println!("{}", question.text);
        if let Some(previous) = screener.current_answer() {
            println!("(current answer: {previous})");
        }
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            bail!("Screener aborted");
        };
        let line = line?;
        let input = line.trim();

        if input.eq_ignore_ascii_case("b") {
            if let Err(e) = screener.back() {
                println!("{e}");
            }
            continue;
        }

        match input.parse::<AnswerChoice>() {
            Ok(choice) => screener.answer(choice)?,
            Err(e) if input.is_empty() && screener.current_answer().is_some() => {
                tracing::trace!(error = %e, "Keeping previous answer");
            }
            Err(e) => {
                println!("{e}");
                continue;
            }
        }

        if screener.is_last() {
            return Ok(screener.submit()?);
        }
        screener.next()?;
    }
}

fn print_outcome(outcome: &ScreenerOutcome, json: bool) -> anyhow::Result<()> {
    emit(json, outcome, |o| {
        println!();
        println!("{}", o.risk.title());
        println!("Score: {} / {}", o.score, QUESTIONS.len() * 2);
        println!();
        println!("{}", o.risk.guidance());
        println!();
        println!("Next steps:");
        println!("  - Share these results with your pediatrician.");
        println!("  - Explore the articles in the resource library (astra resources library).");
        println!("  - Connect with specialists in the Resource Hub (astra resources providers).");
        println!();
        println!("This screener is a guide, not a diagnosis.");
    })
}

// ============================================================================
// OFFLINE ACTIVITIES
// ============================================================================

async fn replay_canvas(
    config: &Config,
    frames: &Path,
    output: &Path,
    fps: u32,
    overlay: bool,
) -> anyhow::Result<()> {
    let recording = Recording::load(frames).with_context(|| format!("loading {}", frames.display()))?;
    let last_ms = recording.frames().last().map_or(0, |f| f.timestamp_ms);
    let canvas_config = config.canvas.magic_canvas_config()?;
    let (width, height) = (canvas_config.tracker.width, canvas_config.tracker.height);
    let (camera, detector) = recording.into_devices(width, height);

    let activity = MagicCanvas::new(canvas_config)?;
    let mut runner = ActivityRunner::new(camera, detector, activity, RunnerConfig { fps });

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let summary = runner.run(shutdown_rx).await?;

    let file = std::fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let image = if overlay {
        runner.activity().overlay(last_ms)
    } else {
        runner.activity().composite(last_ms)
    };
    image.write_ppm(&mut writer)?;
    writer.flush()?;

    println!(
        "{} frames, {} with a hand, {} segments drawn",
        summary.frames, summary.detections, summary.segments
    );
    println!(
        "{} painted pixels written to {}",
        image.painted_pixels(),
        output.display()
    );
    Ok(())
}

async fn play_mirror(config: &Config, frames: &Path, target: Emotion, fps: u32) -> anyhow::Result<()> {
    let recording = Recording::load(frames).with_context(|| format!("loading {}", frames.display()))?;
    let (camera, detector) = recording.into_face_devices(config.canvas.width, config.canvas.height);
    let mirror = EmotionMirror::new(target, config.emotion.thresholds());

    println!("{}", target.prompt());
    let (tx, mut rx) = mpsc::channel::<astra::activity::MirrorReport>(64);
    let printer = tokio::spawn(async move {
        while let Some(report) = rx.recv().await {
            if let Some(MatchEvent::Matched(emotion)) = report.event {
                println!("  ✓ {emotion}!");
            }
        }
    });

    let mut runner =
        ActivityRunner::new(camera, detector, mirror, RunnerConfig { fps }).with_reports(tx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let summary = runner.run(shutdown_rx).await?;
    let matches = runner.activity().match_count();
    drop(runner);
    printer.await?;

    println!();
    println!(
        "{} frames, {} with a face, matched {target} {matches} time(s)",
        summary.frames, summary.detections
    );
    Ok(())
}

async fn play_drums(
    config: &Config,
    frames: &Path,
    mode: DrumMode,
    seed: Option<u64>,
    fps: u32,
) -> anyhow::Result<()> {
    let recording = Recording::load(frames).with_context(|| format!("loading {}", frames.display()))?;
    let (camera, detector) = recording.into_devices(config.canvas.width, config.canvas.height);

    let cooldown = config.drums.cooldown_ms;
    let game = match seed {
        Some(seed) => DrumGame::with_seed(default_kit(), cooldown, mode, seed),
        None => DrumGame::new(default_kit(), cooldown, mode),
    };

    let (tx, mut rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        let mut next: Option<String> = None;
        while let Some(report) = rx.recv().await {
            let report: astra::activity::DrumsReport = report;
            for hit in &report.hits {
                println!("♪ {hit}");
            }
            for event in &report.events {
                match event {
                    GameEvent::Correct { step } => println!("  ✓ step {}", step + 1),
                    GameEvent::RoundComplete { bonus } => {
                        println!("  Round complete! +{bonus} (score {})", report.score)
                    }
                    GameEvent::LevelUp { level } => {
                        println!("  Level up: {}", level_name(*level))
                    }
                    GameEvent::Miss { expected, hit } => {
                        println!("  ✗ expected {expected}, got {hit}")
                    }
                }
            }
            if report.expected != next {
                if let Some(drum) = &report.expected {
                    println!("Next: {drum}");
                }
                next = report.expected;
            }
        }
    });

    let mut runner =
        ActivityRunner::new(camera, detector, game, RunnerConfig { fps }).with_reports(tx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let summary = runner.run(shutdown_rx).await?;

    let game = runner.activity();
    let (score, streak, level) = (game.score(), game.streak(), game.level());
    drop(runner);
    printer.await?;

    println!();
    println!("{} frames played", summary.frames);
    if mode == DrumMode::Sequence {
        println!("Score {score}, streak {streak}, level {}", level_name(level));
    }
    Ok(())
}

// ============================================================================
// OUTPUT
// ============================================================================

fn emit<T: Serialize>(json: bool, value: &T, table: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        print_json(value)
    } else {
        table(value);
        Ok(())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
