mod args;

use serde::Serialize;

use args::{Args, ArgsError, Command, print_usage};
use quiz_core::model::UserId;
use services::{AppServices, Clock};

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require_user(args: &Args) -> Result<UserId, ArgsError> {
    args.user_id.ok_or(ArgsError::MissingUser {
        command: args.command.name(),
    })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    tracing::debug!(db = %args.db_url, command = args.command.name(), "starting");

    // sqlx does not create a missing database file on its own
    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), args.hearts).await?;
    if app.seeded_catalog() {
        eprintln!("catalog was empty; loaded the bundled sample");
    }

    match &args.command {
        Command::Units => print_json(&app.catalog().list_units().await?),
        Command::Questions(filter) => print_json(&app.catalog().list_questions(filter).await?),
        Command::Question(id) => print_json(&app.catalog().get_question(id).await?),
        Command::Progress => {
            let user = require_user(&args)?;
            print_json(&app.progress().progress_view(user).await?)
        }
        Command::Stats => {
            let user = require_user(&args)?;
            print_json(&app.progress().stats(user).await?)
        }
        Command::Answer {
            question_id,
            option,
        } => {
            let user = require_user(&args)?;
            print_json(&app.progress().submit_answer(user, question_id, *option).await?)
        }
        Command::Complete {
            unit_id,
            lesson_id,
            score,
            total,
        } => {
            let user = require_user(&args)?;
            let outcome = app
                .progress()
                .complete_lesson(user, unit_id, lesson_id, *score, *total)
                .await?;
            print_json(&outcome)
        }
        Command::Recommend { filter, limit } => {
            let user = require_user(&args)?;
            print_json(&app.progress().recommended(user, *filter, *limit).await?)
        }
        Command::Review => {
            let user = require_user(&args)?;
            print_json(&app.progress().review_queue(user).await?)
        }
        Command::Lesson {
            unit_id,
            lesson_id,
            answers,
        } => {
            let user = require_user(&args)?;
            play_lesson(&app, user, unit_id, lesson_id, answers).await
        }
        Command::Reset => {
            let user = require_user(&args)?;
            let fresh = app.progress().reset(user).await?;
            print_json(&services::ProgressView::from(&fresh))
        }
        Command::Leaderboard => print_json(&app.profiles().leaderboard(args.user_id).await?),
        Command::Profile(update) => {
            let user = require_user(&args)?;
            let profile = if update == &services::ProfileUpdate::default() {
                app.profiles().get_profile(user).await?
            } else {
                Some(app.profiles().update_profile(user, update.clone()).await?)
            };
            print_json(&profile)
        }
    }
}

/// Feed `answers` into a fresh attempt until they run out or the attempt ends.
async fn play_lesson(
    app: &AppServices,
    user: UserId,
    unit_id: &quiz_core::model::UnitId,
    lesson_id: &quiz_core::model::LessonId,
    answers: &[usize],
) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = app.sessions();
    let mut attempt = sessions.start_lesson(unit_id, lesson_id).await?;

    let mut results = Vec::new();
    for &option in answers {
        if attempt.is_finished() {
            break;
        }
        results.push(sessions.answer_lesson(user, &mut attempt, option).await?);
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Played<'a> {
        status: services::AttemptStatus,
        progress: services::SessionProgress,
        hearts: quiz_core::hearts::Hearts,
        next_question: Option<&'a quiz_core::model::QuestionId>,
        answers: Vec<services::LessonAnswerResult>,
    }

    print_json(&Played {
        status: attempt.status(),
        progress: attempt.progress(),
        hearts: attempt.hearts(),
        next_question: attempt.current_question().map(|q| q.id()),
        answers: results,
    })
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
