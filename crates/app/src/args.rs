use std::fmt;
use std::str::FromStr;

use quiz_core::hearts::HeartsSettings;
use quiz_core::model::{
    Category, CompanySize, Difficulty, LessonId, QuestionFilter, QuestionId, Role, UnitId, UserId,
};
use quiz_core::recommend::RecommendationFilter;
use services::ProfileUpdate;

#[derive(Debug)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingArgument { command: &'static str, name: &'static str },
    UnknownArg(String),
    InvalidValue { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingUser { command: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "no command given"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidValue { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingUser { command } => {
                write!(f, "{command} needs a user (--user or QUIZ_USER_ID)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_value<T: FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidValue { flag, raw })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [args] [--db <sqlite_url>] [--user <uuid>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  units                                   List units and lessons");
    eprintln!("  questions [filters]                     List catalog questions");
    eprintln!("  question <id>                           Show one question");
    eprintln!("  progress                                Full progress record");
    eprintln!("  stats                                   Dashboard counters");
    eprintln!("  answer <question-id> <option>           Submit one answer");
    eprintln!("  complete <unit> <lesson> <score> <total> Record a finished lesson");
    eprintln!("  recommend [--difficulty d] [--company-size s] [--limit n]");
    eprintln!("  review                                  Questions in the review queue");
    eprintln!("  lesson <unit> <lesson> --answers 1,0,2  Play a lesson attempt with hearts");
    eprintln!("  reset                                   Wipe the user's progress");
    eprintln!("  leaderboard                             Users ranked by XP");
    eprintln!("  profile [--name n] [--difficulty d] [--company-size s]");
    eprintln!();
    eprintln!("Filters for questions:");
    eprintln!("  --unit <id> --role <role> --difficulty <d> --category <c> --company-size <s>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --hearts 5");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER_ID, QUIZ_HEARTS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Units,
    Questions(QuestionFilter),
    Question(QuestionId),
    Progress,
    Stats,
    Answer {
        question_id: QuestionId,
        option: usize,
    },
    Complete {
        unit_id: UnitId,
        lesson_id: LessonId,
        score: u32,
        total: u32,
    },
    Recommend {
        filter: RecommendationFilter,
        limit: Option<usize>,
    },
    Review,
    Lesson {
        unit_id: UnitId,
        lesson_id: LessonId,
        answers: Vec<usize>,
    },
    Reset,
    Leaderboard,
    Profile(ProfileUpdate),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Units => "units",
            Self::Questions(_) => "questions",
            Self::Question(_) => "question",
            Self::Progress => "progress",
            Self::Stats => "stats",
            Self::Answer { .. } => "answer",
            Self::Complete { .. } => "complete",
            Self::Recommend { .. } => "recommend",
            Self::Review => "review",
            Self::Lesson { .. } => "lesson",
            Self::Reset => "reset",
            Self::Leaderboard => "leaderboard",
            Self::Profile(_) => "profile",
        }
    }

    /// Catalog-only commands and the leaderboard work without a user.
    fn needs_user(&self) -> bool {
        !matches!(
            self,
            Self::Units | Self::Questions(_) | Self::Question(_) | Self::Leaderboard
        )
    }
}

#[derive(Debug, Default)]
struct Flags {
    unit: Option<UnitId>,
    role: Option<Role>,
    difficulty: Option<Difficulty>,
    category: Option<Category>,
    company_size: Option<CompanySize>,
    limit: Option<usize>,
    name: Option<String>,
    answers: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Args {
    pub db_url: String,
    pub user_id: Option<UserId>,
    pub hearts: HeartsSettings,
    pub command: Command,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = std::env::var("QUIZ_USER_ID")
            .ok()
            .and_then(|value| value.parse::<UserId>().ok());
        let mut hearts = std::env::var("QUIZ_HEARTS")
            .ok()
            .and_then(|value| value.parse::<u8>().ok())
            .and_then(|value| HeartsSettings::new(value).ok())
            .unwrap_or_default();

        let mut flags = Flags::default();
        let mut positional = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    user_id = Some(parse_value("--user", require_value(&mut args, "--user")?)?);
                }
                "--hearts" => {
                    let raw = require_value(&mut args, "--hearts")?;
                    let max = parse_value::<u8>("--hearts", raw.clone())?;
                    hearts = HeartsSettings::new(max)
                        .map_err(|_| ArgsError::InvalidValue { flag: "--hearts", raw })?;
                }
                "--unit" => {
                    flags.unit = Some(UnitId::new(require_value(&mut args, "--unit")?));
                }
                "--role" => {
                    flags.role = Some(parse_value("--role", require_value(&mut args, "--role")?)?);
                }
                "--difficulty" => {
                    let raw = require_value(&mut args, "--difficulty")?;
                    flags.difficulty = Some(parse_value("--difficulty", raw)?);
                }
                "--category" => {
                    flags.category = Some(Category::new(require_value(&mut args, "--category")?));
                }
                "--company-size" => {
                    let raw = require_value(&mut args, "--company-size")?;
                    flags.company_size = Some(parse_value("--company-size", raw)?);
                }
                "--limit" => {
                    flags.limit = Some(parse_value("--limit", require_value(&mut args, "--limit")?)?);
                }
                "--name" => {
                    flags.name = Some(require_value(&mut args, "--name")?);
                }
                "--answers" => {
                    let raw = require_value(&mut args, "--answers")?;
                    flags.answers = raw
                        .split(',')
                        .map(|part| parse_value("--answers", part.trim().to_string()))
                        .collect::<Result<_, _>>()?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if other.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let command = build_command(positional, flags)?;
        if command.needs_user() && user_id.is_none() {
            return Err(ArgsError::MissingUser {
                command: command.name(),
            });
        }

        Ok(Self {
            db_url,
            user_id,
            hearts,
            command,
        })
    }
}

fn build_command(positional: Vec<String>, flags: Flags) -> Result<Command, ArgsError> {
    let mut positional = positional.into_iter();
    let Some(name) = positional.next() else {
        return Err(ArgsError::MissingCommand);
    };

    let mut arg = |command: &'static str, name: &'static str| {
        positional
            .next()
            .ok_or(ArgsError::MissingArgument { command, name })
    };

    let command = match name.as_str() {
        "units" => Command::Units,
        "questions" => Command::Questions(QuestionFilter {
            role: flags.role,
            difficulty: flags.difficulty,
            category: flags.category,
            company_size: flags.company_size,
            unit_id: flags.unit,
        }),
        "question" => Command::Question(QuestionId::new(arg("question", "id")?)),
        "progress" => Command::Progress,
        "stats" => Command::Stats,
        "answer" => Command::Answer {
            question_id: QuestionId::new(arg("answer", "question-id")?),
            option: parse_value("<option>", arg("answer", "option")?)?,
        },
        "complete" => Command::Complete {
            unit_id: UnitId::new(arg("complete", "unit")?),
            lesson_id: LessonId::new(arg("complete", "lesson")?),
            score: parse_value("<score>", arg("complete", "score")?)?,
            total: parse_value("<total>", arg("complete", "total")?)?,
        },
        "recommend" => Command::Recommend {
            filter: RecommendationFilter {
                difficulty: flags.difficulty,
                company_size: flags.company_size,
            },
            limit: flags.limit,
        },
        "review" => Command::Review,
        "lesson" => Command::Lesson {
            unit_id: UnitId::new(arg("lesson", "unit")?),
            lesson_id: LessonId::new(arg("lesson", "lesson")?),
            answers: flags.answers,
        },
        "reset" => Command::Reset,
        "leaderboard" => Command::Leaderboard,
        "profile" => Command::Profile(ProfileUpdate {
            display_name: flags.name,
            preferred_difficulty: flags.difficulty,
            company_size: flags.company_size,
        }),
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    if let Some(extra) = positional.next() {
        return Err(ArgsError::UnknownArg(extra));
    }
    Ok(command)
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
