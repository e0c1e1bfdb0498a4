use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ApiBase, CareerApi, FlowController, HttpCareerApi, TokenStore};
use shared::domain::{CollegeId, Profile, TestKind};
use storage::Storage;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod console;

#[derive(Parser, Debug)]
#[command(name = "career", about = "Career guidance client")]
struct Cli {
    #[arg(long, default_value = "client.toml")]
    config: PathBuf,
    /// Overrides the configured API base.
    #[arg(long)]
    api_base: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Submit a profile, take the test it calls for, then explore recommendations.
    Flow(ProfileArgs),
    /// Retake a test of the given kind (`aptitude` or `personality`).
    Test {
        #[arg(long)]
        kind: TestKind,
    },
    Recommend,
    College { id: i64 },
}

#[derive(clap::Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    qualification: String,
    #[arg(long, default_value = "")]
    stream: String,
    #[arg(long, default_value_t = 0.0)]
    marks: f64,
    #[arg(long, default_value = "")]
    city: String,
    #[arg(long, default_value = "")]
    country: String,
    #[arg(long)]
    abroad: bool,
    #[arg(long, default_value_t = 0.0)]
    budget: f64,
    #[arg(long)]
    dream_course: Option<String>,
}

impl From<ProfileArgs> for Profile {
    fn from(args: ProfileArgs) -> Self {
        Profile {
            highest_qualification: args.qualification,
            stream: args.stream,
            board_marks: args.marks,
            city: args.city,
            country: args.country,
            abroad: args.abroad,
            budget: args.budget,
            dream_course: args.dream_course,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(&cli.config);
    if let Some(api_base) = cli.api_base {
        settings.api_base = api_base;
    }
    let base = ApiBase::parse(&settings.api_base)?;
    let api = match settings.request_timeout_secs.filter(|secs| *secs > 0) {
        Some(secs) => HttpCareerApi::with_timeout(base, Duration::from_secs(secs))?,
        None => HttpCareerApi::new(base),
    };
    let database_url = config::normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url)
        .await
        .context("failed to open client storage")?;
    storage.health_check().await?;
    info!(api_base = api.base().as_str(), %database_url, "client ready");

    let mut controller = FlowController::new(api, storage);
    console::print_all(&controller.restore().await);

    match cli.command {
        Command::Signup { email, password } => {
            console::print_all(&controller.signup(&email, &password).await);
        }
        Command::Login { email, password } => {
            console::print_all(&controller.login(&email, &password).await);
        }
        Command::Logout => console::print_all(&controller.logout().await),
        Command::Flow(args) => run_flow(&mut controller, args.into()).await?,
        Command::Test { kind } => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            console::print_all(&controller.start_test(kind).await);
            answer_active_test(&mut controller, &mut lines).await?;
        }
        Command::Recommend => console::print_all(&controller.fetch_recommendations().await),
        Command::College { id } => {
            console::print_all(&controller.load_college(CollegeId(id)).await);
        }
    }

    Ok(())
}

async fn run_flow<A: CareerApi, S: TokenStore>(
    controller: &mut FlowController<A, S>,
    profile: Profile,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    console::print_all(&controller.save_profile(profile).await);
    answer_active_test(controller, &mut lines).await?;

    let codes: Vec<String> = match controller.recommendations() {
        Some(result) => result.courses.iter().map(|course| course.code.clone()).collect(),
        None => return Ok(()),
    };
    if codes.is_empty() {
        return Ok(());
    }

    loop {
        let prompt = format!("Pick a course code [{}] (blank to finish): ", codes.join(", "));
        let Some(code) = prompt_line(&mut lines, &prompt).await? else {
            break;
        };
        if code.is_empty() {
            break;
        }
        let rejected = controller.select_course(&code);
        if !rejected.is_empty() {
            console::print_all(&rejected);
            continue;
        }
        console::print_all(&controller.load_resources().await);
        console::print_all(&controller.load_colleges().await);
    }

    Ok(())
}

async fn answer_active_test<A: CareerApi, S: TokenStore>(
    controller: &mut FlowController<A, S>,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<()> {
    if controller.session().current_test.is_none() {
        return Ok(());
    }
    let questions = controller
        .answer_sheet()
        .map(|sheet| sheet.questions().to_vec())
        .unwrap_or_default();
    for question in questions {
        let prompt = format!("Answer for Q{} (blank to skip): ", question.id);
        let Some(answer) = prompt_line(lines, &prompt).await? else {
            break;
        };
        if !answer.is_empty() {
            console::print_all(&controller.select_answer(question.id, &answer));
        }
    }
    console::print_all(&controller.submit_test().await);
    Ok(())
}

/// `None` on end of input.
async fn prompt_line(
    lines: &mut Lines<BufReader<Stdin>>,
    prompt: &str,
) -> Result<Option<String>> {
    use std::io::Write as _;

    print!("{prompt}");
    std::io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string()))
}
