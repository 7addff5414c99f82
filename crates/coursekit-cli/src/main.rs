//! coursekit CLI — author, take and review course exams from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use coursekit_core::model::{CourseId, ExamId, MaterialId, MaterialKey, MaterialKind, UserId};

mod commands;

#[derive(Parser)]
#[command(name = "coursekit", version, about = "Course portal exam and materials client")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and an example exam file
    Init,

    /// Check an exam file without contacting the server
    Validate {
        /// Path to the exam .toml file
        #[arg(long)]
        exam: PathBuf,
    },

    /// Log in and store the token in the user config
    Login {
        #[arg(long)]
        email: String,

        /// Password (read from COURSEKIT_PASSWORD when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Author and manage a course's exam
    Exam {
        #[command(subcommand)]
        action: ExamAction,
    },

    /// Answer an exam and submit it
    Take {
        #[arg(long)]
        exam: ExamId,

        /// Answers as <questionId>=<alternativeId>; repeat for each question
        #[arg(long = "answer", value_name = "Q=ALT")]
        answers: Vec<String>,

        /// Submit as this user instead of the logged-in one
        #[arg(long)]
        user: Option<UserId>,
    },

    /// List a user's attempts
    Attempts {
        #[arg(long)]
        user: Option<UserId>,

        /// Output format: text, markdown, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Review one attempt question by question
    AnswerSheet {
        #[arg(long)]
        attempt: u64,

        #[arg(long)]
        user: Option<UserId>,

        /// Output format: text, markdown, html, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to this file instead of stdout (html defaults to the output dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Manage course videos and PDFs
    Materials {
        #[command(subcommand)]
        action: MaterialsAction,
    },
}

#[derive(Subcommand)]
enum ExamAction {
    /// Show the course's exam
    Show {
        #[arg(long)]
        course: CourseId,

        /// Print as an editable exam file
        #[arg(long)]
        toml: bool,
    },

    /// Create or update an exam from a file
    Publish {
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete an exam
    Delete {
        #[arg(long)]
        exam: ExamId,

        /// Also delete existing responses
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum MaterialsAction {
    /// List materials in course order
    List {
        #[arg(long)]
        course: CourseId,
    },

    /// Move the material at one position to another (1-based)
    Move {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },

    /// Hide a material from students, or show it again
    Hide {
        #[arg(long)]
        course: CourseId,
        /// Material as <kind>#<id>, e.g. video#3
        #[arg(long)]
        item: MaterialKey,
        #[arg(long)]
        show: bool,
    },

    /// Add a material (metadata only)
    Add {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        kind: MaterialKind,
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        hidden: bool,
    },

    /// Delete a material
    Delete {
        #[arg(long)]
        kind: MaterialKind,
        #[arg(long)]
        id: MaterialId,
    },

    /// Open a course, mark materials as completed and show progress
    Complete {
        #[arg(long)]
        course: CourseId,
        /// Materials as <kind>#<id>; repeatable
        #[arg(long = "item")]
        items: Vec<MaterialKey>,
        #[arg(long)]
        user: Option<UserId>,
    },
}

#[tokio::main]
async fn main() {
    let directive = "coursekit=info"
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::Directive::from(tracing::Level::INFO));
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Login { email, password } => {
            commands::login::execute(config, email, password).await
        }
        Commands::Exam { action } => match action {
            ExamAction::Show { course, toml } => commands::exam::show(config, course, toml).await,
            ExamAction::Publish { file } => commands::exam::publish(config, file).await,
            ExamAction::Delete { exam, force } => {
                commands::exam::delete(config, exam, force).await
            }
        },
        Commands::Take {
            exam,
            answers,
            user,
        } => commands::take::execute(config, exam, answers, user).await,
        Commands::Attempts { user, format } => {
            commands::attempts::execute(config, user, format).await
        }
        Commands::AnswerSheet {
            attempt,
            user,
            format,
            output,
        } => commands::answer_sheet::execute(config, attempt, user, format, output).await,
        Commands::Materials { action } => match action {
            MaterialsAction::List { course } => commands::materials::list(config, course).await,
            MaterialsAction::Move { course, from, to } => {
                commands::materials::move_item(config, course, from, to).await
            }
            MaterialsAction::Hide { course, item, show } => {
                commands::materials::hide(config, course, item, !show).await
            }
            MaterialsAction::Add {
                course,
                kind,
                title,
                url,
                description,
                hidden,
            } => {
                let material = coursekit_core::model::NewMaterial {
                    course_id: course,
                    kind,
                    title,
                    description,
                    url,
                    hidden,
                };
                commands::materials::add(config, material).await
            }
            MaterialsAction::Delete { kind, id } => {
                commands::materials::delete(config, kind, id).await
            }
            MaterialsAction::Complete {
                course,
                items,
                user,
            } => commands::materials::complete(config, course, items, user).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
