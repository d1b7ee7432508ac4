use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use usermanager::config::{Configuration, DEFAULT_CONFIG_PATH};
use usermanager::error::{ClientError, Result};
use usermanager::flow::{LoginForm, RegisterForm};
use usermanager::http::UploadEvent;
use usermanager::model::{FormData, ProfileImage, Role, User};
use usermanager::notification::{NotificationType, Notifier};
use usermanager::{AppState, initialize_state, telemetry};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "USERMANAGER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Backend base URL, overrides the configuration file.
    #[arg(long, env = "USERMANAGER_HOST")]
    host: Option<String>,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Log in and keep the session.
    Login {
        /// Defaults to the remembered user.
        username: Option<String>,
        /// Prompted on stdin when omitted.
        #[arg(long, short)]
        password: Option<String>,
        /// Remember the user for the next login.
        #[arg(long, short)]
        remember: bool,
    },
    /// Create an account. The password is sent by e-mail.
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the session.
    Logout,
    /// Show the current session.
    Status,
    /// Manage users.
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Subcommand, Debug, Clone)]
enum UserCommands {
    /// List every user.
    List {
        /// Read the local mirror instead of the backend.
        #[arg(long)]
        cached: bool,
    },
    /// Create a user.
    Add(UserArgs),
    /// Update a user, identified by `--current-username`.
    Update {
        #[arg(long)]
        current_username: String,
        #[command(flatten)]
        user: UserArgs,
    },
    /// Delete a user by numeric id.
    Delete { id: u64 },
    /// Send a new password to `email`.
    ResetPassword { email: String },
    /// Upload a new profile image.
    Image { username: String, file: PathBuf },
}

#[derive(Args, Debug, Clone)]
struct UserArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value_t = Role::RoleUser)]
    role: Role,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    active: bool,
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    not_locked: bool,
    /// Profile image to attach.
    #[arg(long)]
    image: Option<PathBuf>,
}

impl UserArgs {
    fn user(&self) -> User {
        User {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.to_string(),
            active: self.active,
            not_locked: self.not_locked,
            ..Default::default()
        }
    }
}

/// Print notifications as console lines.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NotificationType, message: &str, title: &str) {
        match kind {
            NotificationType::Error | NotificationType::Warning => {
                eprintln!("[{title}] {message}")
            },
            _ => println!("[{title}] {message}"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Configuration::default()
        .path(cli.config)
        .host(cli.host)
        .read()
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(err) = telemetry::setup_tracing(&config.log_level) {
        eprintln!("cannot initialize logging: {err}");
    }

    let state = match initialize_state(config, Arc::new(ConsoleNotifier)) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "cannot initialize state");
            return ExitCode::FAILURE;
        },
    };

    match run(&state, cli.cmd).await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            let (message, title) = err.notification();
            match &err {
                ClientError::Validation(errors) => eprintln!("{errors}"),
                _ => state.notifier.error(&message, &title),
            }
            ExitCode::FAILURE
        },
    }
}

async fn run(state: &AppState, cmd: Commands) -> Result<ExitCode> {
    match cmd {
        Commands::Login {
            username,
            password,
            remember,
        } => {
            let flow = state.login_flow();
            let initial = flow.on_init().await;

            let username = username.unwrap_or(initial.username);
            let form = LoginForm {
                username: username.clone(),
                password: match password {
                    Some(password) => password,
                    None => prompt("Password: ")?,
                },
                remember_me: remember || initial.remember_me,
            };

            // Failures were already notified by the flow.
            match flow.on_login(form)?.await {
                Ok(Ok(())) => {
                    println!("Logged in as {username}");
                    Ok(ExitCode::SUCCESS)
                },
                Ok(Err(_)) => Ok(ExitCode::FAILURE),
                Err(err) => {
                    tracing::error!(error = %err, "login task failed");
                    Ok(ExitCode::FAILURE)
                },
            }
        },
        Commands::Register {
            first_name,
            last_name,
            username,
            email,
        } => {
            let flow = state.register_flow();
            flow.on_init().await;

            let form = RegisterForm {
                first_name,
                last_name,
                username,
                email,
            };
            match flow.on_register(form)?.await {
                Ok(Ok(_)) => Ok(ExitCode::SUCCESS),
                Ok(Err(_)) => Ok(ExitCode::FAILURE),
                Err(err) => {
                    tracing::error!(error = %err, "registration task failed");
                    Ok(ExitCode::FAILURE)
                },
            }
        },
        Commands::Logout => {
            state.auth.logout()?;
            println!("Logged out");
            Ok(ExitCode::SUCCESS)
        },
        Commands::Status => match state.auth.current_claims() {
            Some(claims) => {
                println!("Logged in as {}", claims.subject().unwrap_or_default());
                if let Some(exp) = claims
                    .exp
                    .and_then(|exp| chrono::DateTime::from_timestamp(exp as i64, 0))
                {
                    println!("Session expires at {}", exp.to_rfc3339());
                }
                if !claims.authorities.is_empty() {
                    println!("Authorities: {}", claims.authorities.join(", "));
                }
                Ok(ExitCode::SUCCESS)
            },
            None => {
                println!("Not logged in");
                Ok(ExitCode::FAILURE)
            },
        },
        Commands::Users(cmd) => {
            // Password resets are for users who cannot log in.
            let protected = !matches!(cmd, UserCommands::ResetPassword { .. });
            if protected && !guard(state).await {
                return Ok(ExitCode::FAILURE);
            }
            users(state, cmd).await
        },
    }
}

/// Run the route guard, waiting for its redirect when denied.
async fn guard(state: &AppState) -> bool {
    let activation = state.guard.activate();
    if let Some(redirect) = activation.redirect {
        if let Err(err) = redirect.await {
            tracing::error!(error = %err, "redirect task failed");
        }
    }
    activation.allowed
}

async fn users(state: &AppState, cmd: UserCommands) -> Result<ExitCode> {
    match cmd {
        UserCommands::List { cached } => {
            let users = if cached {
                state.users.get_users_from_local_cache().unwrap_or_default()
            } else {
                state.users.get_users().await?
            };

            for user in users {
                println!(
                    "{:>6}  {:<20} {:<30} {:<32} {:<16} {}",
                    user.id.map(|id| id.to_string()).unwrap_or_default(),
                    user.username,
                    user.full_name(),
                    user.email,
                    user.role,
                    if user.active { "active" } else { "inactive" },
                );
            }
        },
        UserCommands::Add(args) => {
            let image = load_image(args.image.as_ref()).await?;
            let form = state.new_user_form(&args.user(), image);
            let user = state.users.add_user(form).await?;
            state.notifier.success(
                &format!("{} added successfully.", user.full_name()),
                "Success",
            );
        },
        UserCommands::Update {
            current_username,
            user: args,
        } => {
            let image = load_image(args.image.as_ref()).await?;
            let form = state
                .users
                .create_user_form_data(Some(&current_username), &args.user(), image);
            let user = state.users.update_user(form).await?;
            state.notifier.success(
                &format!("{} updated successfully.", user.full_name()),
                "Success",
            );
        },
        UserCommands::Delete { id } => {
            let response = state.users.delete_user(id).await?;
            state.notifier.success(&response.message, &response.reason);
        },
        UserCommands::Image { username, file } => {
            let mut form = FormData::new();
            form.append("username", username)
                .append_file("profileImage", ProfileImage::from_path(&file).await?);

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let progress = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    match event {
                        UploadEvent::Sent => eprintln!("Uploading..."),
                        UploadEvent::Progress { loaded, total } if total > 0 => {
                            eprint!("\r{:>3}%", loaded * 100 / total);
                            let _ = std::io::stderr().flush();
                        },
                        UploadEvent::Progress { .. } => {},
                        UploadEvent::Response(user) => {
                            eprintln!("\rProfile image updated for {}", user.username)
                        },
                    }
                }
            });

            let outcome = state.users.update_profile_image(form, Some(tx)).await;
            if let Err(err) = progress.await {
                tracing::warn!(error = %err, "progress reporter failed");
            }
            outcome?;
        },
        UserCommands::ResetPassword { email } => {
            let response = state.users.reset_password(&email).await?;
            state.notifier.success(&response.message, &response.reason);
        },
    }

    Ok(ExitCode::SUCCESS)
}

async fn load_image(path: Option<&PathBuf>) -> Result<Option<ProfileImage>> {
    match path {
        Some(path) => Ok(Some(ProfileImage::from_path(path).await?)),
        None => Ok(None),
    }
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    let _ = std::io::stderr().flush();

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|err| ClientError::storage("cannot read from stdin", err))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
