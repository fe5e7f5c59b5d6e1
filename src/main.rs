use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use std::collections::BTreeMap;
use std::sync::Arc;

use dept_portal::config::Config;
use dept_portal::models::role::Credentials;
use dept_portal::models::student::RecipientFilter;
use dept_portal::models::topic::SubmitterType;
use dept_portal::services::api::{ApiClient, SharedTransport};
use dept_portal::services::bell::age_label;
use dept_portal::services::preview;
use dept_portal::session::PortalSession;
use dept_portal::tasks::topic_poller::{FetchState, TopicViewState};

#[derive(Parser, Debug)]
#[command(
    name = "dept-portal",
    version,
    about = "Department portal client: roles, topics and notifications"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(long, env = "PORTAL_OAUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a subject and body with placeholder values
    Preview(PreviewArgs),
    #[command(flatten)]
    Portal(PortalCommand),
}

/// Commands that talk to the backend and need a signed-in session.
#[derive(Subcommand, Debug)]
enum PortalCommand {
    /// Show the role of the signed-in user
    Role,
    /// List proposed topics
    Topics(TopicsArgs),
    /// List notification templates
    Templates,
    /// List students, optionally by topic confirmation
    Students {
        #[arg(long, default_value = "all")]
        filter: RecipientFilter,
    },
    /// Send a notification
    Send(SendArgs),
    /// List unread notifications
    Bell,
    /// Mark a notification as read
    Read { id: i64 },
}

#[derive(Args, Debug)]
struct TopicsArgs {
    #[arg(long, default_value = "teacher")]
    submitter: SubmitterType,
    /// Keep polling and print every refresh
    #[arg(long)]
    watch: bool,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long, default_value = "")]
    body: String,
    /// Placeholder value as key=value
    #[arg(long = "data", value_parser = parse_key_value)]
    data: Vec<(String, String)>,
    #[arg(long)]
    html: bool,
}

#[derive(Args, Debug)]
struct SendArgs {
    #[arg(long, conflicts_with_all = ["subject", "content"])]
    template: Option<i64>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long = "data", value_parser = parse_key_value)]
    data: Vec<(String, String)>,
    /// Student id; repeat for several recipients
    #[arg(long = "to", conflicts_with = "all")]
    to: Vec<i64>,
    /// Send to every student matching --filter
    #[arg(long)]
    all: bool,
    #[arg(long, default_value = "all")]
    filter: RecipientFilter,
    #[arg(long)]
    url: Option<String>,
    /// RFC 3339 send time, e.g. 2025-05-01T09:00:00+08:00
    #[arg(long)]
    schedule: Option<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_env().map_err(|err| anyhow!(err))?;
    if cli.token.is_some() {
        config.oauth_token = cli.token.clone();
    }

    match cli.command {
        Command::Preview(args) => print_preview(&args),
        Command::Portal(command) => run_portal(config, command).await?,
    }
    Ok(())
}

async fn run_portal(config: Config, command: PortalCommand) -> anyhow::Result<()> {
    let transport: SharedTransport = Arc::new(ApiClient::new(config.api_url.clone()));
    let credentials = Credentials::new(config.oauth_token.clone());
    let session = PortalSession::start(transport, config, &credentials)
        .await
        .map_err(|err| anyhow!("{} ({})", err.user_message(), err))?;

    match command {
        PortalCommand::Role => println!("{}", session.role()),
        PortalCommand::Topics(args) => run_topics(&session, args).await?,
        PortalCommand::Templates => {
            let mut composer = session.composer()?;
            report_load_errors(composer.load().await);
            for template in composer.templates() {
                println!("{:>5}  {}  |  {}", template.id, template.name, template.subject);
            }
        }
        PortalCommand::Students { filter } => {
            let mut composer = session.composer()?;
            report_load_errors(composer.load().await);
            for student in composer.students().iter().filter(|s| filter.matches(s)) {
                println!("{:>5}  {}  <{}>", student.id, student.display_label(), student.mail);
            }
        }
        PortalCommand::Send(args) => run_send(&session, args).await?,
        PortalCommand::Bell => {
            let mut bell = session.bell()?;
            bell.set_open(true).await;
            println!("{} unread", bell.badge_label());
            let now = Utc::now();
            for item in bell.notifications() {
                let age = item
                    .created_at
                    .map(|at| age_label(at, now))
                    .unwrap_or_default();
                println!("{:>5}  {}  ({})", item.id, item.title, age);
                println!("       {}", item.content);
            }
        }
        PortalCommand::Read { id } => {
            let mut bell = session.bell()?;
            bell.set_open(true).await;
            let redirect = bell
                .click(id)
                .await
                .map_err(|err| anyhow!(err.user_message()))?;
            match redirect {
                Some(url) => println!("Marked {} as read; open {}", id, url),
                None => println!("Marked {} as read", id),
            }
        }
    }

    Ok(())
}

fn report_load_errors(errors: Vec<String>) {
    for error in errors {
        eprintln!("error: {}", error);
    }
}

fn print_preview(args: &PreviewArgs) {
    let data: BTreeMap<String, String> = args.data.iter().cloned().collect();
    let rendered = preview::preview(&args.subject, &args.body, &data);
    if args.html {
        println!("{}", rendered.subject.to_html());
        println!("{}", rendered.content.to_html());
    } else {
        println!("Subject: {}", rendered.subject);
        println!("Content: {}", rendered.content);
    }
}

async fn run_topics(session: &PortalSession, args: TopicsArgs) -> anyhow::Result<()> {
    let view = session.topics(args.submitter)?;
    let mut updates = view.subscribe();

    loop {
        let fetched = *updates.borrow_and_update() > 0;
        if fetched {
            print_topics(&view.snapshot());
            if !args.watch {
                break;
            }
        }
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn print_topics(state: &TopicViewState) {
    if let Some(error) = &state.error {
        eprintln!("error: {}", error);
    }
    if state.state == FetchState::Failed && state.rows.is_empty() {
        return;
    }

    let columns: Vec<_> = state.columns.iter().filter(|c| !c.is_actions()).collect();
    println!(
        "{} topics submitted by {}",
        state.rows.len(),
        state.submitter
    );
    println!(
        "{}",
        columns
            .iter()
            .map(|c| c.title.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    );
    for row in &state.rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.cell_text(c.data_index.as_deref().unwrap_or(&c.key)))
            .collect();
        println!("{}", cells.join(" | "));
    }
}

async fn run_send(session: &PortalSession, args: SendArgs) -> anyhow::Result<()> {
    let mut composer = session.composer()?;
    report_load_errors(composer.load().await);

    if let Some(template_id) = args.template {
        if !composer.select_template(template_id) {
            return Err(anyhow!("template {} not found", template_id));
        }
    }
    if let Some(subject) = args.subject {
        composer.set_subject(subject);
    }
    if let Some(content) = args.content {
        composer.set_content(content);
    }
    for (key, value) in &args.data {
        composer.set_data_value(key, value);
    }
    composer.set_url(args.url);
    if let Some(raw) = args.schedule {
        let at = DateTime::parse_from_rfc3339(&raw)
            .with_context(|| format!("invalid schedule '{}'", raw))?;
        composer.set_schedule(Some(at));
    }

    composer.set_filter(args.filter);
    if args.all {
        composer.send_to_all();
    } else {
        composer.set_recipients(args.to);
    }

    if composer.draft().template_id.is_some() {
        for (key, value) in composer.placeholder_inputs() {
            println!("{:>22}: {}", key, value.unwrap_or("-"));
        }
    }
    println!("Subject: {}", composer.preview().subject);
    println!("Content: {}", composer.preview().content);

    composer
        .submit()
        .await
        .map_err(|err| anyhow!(err.user_message()))?;
    println!("Notification sent successfully!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_preview_parses_apart_from_portal_commands() {
        let cli = Cli::try_parse_from(["dept-portal", "preview", "--subject", "Hi {{name}}"]).unwrap();
        assert!(matches!(cli.command, Command::Preview(_)));

        let cli = Cli::try_parse_from(["dept-portal", "--token", "t", "read", "7"]).unwrap();
        assert!(matches!(cli.command, Command::Portal(PortalCommand::Read { id: 7 })));
        assert_eq!(cli.token.as_deref(), Some("t"));
    }
}
