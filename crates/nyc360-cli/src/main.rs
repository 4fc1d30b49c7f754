//! NYC360 CLI - a command-line front end for the NYC360 client core.
//!
//! Signs in, shows the current identity and permissions, and drives the
//! interaction sites (reactions, saves, membership, comments) against the
//! live API.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nyc360_core::api::{ChangePasswordRequest, ConfirmEmailRequest, ForgotPasswordRequest, ResetPasswordRequest};
use nyc360_core::auth::{Navigator, SIGN_IN_PATH};
use nyc360_core::interaction::Settled;
use nyc360_core::{
    ApiClient, CommentSite, Community, Config, MembershipSite, Notices, Reaction,
    ReactionSite, RemoteCaller, SaveSite, SessionStore,
};

const USAGE: &str = "\
Usage: nyc360 <command> [args]

Commands:
  login [email]               Sign in and store the credential
  refresh                     Exchange the stored tokens for fresh ones
  logout                      Forget the stored credential
  confirm-email <email> <token>
                              Confirm an email address
  forgot-password <email>     Request a password reset token
  reset-password <email> <token>
                              Set a new password with a reset token
  change-password             Change the signed-in account's password
  whoami                      Print the signed-in identity as JSON
  can <permission>            Check a permission
  is <role>                   Check a role
  like <post-id>              Toggle a like
  dislike <post-id>           Toggle a dislike
  save <post-id>              Toggle the saved flag
  join <community-id>         Join a community
  leave <community-id>        Leave a community
  comment <post-id> <text>    Post a comment";

/// Sign-in "navigation" for a terminal: tell the user what to run.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn go_to(&self, path: &str) {
        if path == SIGN_IN_PATH {
            eprintln!("Not signed in. Run `nyc360 login` first.");
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };

    let mut config = Config::load()?;
    let store = config.open_store()?;
    let session = Arc::new(SessionStore::new(Some(store), Arc::new(CliNavigator)));
    let client = ApiClient::new(config.base_url())?;
    info!(command = command, base_url = client.base_url(), "NYC360 CLI starting");

    match (command, &args[1..]) {
        ("login", rest) => login(&mut config, &session, &client, rest.first().cloned()).await,
        ("refresh", []) => refresh(&session, &client).await,
        ("logout", []) => {
            session.logout();
            Ok(())
        }
        ("confirm-email", [email, token]) => {
            let request = ConfirmEmailRequest { email: email.clone(), token: token.clone() };
            client.confirm_email(&request).await?;
            println!("Email confirmed");
            Ok(())
        }
        ("forgot-password", [email]) => {
            client.forgot_password(&ForgotPasswordRequest { email: email.clone() }).await?;
            println!("If {} has an account, a reset token is on its way", email);
            Ok(())
        }
        ("reset-password", [email, token]) => {
            let new_password = prompt_new_password()?;
            let request = ResetPasswordRequest { email: email.clone(), token: token.clone(), new_password };
            client.reset_password(&request).await?;
            println!("Password reset; run `nyc360 login` to sign in");
            Ok(())
        }
        ("change-password", []) => change_password(&session, &client).await,
        ("whoami", []) => whoami(&session),
        ("can", [permission]) => {
            println!("{}", session.has_permission(permission));
            Ok(())
        }
        ("is", [role]) => {
            println!("{}", session.has_role(role));
            Ok(())
        }
        ("like", [id]) => react(&session, &client, parse_id(id)?, Reaction::Like).await,
        ("dislike", [id]) => react(&session, &client, parse_id(id)?, Reaction::Dislike).await,
        ("save", [id]) => toggle_save(&session, &client, parse_id(id)?).await,
        ("join", [id]) => membership(&session, &client, parse_id(id)?, true).await,
        ("leave", [id]) => membership(&session, &client, parse_id(id)?, false).await,
        ("comment", [id, words @ ..]) if !words.is_empty() => {
            comment(&session, &client, parse_id(id)?, &words.join(" ")).await
        }
        _ => bail!("Unrecognized command.\n\n{}", USAGE),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse().with_context(|| format!("Invalid id: {}", raw))
}

/// Client carrying the stored access token, if any.
fn authed_client(session: &SessionStore, client: &ApiClient) -> ApiClient {
    match session.access_token() {
        Some(token) => client.with_token(token),
        None => client.clone(),
    }
}

fn print_notices(notices: &Notices) {
    for notice in notices.active() {
        println!("[{:?}] {}", notice.kind, notice.message);
    }
}

// ===== Account =====

async fn login(config: &mut Config, session: &SessionStore, client: &ApiClient, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => {
            print!("Email: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line.trim().to_string()
        }
    };
    if email.is_empty() {
        bail!("Email is required");
    }
    let password = rpassword::prompt_password("Password: ")?;

    let tokens = client.login(&email, &password).await?;
    if session.save_credential(&tokens.access_token, &tokens.refresh_token).is_none() {
        bail!("Server returned a token that could not be used");
    }

    config.last_email = Some(email);
    config.save()?;
    println!("Signed in as {}", session.username());
    Ok(())
}

async fn refresh(session: &SessionStore, client: &ApiClient) -> Result<()> {
    let (Some(access), Some(refresh)) = (session.access_token(), session.refresh_token()) else {
        bail!("No stored credential to refresh");
    };
    let tokens = client.refresh(&access, &refresh).await?;
    match session.save_credential(&tokens.access_token, &tokens.refresh_token) {
        Some(identity) => println!("Token refreshed; {} minutes left", identity.minutes_until_expiry()),
        None => bail!("Refreshed token could not be used"),
    }
    Ok(())
}

fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("New password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }
    if rpassword::prompt_password("Repeat new password: ")? != password {
        bail!("Passwords do not match");
    }
    Ok(password)
}

async fn change_password(session: &SessionStore, client: &ApiClient) -> Result<()> {
    if !session.is_logged_in() {
        bail!("Not signed in. Run `nyc360 login` first.");
    }
    let current_password = rpassword::prompt_password("Current password: ")?;
    let new_password = prompt_new_password()?;
    let request = ChangePasswordRequest { current_password, new_password };
    authed_client(session, client).change_password(&request).await?;
    println!("Password changed");
    Ok(())
}

fn whoami(session: &SessionStore) -> Result<()> {
    match session.current_identity() {
        Some(identity) => println!("{}", serde_json::to_string_pretty(identity.as_ref())?),
        None => println!("Not signed in ({})", session.username()),
    }
    Ok(())
}

// ===== Interactions =====

async fn react(session: &Arc<SessionStore>, client: &ApiClient, post_id: i64, reaction: Reaction) -> Result<()> {
    let client = authed_client(session, client);
    let mut posts = vec![client.fetch_post(post_id).await?];
    let caller: Arc<dyn RemoteCaller> = Arc::new(client);
    let mut site = ReactionSite::new(Arc::clone(session), caller);
    let mut notices = Notices::new();

    site.toggle(&mut posts[0], reaction, &mut notices)?;
    let settled = site.settle_next(&mut posts, &mut notices).await;
    report(settled, &notices);

    let post = &posts[0];
    println!(
        "post {}: {} likes, {} dislikes, you: {}",
        post.id,
        post.stats.likes,
        post.stats.dislikes,
        post.current_user_interaction.label()
    );
    Ok(())
}

async fn toggle_save(session: &Arc<SessionStore>, client: &ApiClient, post_id: i64) -> Result<()> {
    let client = authed_client(session, client);
    let mut posts = vec![client.fetch_post(post_id).await?];
    let caller: Arc<dyn RemoteCaller> = Arc::new(client);
    let mut site = SaveSite::new(Arc::clone(session), caller);
    let mut notices = Notices::new();

    site.toggle_save(&mut posts[0], &mut notices)?;
    let settled = site.settle_next(&mut posts, &mut notices).await;
    report(settled, &notices);
    Ok(())
}

async fn membership(session: &Arc<SessionStore>, client: &ApiClient, community_id: i64, join: bool) -> Result<()> {
    let caller: Arc<dyn RemoteCaller> = Arc::new(authed_client(session, client));
    let mut site = MembershipSite::new(Arc::clone(session), caller);
    let mut notices = Notices::new();
    // No community read endpoint here; assume the opposite of the request
    let mut communities = vec![Community {
        is_joined: !join,
        ..Community::new(community_id)
    }];

    let ticket = if join {
        site.join(&mut communities[0], &mut notices)?
    } else {
        site.leave(&mut communities[0], &mut notices)?
    };
    if ticket.is_some() {
        let settled = site.settle_next(&mut communities, &mut notices).await;
        report(settled, &notices);
    }
    Ok(())
}

async fn comment(session: &Arc<SessionStore>, client: &ApiClient, post_id: i64, text: &str) -> Result<()> {
    let client = authed_client(session, client);
    let mut posts = vec![client.fetch_post(post_id).await?];
    let caller: Arc<dyn RemoteCaller> = Arc::new(client);
    let mut site = CommentSite::new(Arc::clone(session), caller);
    let mut notices = Notices::new();

    site.add_comment(&mut posts[0], text, None, &mut notices)?;
    let settled = site.settle_next(&mut posts, &mut notices).await;
    report(settled, &notices);
    println!("post {}: {} comments", posts[0].id, posts[0].stats.comments);
    Ok(())
}

fn report(settled: Option<Settled>, notices: &Notices) {
    if let Some(settled) = settled {
        info!(target_id = settled.ticket.target_id, settlement = ?settled.settlement, "Interaction settled");
    }
    print_notices(notices);
}
