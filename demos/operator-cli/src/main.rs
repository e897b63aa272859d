//! Skyshot operator CLI demo
//!
//! Drives a full operator session against a running backend:
//!
//! - `login <email>`: sign in (password from `SKYSHOT_PASSWORD` or stdin)
//! - `whoami`: fetch the profile, silently re-authenticating if needed
//! - `get <path>`: authenticated GET, printing the JSON body
//! - `logout`: forget tokens and remembered credentials
//!
//! Run with: `SKYSHOT_API_URL=http://localhost:8000 cargo run -p skyshot-operator-cli -- whoami`

mod config;

use std::sync::Arc;

use anyhow::{Context, bail};
use skyshot_client::{
    ApiClient, AuthService, ClientConfig, FileStore, FnUnauthorizedHandler, format_error_message,
};
use tokio::io::{AsyncBufReadExt, BufReader};

async fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(config::PASSWORD_ENV) {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn login(auth: &AuthService, email: &str) -> anyhow::Result<()> {
    let password = read_password().await?;
    let result = auth.sign_in(email, &password).await?;

    match result.user {
        Some(user) => println!("Signed in as {}", user.display_name()),
        None => println!("Signed in"),
    }
    Ok(())
}

async fn whoami(auth: &AuthService) -> anyhow::Result<()> {
    if !auth.restore_session().await? && auth.silent_sign_in().await?.is_none() {
        bail!("not signed in; run `login <email>` first");
    }

    let user = auth.fetch_profile().await?;
    let greeting = auth
        .credentials()
        .load_preferred_name()
        .await?
        .unwrap_or_else(|| user.display_name());

    println!("{greeting} (id {}, {})", user.id, user.email);
    Ok(())
}

async fn get(client: &ApiClient, auth: &AuthService, path: &str) -> anyhow::Result<()> {
    auth.restore_session().await?;
    let body: serde_json::Value = client.get_json(path).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

async fn run(args: &[String]) -> anyhow::Result<()> {
    let store = FileStore::with_path(config::store_path());
    let client = ApiClient::builder()
        .config(ClientConfig::from_env())
        .store(store)
        .unauthorized_handler(FnUnauthorizedHandler::new(|event| {
            Box::pin(async move {
                eprintln!(
                    "Session expired during {} {}; run `login <email>` again",
                    event.method, event.endpoint
                );
            })
        }))
        .build()?;
    let client = Arc::new(client);
    let auth = AuthService::new(Arc::clone(&client));

    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["login", email] => login(&auth, email).await,
        ["whoami"] => whoami(&auth).await,
        ["get", path] => get(&client, &auth, path).await,
        ["logout"] => {
            auth.sign_out().await?;
            println!("Signed out");
            Ok(())
        }
        _ => bail!("usage: skyshot-operator-cli <login EMAIL | whoami | get PATH | logout>"),
    };

    client.shutdown();
    result
}

#[tokio::main]
async fn main() {
    config::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        let message = match e.downcast_ref::<skyshot_client::ApiError>() {
            Some(api) => format_error_message(Some(api), "Something went wrong"),
            None => e.to_string(),
        };
        eprintln!("Error: {message}");
        std::process::exit(1);
    }
}
