use chrono::Local;
use parley_client::{init_tracing, AppConfig, AppState};
use parley_messaging::activity_label;
use tracing::info;

/// Headless walk through one session: sign in, pick a contact, send, wait for the answer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let reply_wait = config.reply_delay + std::time::Duration::from_millis(100);
    let mut app = AppState::start(config.clone()).await?;

    if !app.session().is_authenticated() {
        app.login(&config.demo_email, "demo").await;
    }
    let Some(chat) = app.chat() else {
        anyhow::bail!("no conversation store after sign-in");
    };
    info!(user = %chat.user().name, policy = ?config.reply_policy, "session ready");

    let now = Local::now();
    for contact in chat.contacts().await {
        info!(
            name = %contact.name,
            last = contact.last_message.as_deref().unwrap_or(""),
            at = %activity_label(contact.last_message_time, &now),
            "contact"
        );
    }

    let Some(first) = chat.contacts().await.into_iter().next() else {
        info!("roster is empty, nothing to do");
        return Ok(());
    };
    chat.set_active_chat(Some(&first)).await;
    chat.send_message("Hello from the demo driver").await;
    tokio::time::sleep(reply_wait).await;

    for message in chat.messages().await {
        let from = if message.sender_id == chat.user().id {
            "me"
        } else {
            first.name.as_str()
        };
        info!(from, text = %message.text, "message");
    }

    Ok(())
}
