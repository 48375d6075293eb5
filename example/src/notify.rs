use std::time::Duration;
use postwire::{Connection, Result};
use tokio::sync::mpsc;

pub async fn main() -> Result<()> {
    let mut listener = Connection::connect_env().await?;
    let mut notifier = Connection::connect_env().await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    listener
        .listen("postwire_events", move |n| {
            let _ = tx.send(n.payload.to_string());
        })
        .await?;

    notifier.notify("postwire_events", "it's here").await?;

    // notifications are only dispatched while the connection reads
    let _ = tokio::time::timeout(Duration::from_millis(500), listener.drive_notifications()).await;

    assert_eq!(rx.recv().await.as_deref(), Some("it's here"));

    listener.close().await?;
    notifier.close().await?;
    Ok(())
}
