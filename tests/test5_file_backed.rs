use sqlite_task_queue::prelude::*;
use sqlite_task_queue::rusqlite;
use tempfile::tempdir;

#[tokio::test]
async fn pragmas_apply_and_data_survives_reopen() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("queue.db");

    let queue = TaskQueue::builder()
        .path(&path)
        .pragma("journal_mode=WAL")
        .pragma("busy_timeout = 5000")
        .foreign_keys(true)
        .open()?;
    assert!(queue.connection_string().starts_with("file:"));

    let (journal, fk): (String, i64) = queue
        .call(|conn| {
            let journal = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
            let fk = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            Ok((journal, fk))
        })
        .await?;
    assert_eq!(journal.to_lowercase(), "wal");
    assert_eq!(fk, 1);

    queue
        .execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
        .await?;
    let db = open_db(&queue, AdapterOptions::default()).await?;
    db.exec("INSERT INTO notes (body) VALUES (?1)", &[RowValues::from("persisted")])
        .await?;
    queue.close().await?;

    let reopened = TaskQueue::open(QueueOptions::file(&path))?;
    let body: String = reopened
        .call(|conn| Ok(conn.query_row("SELECT body FROM notes", [], |row| row.get(0))?))
        .await?;
    assert_eq!(body, "persisted");
    reopened.close().await?;
    Ok(())
}

#[tokio::test]
async fn foreign_keys_stay_off_unless_requested() -> Result<(), Box<dyn std::error::Error>> {
    let fk_pragma = |conn: &mut rusqlite::Connection| -> Result<i64, TaskQueueError> {
        Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?)
    };

    let lax = TaskQueue::open_in_memory()?;
    assert_eq!(lax.call(fk_pragma).await?, 0);
    let strict = TaskQueue::builder().foreign_keys(true).open()?;
    assert_eq!(strict.call(fk_pragma).await?, 1);

    lax.close().await?;
    strict.close().await?;
    Ok(())
}

#[tokio::test]
async fn transaction_task_commits_or_rolls_back_as_a_unit() -> Result<(), Box<dyn std::error::Error>> {
    let queue = TaskQueue::open_in_memory()?;
    queue
        .execute_batch("CREATE TABLE ledger (id INTEGER PRIMARY KEY, amount INTEGER NOT NULL)")
        .await?;

    let failed = queue
        .transaction(|tx| {
            tx.execute("INSERT INTO ledger (amount) VALUES (10)", [])?;
            tx.execute("INSERT INTO ledger (amount) VALUES (NULL)", [])?;
            Ok(())
        })
        .await;
    assert!(matches!(failed, Err(TaskQueueError::SqliteError(_))));

    let inserted = queue
        .transaction(|tx| {
            let a = tx.execute("INSERT INTO ledger (amount) VALUES (10)", [])?;
            let b = tx.execute("INSERT INTO ledger (amount) VALUES (-10)", [])?;
            Ok(a + b)
        })
        .await?;
    assert_eq!(inserted, 2);

    let (rows, total): (i64, i64) = queue
        .call(|conn| {
            Ok(conn.query_row("SELECT COUNT(*), COALESCE(SUM(amount), 0) FROM ledger", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?)
        })
        .await?;
    assert_eq!((rows, total), (2, 0));

    queue.close().await?;
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected_at_open() -> Result<(), Box<dyn std::error::Error>> {
    let bad_pragma = TaskQueue::builder().pragma("journal_mode").open();
    assert!(matches!(bad_pragma, Err(TaskQueueError::ConfigError(_))));

    let dir = tempdir()?;
    let missing_parent = dir.path().join("no").join("such").join("dir.db");
    let bad_path = TaskQueue::open(QueueOptions::file(missing_parent));
    assert!(matches!(bad_path, Err(TaskQueueError::ConnectionError(_))));
    Ok(())
}
