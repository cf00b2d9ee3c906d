//! Persistence behavior of the JSON stores against real temp directories.

use tempfile::TempDir;

use mailburst::models::Draft;
use mailburst::stores::{DraftStore, RecipientStore, SettingsStore, SmtpConfig};

#[tokio::test]
async fn settings_round_trip_with_the_documented_field_names() {
    let dir = TempDir::new().unwrap();
    // A nested path also checks that saving creates missing directories.
    let path = dir.path().join("data").join("config.json");
    let store = SettingsStore::new(&path);

    let config = SmtpConfig {
        smtp_host: "smtp.example.com".to_string(),
        username: "mailer@example.com".to_string(),
        password: "secret".to_string(),
        use_ssl: true,
        ..SmtpConfig::default()
    };
    store.save(&config).await.unwrap();

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    for field in [
        "smtp_host", "smtp_port", "use_tls", "use_ssl", "username", "password",
    ] {
        assert!(raw.contains(field), "field {field} missing from {raw}");
    }

    assert_eq!(store.load().await, config);
}

#[tokio::test]
async fn missing_settings_file_loads_as_defaults() {
    let dir = TempDir::new().unwrap();
    let config = SettingsStore::new(dir.path().join("config.json"))
        .load()
        .await;
    assert_eq!(config, SmtpConfig::default());
}

#[tokio::test]
async fn corrupt_settings_file_loads_as_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, b"{not json").await.unwrap();

    let config = SettingsStore::new(&path).load().await;
    assert_eq!(config, SmtpConfig::default());
}

#[tokio::test]
async fn partial_settings_import_keeps_defaults_for_the_rest() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("exported.json");
    tokio::fs::write(
        &source,
        br#"{"smtp_host": "mail.example.org", "username": "me@example.org"}"#,
    )
    .await
    .unwrap();

    let store = SettingsStore::new(dir.path().join("config.json"));
    let imported = store.import(&source).await.unwrap();
    assert_eq!(imported.smtp_host, "mail.example.org");
    assert_eq!(imported.username, "me@example.org");
    assert_eq!(imported.smtp_port, 587);
    assert!(imported.use_tls);

    // The import was persisted, not just returned.
    assert_eq!(store.load().await, imported);
}

#[tokio::test]
async fn importing_a_host_only_file_keeps_the_stored_credentials() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::new(dir.path().join("config.json"));
    store
        .save(&SmtpConfig {
            smtp_host: "smtp.old.example".to_string(),
            username: "mailer@example.com".to_string(),
            password: "secret".to_string(),
            ..SmtpConfig::default()
        })
        .await
        .unwrap();

    let source = dir.path().join("exported.json");
    tokio::fs::write(&source, br#"{"smtp_host": "smtp.new.example"}"#)
        .await
        .unwrap();

    let imported = store.import(&source).await.unwrap();
    assert_eq!(imported.smtp_host, "smtp.new.example");
    assert_eq!(imported.username, "mailer@example.com");
    assert_eq!(imported.password, "secret");
    assert_eq!(store.load().await, imported);
}

#[tokio::test]
async fn recipients_are_normalized_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("emails.json");
    tokio::fs::write(
        &path,
        br#"{"recipients": ["  a@x.com ", "b@x.com", "a@x.com", "", "c@x.com"]}"#,
    )
    .await
    .unwrap();

    let loaded = RecipientStore::new(&path).load().await;
    assert_eq!(loaded, ["a@x.com", "b@x.com", "c@x.com"]);
}

#[tokio::test]
async fn recipient_add_remove_clear_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = RecipientStore::new(dir.path().join("emails.json"));

    assert!(store.add(" a@x.com ").await.unwrap());
    assert!(!store.add("a@x.com").await.unwrap());
    assert!(store.add("b@x.com").await.unwrap());
    assert_eq!(store.load().await, ["a@x.com", "b@x.com"]);

    assert!(store.remove("a@x.com").await.unwrap());
    assert!(!store.remove("a@x.com").await.unwrap());
    assert_eq!(store.load().await, ["b@x.com"]);

    store.clear().await.unwrap();
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn import_text_replaces_the_stored_list() {
    let dir = TempDir::new().unwrap();
    let store = RecipientStore::new(dir.path().join("emails.json"));
    store.add("old@x.com").await.unwrap();

    let text = "1. a@x.com\n2. b@x.com, c@x.com\n\nb@x.com\n";
    let saved = store.import_text(text).await.unwrap();
    assert_eq!(saved, ["a@x.com", "b@x.com", "c@x.com"]);
    assert_eq!(store.load().await, ["a@x.com", "b@x.com", "c@x.com"]);
}

#[tokio::test]
async fn draft_save_drops_attachments_that_do_not_exist() {
    let dir = TempDir::new().unwrap();
    let present = dir.path().join("real.txt");
    tokio::fs::write(&present, b"contents").await.unwrap();
    let missing = dir.path().join("missing.txt");

    let store = DraftStore::new(dir.path().join("draft.json"));
    let draft = Draft {
        subject: "Hi".to_string(),
        body: "Hello".to_string(),
        attachments: vec![present.clone(), missing.clone()],
    };
    let dropped = store.save(&draft).await.unwrap();
    assert_eq!(dropped, [missing]);

    let loaded = store.load().await;
    assert_eq!(loaded.subject, "Hi");
    assert_eq!(loaded.body, "Hello");
    assert_eq!(loaded.attachments, [present]);
}

#[tokio::test]
async fn missing_draft_loads_as_empty() {
    let dir = TempDir::new().unwrap();
    let draft = DraftStore::new(dir.path().join("draft.json")).load().await;
    assert_eq!(draft, Draft::default());
}

#[tokio::test]
async fn draft_clear_resets_the_file() {
    let dir = TempDir::new().unwrap();
    let store = DraftStore::new(dir.path().join("draft.json"));
    store
        .save(&Draft {
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            attachments: Vec::new(),
        })
        .await
        .unwrap();

    store.clear().await.unwrap();
    assert_eq!(store.load().await, Draft::default());

    // The cleared state is a real file, not an absence.
    assert!(dir.path().join("draft.json").exists());
}
