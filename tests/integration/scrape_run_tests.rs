use super::*;
use std::fs;
use tebex_scraper::{NotificationOutcome, RunOutcome};
use tempfile::TempDir;

#[tokio::test]
async fn test_storefront_export() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(&dir.path().join("output"), None);
    let csv_path = config.csv_path();

    let outcome = create_test_pipeline(config, StaticPage::new(STOREFRONT_HTML))
        .run()
        .await?;

    assert_eq!(
        outcome,
        RunOutcome::Exported {
            products: 3,
            csv_path: csv_path.clone(),
            notification: NotificationOutcome::Skipped,
        }
    );
    assert_eq!(
        read_csv(&csv_path),
        vec![
            ("Starter".into(), "$5.00".into(), "https://shop.x/package/1".into()),
            (
                "Garage, \"Deluxe\"".into(),
                "$12.50".into(),
                "https://checkout.tebex.io/package/2".into()
            ),
            ("Mystery Box".into(), "N/A".into(), "N/A".into()),
        ]
    );
    assert!(!dir.path().join("output").join("page.html").exists());
    Ok(())
}

#[tokio::test]
async fn test_fallback_names_are_exported() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(dir.path(), None);
    let csv_path = config.csv_path();
    let html = r#"<ul><li class="package-title">Weapons Pack</li><li class="package-title">Cars Pack</li></ul>"#;

    create_test_pipeline(config, StaticPage::new(html)).run().await?;

    assert_eq!(
        read_csv(&csv_path),
        vec![
            ("Weapons Pack".into(), "N/A".into(), "N/A".into()),
            ("Cars Pack".into(), "N/A".into(), "N/A".into()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_store_dumps_page_verbatim() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(&dir.path().join("nested").join("output"), None);
    let html = "<html>\r\n<body data-theme=\"x\">Checking your browser…</body>\r\n</html>";

    let outcome = create_test_pipeline(config.clone(), StaticPage::new(html))
        .run()
        .await?;

    assert_eq!(
        outcome,
        RunOutcome::NoProducts {
            dump_path: config.page_dump_path()
        }
    );
    assert_eq!(fs::read(config.page_dump_path())?, html.as_bytes());
    assert!(!config.csv_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_rerun_overwrites_previous_csv() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(dir.path(), None);
    fs::write(config.csv_path(), "name,price,link\nOld,$1,N/A\nOlder,$2,N/A\n")?;

    create_test_pipeline(
        config.clone(),
        StaticPage::new(r#"<div class="package"><h2>Fresh</h2></div>"#),
    )
    .run()
    .await?;

    assert_eq!(
        read_csv(&config.csv_path()),
        vec![("Fresh".into(), "N/A".into(), "N/A".into())]
    );
    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_aborts_and_writes_nothing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let config = get_test_config(&dir.path().join("output"), None);

    let err = create_test_pipeline(config.clone(), UnreachableHost)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Fetch { .. }));
    assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    assert!(!config.output_dir.exists());
    Ok(())
}

#[tokio::test]
async fn test_unwritable_output_is_write_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    // A regular file where the output directory should be
    let blocker = dir.path().join("output");
    fs::write(&blocker, "not a directory")?;
    let config = get_test_config(&blocker, None);

    let err = create_test_pipeline(config, StaticPage::new(STOREFRONT_HTML))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Write { .. }));
    Ok(())
}

#[tokio::test]
async fn test_page_is_fetched_once() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let page = std::sync::Arc::new(StaticPage::new("<p>empty</p>"));

    struct Shared(std::sync::Arc<StaticPage>);

    #[async_trait]
    impl PageFetcher for Shared {
        async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
            self.0.fetch(url, timeout).await
        }
    }

    create_test_pipeline(get_test_config(dir.path(), None), Shared(page.clone()))
        .run()
        .await?;

    assert_eq!(page.calls.load(Ordering::SeqCst), 1);
    Ok(())
}
