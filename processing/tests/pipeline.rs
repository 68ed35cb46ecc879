use chrono::{Duration, Utc};
use common::Error;
use common::models::ExecutionInput;
use processing::models::HistoryStatus;
use processing::processor::{LockOptions, MergeProcessor, ProcessorOptions};
use processing::storage::s3::ObjectStorage;
use processing::storage::{ObjectStoreProvider, StorageProvider};
use std::sync::Arc;

const INPUT_BUCKET: &str = "sales-input";
const OUTPUT_BUCKET: &str = "sales-output";
const ARTIFACT: &str = "data/processed_data.csv";
const LOCK: &str = "data/processing.lock";
const HEADER: &str = "Invoice ID,Date,City,Product line,Unit price,Quantity,Total";
const UPLOAD_HEADER: &str =
    "Invoice ID,Branch,City,Customer type,Gender,Product line,Unit price,Quantity,Tax 5%,Total,Date,Time,Payment";

struct Fixture {
    provider: Arc<ObjectStoreProvider>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            provider: Arc::new(ObjectStoreProvider::in_memory()),
        }
    }

    fn bucket(&self, name: &str) -> Arc<dyn ObjectStorage> {
        self.provider.storage(name).unwrap()
    }

    fn processor(&self, options: ProcessorOptions) -> MergeProcessor {
        MergeProcessor::new(self.provider.clone(), options)
    }

    fn locked_processor(&self) -> MergeProcessor {
        self.processor(ProcessorOptions::new(OUTPUT_BUCKET).with_lock(LockOptions {
            ttl: Duration::seconds(60),
            retries: 0,
            retry_base_ms: 1,
        }))
    }

    fn waiting_processor(&self) -> MergeProcessor {
        self.processor(ProcessorOptions::new(OUTPUT_BUCKET).with_lock(LockOptions {
            ttl: Duration::seconds(60),
            retries: 10,
            retry_base_ms: 5,
        }))
    }

    /// Uploads rows in the wide upload layout; each row is
    /// (invoice, city, product line, unit price, quantity, total, date).
    async fn upload(&self, key: &str, rows: &[(&str, &str, &str, &str, &str, &str, &str)]) {
        let mut text = format!("{UPLOAD_HEADER}\n");
        for (invoice, city, line, price, qty, total, date) in rows {
            text.push_str(&format!(
                "{invoice},A,{city},Member,Female,{line},{price},{qty},1.00,{total},{date},10:29,Ewallet\n"
            ));
        }
        self.bucket(INPUT_BUCKET)
            .put_object(key, text.as_bytes())
            .await
            .unwrap();
    }

    async fn artifact(&self) -> String {
        String::from_utf8(self.bucket(OUTPUT_BUCKET).get_object(ARTIFACT).await.unwrap()).unwrap()
    }
}

fn input(key: &str) -> ExecutionInput {
    ExecutionInput::new(INPUT_BUCKET, key)
}

const DAY_ONE: [(&str, &str, &str, &str, &str, &str, &str); 3] = [
    ("750-67-8428", "Yangon", "Health and beauty", "74.69", "7", "548.9715", "1/5/2019"),
    ("226-31-3081", "Naypyitaw", "Electronic accessories", "15.28", "5", "80.22", "3/8/2019"),
    ("631-41-3108", "Yangon", "Home and lifestyle", "46.33", "7", "340.5255", "3/3/2019"),
];

const DAY_TWO: [(&str, &str, &str, &str, &str, &str, &str); 2] = [
    ("631-41-3108", "Yangon", "Home and lifestyle", "46.33", "7", "340.5255", "3/3/2019"),
    ("123-19-1176", "Yangon", "Health and beauty", "58.22", "8", "489.048", "1/27/2019"),
];

const DAY_THREE: [(&str, &str, &str, &str, &str, &str, &str); 2] = [
    ("355-53-5943", "Yangon", "Electronic accessories", "68.84", "6", "433.692", "2/25/2019"),
    ("315-22-5665", "Naypyitaw", "Home and lifestyle", "73.56", "10", "772.38", "2/24/2019"),
];

#[tokio::test]
async fn first_run_writes_projected_rows() {
    let fixture = Fixture::new();
    fixture.upload("day1.csv", &DAY_ONE).await;

    let outcome = fixture
        .processor(ProcessorOptions::new(OUTPUT_BUCKET))
        .process(&input("day1.csv"))
        .await
        .unwrap();

    assert_eq!(outcome.history, HistoryStatus::Absent);
    assert_eq!(outcome.written_rows, 3);
    assert_eq!(outcome.artifact_uri, "s3://sales-output/data/processed_data.csv");
    assert_eq!(
        fixture.artifact().await,
        format!(
            "{HEADER}\n\
750-67-8428,1/5/2019,Yangon,Health and beauty,74.69,7,548.9715\n\
226-31-3081,3/8/2019,Naypyitaw,Electronic accessories,15.28,5,80.22\n\
631-41-3108,3/3/2019,Yangon,Home and lifestyle,46.33,7,340.5255\n"
        )
    );
}

#[tokio::test]
async fn second_run_merges_and_drops_exact_duplicates() {
    let fixture = Fixture::new();
    let processor = fixture.locked_processor();
    fixture.upload("day1.csv", &DAY_ONE).await;
    fixture.upload("day2.csv", &DAY_TWO).await;

    processor.process(&input("day1.csv")).await.unwrap();
    let outcome = processor.process(&input("day2.csv")).await.unwrap();

    // M + N - K = 3 + 2 - 1
    assert_eq!(outcome.history, HistoryStatus::Merged);
    assert_eq!(outcome.history_rows, 3);
    assert_eq!(outcome.incoming_rows, 2);
    assert_eq!(outcome.duplicates_removed, 1);
    assert_eq!(outcome.written_rows, 4);

    let artifact = fixture.artifact().await;
    assert_eq!(artifact.lines().count(), 5);
    assert_eq!(artifact.lines().next(), Some(HEADER));
    assert_eq!(artifact.matches("631-41-3108").count(), 1);
    assert!(artifact.contains("123-19-1176,1/27/2019,Yangon,Health and beauty,58.22,8,489.048"));

    // Lock is released after each run.
    assert!(
        fixture
            .bucket(OUTPUT_BUCKET)
            .get_object(LOCK)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn reprocessing_the_same_file_is_idempotent() {
    let fixture = Fixture::new();
    let processor = fixture.processor(ProcessorOptions::new(OUTPUT_BUCKET));
    fixture.upload("day1.csv", &DAY_ONE).await;
    fixture.upload("day2.csv", &DAY_TWO).await;

    processor.process(&input("day1.csv")).await.unwrap();
    let first = processor.process(&input("day2.csv")).await.unwrap();
    let before = fixture.artifact().await;

    let second = processor.process(&input("day2.csv")).await.unwrap();
    let after = fixture.artifact().await;

    assert_eq!(before, after);
    assert_eq!(first.artifact_sha256, second.artifact_sha256);
    assert_eq!(second.duplicates_removed, 2);
}

#[tokio::test]
async fn missing_column_fails_and_leaves_artifact_untouched() {
    let fixture = Fixture::new();
    let processor = fixture.locked_processor();
    fixture.upload("day1.csv", &DAY_ONE).await;
    processor.process(&input("day1.csv")).await.unwrap();
    let before = fixture.artifact().await;

    fixture
        .bucket(INPUT_BUCKET)
        .put_object("broken.csv", b"Invoice ID,Date,City,Product line,Quantity,Total\n1,d,c,p,1,1\n")
        .await
        .unwrap();

    let err = processor.process(&input("broken.csv")).await.unwrap_err();

    assert!(matches!(err, Error::SchemaValidation(ref message) if message.contains("Unit price")));
    assert_eq!(fixture.artifact().await, before);
    assert!(
        fixture
            .bucket(OUTPUT_BUCKET)
            .get_object(LOCK)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn held_lock_blocks_the_merge() {
    let fixture = Fixture::new();
    fixture.upload("day1.csv", &DAY_ONE).await;
    let lock_body = format!(
        r#"{{"owner":"other-run","acquired_at":"{}","expires_at":"{}"}}"#,
        Utc::now().to_rfc3339(),
        (Utc::now() + Duration::seconds(300)).to_rfc3339()
    );
    fixture
        .bucket(OUTPUT_BUCKET)
        .put_object(LOCK, lock_body.as_bytes())
        .await
        .unwrap();

    let err = fixture
        .locked_processor()
        .process(&input("day1.csv"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::LockContended(_)));
    assert!(
        fixture
            .bucket(OUTPUT_BUCKET)
            .get_object(ARTIFACT)
            .await
            .unwrap_err()
            .is_not_found()
    );
    // The foreign lock survives.
    assert_eq!(
        fixture.bucket(OUTPUT_BUCKET).get_object(LOCK).await.unwrap(),
        lock_body.as_bytes()
    );
}

#[tokio::test]
async fn concurrent_runs_keep_both_uploads() {
    let fixture = Fixture::new();
    fixture.upload("day1.csv", &DAY_ONE).await;
    fixture.upload("day3.csv", &DAY_THREE).await;
    let first = fixture.waiting_processor();
    let second = fixture.waiting_processor();

    let (first_input, second_input) = (input("day1.csv"), input("day3.csv"));
    let (a, b) = tokio::join!(first.process(&first_input), second.process(&second_input));
    let (a, b) = (a.unwrap(), b.unwrap());

    // One run started from nothing, the other merged on top of it.
    let mut statuses = [a.history, b.history];
    statuses.sort_by_key(|status| *status == HistoryStatus::Merged);
    assert_eq!(statuses, [HistoryStatus::Absent, HistoryStatus::Merged]);

    let artifact = fixture.artifact().await;
    assert_eq!(artifact.lines().count(), 6);
    for (invoice, ..) in DAY_ONE.iter().chain(DAY_THREE.iter()) {
        assert!(artifact.contains(invoice), "{invoice} missing from artifact");
    }
    assert!(
        fixture
            .bucket(OUTPUT_BUCKET)
            .get_object(LOCK)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn merge_clears_everything_but_artifact_and_lock() {
    let fixture = Fixture::new();
    let processor = fixture.processor(ProcessorOptions::new(OUTPUT_BUCKET));
    let output = fixture.bucket(OUTPUT_BUCKET);
    fixture.upload("day1.csv", &DAY_ONE).await;
    fixture.upload("day2.csv", &DAY_TWO).await;

    processor.process(&input("day1.csv")).await.unwrap();
    output.put_object("data/part-0001.csv", b"stale").await.unwrap();
    output.put_object("reports/summary.txt", b"stale").await.unwrap();

    let outcome = processor.process(&input("day2.csv")).await.unwrap();

    assert_eq!(outcome.pruned_objects, 2);
    assert_eq!(output.list_objects("").await.unwrap(), vec![ARTIFACT]);
    assert!(
        output
            .get_object("reports/summary.txt")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn unreadable_history_is_replaced_unless_strict() {
    let fixture = Fixture::new();
    fixture.upload("day2.csv", &DAY_TWO).await;
    fixture
        .bucket(OUTPUT_BUCKET)
        .put_object(ARTIFACT, b"not,the,expected,header\n1,2,3,4\n")
        .await
        .unwrap();

    let err = fixture
        .processor(ProcessorOptions::new(OUTPUT_BUCKET).with_strict_history(true))
        .process(&input("day2.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaValidation(_)));
    assert!(fixture.artifact().await.starts_with("not,the,expected,header"));

    let outcome = fixture
        .processor(ProcessorOptions::new(OUTPUT_BUCKET))
        .process(&input("day2.csv"))
        .await
        .unwrap();
    assert_eq!(outcome.history, HistoryStatus::Unreadable);
    assert_eq!(outcome.pruned_objects, 0);
    assert_eq!(fixture.artifact().await.lines().count(), 3);
}
