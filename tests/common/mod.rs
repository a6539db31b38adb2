use std::{
    sync::{Mutex, MutexGuard, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use mongodb::{bson::oid::ObjectId, Client};

use bizledger::{
    config::Config,
    state::{init_state, list_companies, AppState},
};

/// Global lock so integration tests that mutate the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestContext {
    pub state: AppState,
    pub config: Config,
    _guard: MutexGuard<'static, ()>,
}

impl TestContext {
    /// First company created by the seed file.
    pub async fn company_id(&self) -> ObjectId {
        list_companies(&self.state).await.unwrap()[0].id.unwrap()
    }
}

pub async fn setup_state() -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Skipping test; bad environment: {err:?}");
            return None;
        }
    };
    config.mongodb_db = format!(
        "bizledgertest_{}",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis()
    );
    config.seed_file = concat!(env!("CARGO_MANIFEST_DIR"), "/data/seed.json").to_string();

    let client = match Client::with_uri_str(&config.mongodb_uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            drop(guard);
            return None;
        }
    };
    if let Err(err) = client.database(&config.mongodb_db).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        drop(guard);
        return None;
    }

    match init_state(&config).await {
        Ok(state) => Some(TestContext {
            state,
            config,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            drop(guard);
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        if let Ok(client) = Client::with_uri_str(&ctx.config.mongodb_uri).await {
            let _ = client.database(&ctx.config.mongodb_db).drop().await;
        }
        drop(ctx);
    }
}
