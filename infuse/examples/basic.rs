//! Basic example of infuse field injection.
//!
//! Run with `RUST_LOG=infuse=trace cargo run --example basic` to see the
//! registry and injector at work.

use std::sync::Arc;

use infuse::{Dependencies, Injectable, Injector, Manifest, Result, construct};
use tracing_subscriber::EnvFilter;

// === Dependencies ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    database_url: String,
}

struct Connection {
    url: String,
}

// === Consumers ===

/// Derived: every `#[inject]` field comes from the registry.
#[derive(Injectable)]
struct UserRepository {
    #[inject]
    connection: Arc<Connection>,
    #[inject]
    logger: Arc<Box<dyn Logger>>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.logger.log(&format!("SELECT * FROM users WHERE id = {id}"));
        format!("user #{id} from {}", self.connection.url)
    }
}

/// Hand-written: takes an argument and builds the repository it embeds.
struct UserService {
    repo: UserRepository,
    logger: Arc<Box<dyn Logger>>,
    name: String,
}

impl Injectable for UserService {
    type Args = &'static str;

    fn manifest() -> Manifest {
        Manifest::builder::<Self>()
            .field::<Box<dyn Logger>>("logger")
            .build()
    }

    fn initialize(deps: Dependencies, name: &'static str) -> Result<Self> {
        Ok(Self {
            repo: construct::<UserRepository>(())?,
            logger: deps.get("logger")?,
            name: name.to_string(),
        })
    }
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("{} looking up user {id}", self.name));
        self.repo.find_user(id)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("infuse=debug")),
        )
        .init();

    let injector = Injector::new();
    injector.apply::<UserRepository>()?;
    let service = injector.apply::<UserService>()?;

    let registry = injector.registry();
    registry.register_instance(Config {
        database_url: "postgres://localhost/app".to_string(),
    })?;
    registry.register_instance(Box::new(ConsoleLogger) as Box<dyn Logger>)?;

    // A new connection per construction, built from the registered config.
    let config = registry.get::<Config>()?;
    registry.register_factory(move || Connection {
        url: config.database_url.clone(),
    })?;

    let users = service.construct("users")?;
    println!("{}", users.get_user(42));

    for info in registry.entries() {
        println!("registered: {} ({})", info.type_name, info.kind);
    }

    Ok(())
}
