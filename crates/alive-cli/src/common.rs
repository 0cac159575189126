//! Shared wiring: open the store and build the service from config.

use alive_core::error::Result as CoreResult;
use alive_core::reflection::{HttpGenerator, NullGenerator, ReflectionGenerator};
use alive_core::report::ReportDigest;
use alive_core::storage::{data_dir, Database};
use alive_core::tasks::DailyTask;
use alive_core::{ChallengeConfig, ChallengeService, Reflection};

/// Generator selected at startup from config: HTTP-backed when an endpoint
/// and API key are present, otherwise the always-fallback null generator.
pub enum CliGenerator {
    Http(HttpGenerator),
    Null(NullGenerator),
}

impl ReflectionGenerator for CliGenerator {
    async fn reflect(&self, task: &DailyTask, normalized_text: &str) -> CoreResult<Reflection> {
        match self {
            CliGenerator::Http(g) => g.reflect(task, normalized_text).await,
            CliGenerator::Null(g) => g.reflect(task, normalized_text).await,
        }
    }

    async fn summarize(&self, digest: &ReportDigest) -> CoreResult<String> {
        match self {
            CliGenerator::Http(g) => g.summarize(digest).await,
            CliGenerator::Null(g) => g.summarize(digest).await,
        }
    }
}

/// Open the service against the local database and config file.
pub fn open_service(
) -> Result<ChallengeService<Database, CliGenerator>, Box<dyn std::error::Error>> {
    let dir = data_dir()?;
    let config = ChallengeConfig::load(&dir)?;
    let db = Database::open()?;

    let generator = match config.generator.as_ref().and_then(|g| {
        g.api_key()
            .map(|key| HttpGenerator::new(&g.endpoint, &g.model, &key, config.reflection_timeout()))
    }) {
        Some(Ok(http)) => CliGenerator::Http(http),
        _ => CliGenerator::Null(NullGenerator),
    };

    Ok(ChallengeService::new(db, generator, config))
}

/// Pretty-print any serializable payload to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
