/*!
Test Harness pour Minewatch

Facilite l'écriture de tests de bout en bout avec:
- Exporter `/metrics` mock + port de jeu mock démarrés ensemble
- Assertions sur des chemins JSON (`minecraft.memory.used`...)
*/

use crate::fixtures::full_server_body_now;
use crate::metrics_stub::{MockGamePort, MockMetricsServer};
use anyhow::Result;
use serde_json::Value;

/// Harness de test : un faux serveur de jeu complet sur 127.0.0.1
pub struct TestHarness {
    pub metrics: MockMetricsServer,
    pub game: MockGamePort,
}

impl TestHarness {
    /// Démarre les mocks, l'exporter sert `full_server_body_now()`
    pub async fn start() -> Result<Self> {
        Self::with_body(full_server_body_now()).await
    }

    /// Démarre les mocks avec un corps `/metrics` choisi
    pub async fn with_body<S: Into<String>>(body: S) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let metrics = MockMetricsServer::start(body).await?;
        let game = MockGamePort::start().await?;
        log::info!(
            "🧪 Harness ready (metrics port {}, game port {})",
            metrics.port(),
            game.port()
        );

        Ok(Self { metrics, game })
    }

    pub fn remote_host(&self) -> &'static str {
        "127.0.0.1"
    }

    pub fn metrics_port(&self) -> u16 {
        self.metrics.port()
    }

    pub fn game_port(&self) -> u16 {
        self.game.port()
    }
}

/// Suit un chemin pointé (`a.b.c`) dans un document JSON
pub fn get_nested_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;

    for part in path.split('.') {
        match current {
            Value::Object(obj) => {
                current = obj.get(part)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

/// Assert qu'un champ existe
pub fn assert_field_exists(value: &Value, path: &str) -> Result<()> {
    if get_nested_field(value, path).is_some() {
        return Ok(());
    }
    anyhow::bail!("Field '{}' not found", path);
}

/// Assert qu'un champ a une valeur spécifique
pub fn assert_field_equals(value: &Value, path: &str, expected: &Value) -> Result<()> {
    match get_nested_field(value, path) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => anyhow::bail!(
            "Field '{}' mismatch: expected {:?}, got {:?}",
            path,
            expected,
            actual
        ),
        None => anyhow::bail!("Field '{}' not found for comparison", path),
    }
}

/// Assert qu'un objet a exactement ces clés (ordre libre)
pub fn assert_exact_keys(value: &Value, path: &str, keys: &[&str]) -> Result<()> {
    let target = if path.is_empty() {
        Some(value)
    } else {
        get_nested_field(value, path)
    };
    let Some(Value::Object(obj)) = target else {
        anyhow::bail!("Field '{}' is not an object", path);
    };

    let mut actual: Vec<&str> = obj.keys().map(String::as_str).collect();
    let mut wanted = keys.to_vec();
    actual.sort_unstable();
    wanted.sort_unstable();

    if actual != wanted {
        anyhow::bail!("Field '{}' keys mismatch: expected {:?}, got {:?}", path, wanted, actual);
    }
    Ok(())
}
